//! Per-run UID allocation

use crate::error::{Error, Result};
use crate::model::Uid;
use crate::record::UidSeed;

/// Hands out UIDs for one run.
///
/// Seeded from the last values the store persisted; the final seed is
/// written back together with the records that use the new UIDs.
#[derive(Debug, Clone, Default)]
pub struct UidAllocator {
    seed: UidSeed,
}

impl UidAllocator {
    pub fn new(seed: UidSeed) -> Self {
        Self { seed }
    }

    pub fn next_addin(&mut self) -> Result<Uid> {
        Self::bump(&mut self.seed.addin, "addin")
    }

    pub fn next_assembly(&mut self) -> Result<Uid> {
        Self::bump(&mut self.seed.assembly, "assembly")
    }

    pub fn next_extension_point(&mut self) -> Result<Uid> {
        Self::bump(&mut self.seed.extension_point, "extension point")
    }

    pub fn next_extension_builder(&mut self) -> Result<Uid> {
        Self::bump(&mut self.seed.extension_builder, "extension builder")
    }

    /// Last allocated values, to persist with the records.
    pub fn seed(&self) -> UidSeed {
        self.seed
    }

    /// A counter at `u32::MAX` is left untouched.
    fn bump(counter: &mut u32, kind: &'static str) -> Result<Uid> {
        *counter = counter
            .checked_add(1)
            .ok_or(Error::UidsExhausted { kind })?;
        Ok(Uid::new(*counter))
    }
}
