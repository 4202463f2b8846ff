//! [`FakeScanner`]: a canned file-scan result.
//!
//! Realism level: **FAKE**. The persisted snapshot is ignored; every scan
//! reports the same packs.

use addin_core::error::ScanError;
use addin_core::model::AddinId;
use addin_core::ports::{FilePack, FileScanner, ResolutionInput};
use addin_core::record::StoreSnapshot;

/// In-memory [`FileScanner`].
#[derive(Debug, Default, Clone)]
pub struct FakeScanner {
    input: ResolutionInput,
    failure: Option<String>,
}

impl FakeScanner {
    pub fn new(candidates: Vec<FilePack>) -> Self {
        Self {
            input: ResolutionInput::new(candidates),
            failure: None,
        }
    }

    /// Also report `removed` as gone from disk.
    pub fn with_removed(mut self, removed: Vec<AddinId>) -> Self {
        self.input.removed = removed;
        self
    }

    /// A scanner whose every scan fails with `reason`.
    pub fn failing(reason: &str) -> Self {
        Self {
            input: ResolutionInput::default(),
            failure: Some(reason.to_string()),
        }
    }
}

impl FileScanner for FakeScanner {
    fn scan(&self, _snapshot: &StoreSnapshot) -> Result<ResolutionInput, ScanError> {
        match &self.failure {
            Some(reason) => Err(ScanError::Failed(reason.clone())),
            None => Ok(self.input.clone()),
        }
    }
}
