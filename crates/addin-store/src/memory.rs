//! In-memory store

use addin_core::ports::AddinStore;
use addin_core::record::StoreSnapshot;

use crate::{Error, Result};

/// Store that keeps the committed snapshot in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    committed: StoreSnapshot,
    transaction: Option<Option<StoreSnapshot>>,
    commits: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store already holding `snapshot`.
    pub fn with_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            committed: snapshot,
            ..Self::default()
        }
    }

    pub fn snapshot(&self) -> &StoreSnapshot {
        &self.committed
    }

    /// Number of successful commits.
    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }
}

impl AddinStore for MemoryStore {
    fn load(&self) -> Result<StoreSnapshot> {
        Ok(self.committed.clone())
    }

    fn start_transaction(&mut self) -> Result<()> {
        if self.transaction.is_some() {
            return Err(Error::TransactionActive);
        }
        self.transaction = Some(None);
        Ok(())
    }

    fn write(&mut self, snapshot: &StoreSnapshot) -> Result<()> {
        let staged = self.transaction.as_mut().ok_or(Error::NoTransaction)?;
        *staged = Some(snapshot.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        let staged = self.transaction.take().ok_or(Error::NoTransaction)?;
        if let Some(snapshot) = staged {
            self.committed = snapshot;
        }
        self.commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if self.transaction.take().is_none() {
            return Err(Error::NoTransaction);
        }
        Ok(())
    }
}
