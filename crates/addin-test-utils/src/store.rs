//! [`FailingStore`]: a store wrapper that fails on demand.
//!
//! Wraps any real [`AddinStore`] so rollback behaviour can be exercised
//! against the wrapped store's actual state.

use addin_core::error::StoreError;
use addin_core::ports::AddinStore;
use addin_core::record::StoreSnapshot;

/// The store operation a [`FailingStore`] breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    Load,
    StartTransaction,
    Write,
    Commit,
}

/// An [`AddinStore`] that delegates to `inner` except at one operation,
/// which fails without touching `inner`. An injected commit failure
/// discards the inner transaction, as a real failed commit would.
#[derive(Debug)]
pub struct FailingStore<S> {
    inner: S,
    fail_at: FailurePoint,
    rollbacks: usize,
}

impl<S: AddinStore> FailingStore<S> {
    pub fn new(inner: S, fail_at: FailurePoint) -> Self {
        Self {
            inner,
            fail_at,
            rollbacks: 0,
        }
    }

    /// How many times `rollback` was called on this store.
    pub fn rollbacks(&self) -> usize {
        self.rollbacks
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn check(&self, point: FailurePoint) -> Result<(), StoreError> {
        if self.fail_at == point {
            return Err(StoreError::CommitFailed {
                reason: format!("injected failure at {point:?}"),
            });
        }
        Ok(())
    }
}

impl<S: AddinStore> AddinStore for FailingStore<S> {
    fn load(&self) -> Result<StoreSnapshot, StoreError> {
        self.check(FailurePoint::Load)?;
        self.inner.load()
    }

    fn start_transaction(&mut self) -> Result<(), StoreError> {
        self.check(FailurePoint::StartTransaction)?;
        self.inner.start_transaction()
    }

    fn write(&mut self, snapshot: &StoreSnapshot) -> Result<(), StoreError> {
        self.check(FailurePoint::Write)?;
        self.inner.write(snapshot)
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        if let Err(err) = self.check(FailurePoint::Commit) {
            // A failed commit leaves no open transaction behind.
            self.inner.rollback()?;
            return Err(err);
        }
        self.inner.commit()
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        self.rollbacks += 1;
        self.inner.rollback()
    }
}
