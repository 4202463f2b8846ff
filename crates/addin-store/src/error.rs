//! Error types for addin-store
//!
//! Stores report the engine's [`StoreError`] so the resolver can roll back
//! and abort uniformly, whichever store is plugged in.

use std::path::Path;

pub use addin_core::error::StoreError as Error;

/// Result type for addin-store operations
pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn corrupt(path: &Path, source: serde_json::Error) -> Error {
    Error::Corrupt {
        path: path.to_path_buf(),
        reason: source.to_string(),
    }
}

pub(crate) fn lock_failed(path: &Path) -> Error {
    Error::LockFailed {
        path: path.to_path_buf(),
    }
}
