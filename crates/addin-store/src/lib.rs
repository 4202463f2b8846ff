//! Persistent record stores for Addin Manager
//!
//! Implementations of the [`AddinStore`](addin_core::ports::AddinStore)
//! port:
//!
//! - [`MemoryStore`]: keeps the snapshot in memory, for embedding and tests
//! - [`FileStore`]: one JSON document on disk, written inside an exclusive
//!   advisory lock with a staged temp file and an atomic rename. Rollback
//!   restores the document byte for byte.

pub mod error;
pub mod file;
pub mod memory;

pub use error::{Error, Result};
pub use file::{FileStore, FileStoreConfig};
pub use memory::MemoryStore;
