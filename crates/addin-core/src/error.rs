//! Error types for addin-core
//!
//! Only run-level failures are errors. A single addin that fails to resolve
//! is not an error: it is recorded in the run's
//! [`ResolutionReport`](crate::report::ResolutionReport) and quarantined.

use std::path::PathBuf;

/// Result type for addin-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a whole resolution run
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A type name resolved to types owned by more than one addin.
    ///
    /// Two independently developed addins declare the same fully-qualified
    /// type name, so no lookup can be trusted for the rest of the run.
    #[error("type '{type_name}' requested by addin {requester} is ambiguous: provided by {}", .owners.join(", "))]
    AmbiguousType {
        type_name: String,
        requester: String,
        owners: Vec<String>,
    },

    /// A UID counter reached its maximum; nothing was persisted.
    #[error("no {kind} UIDs left to allocate")]
    UidsExhausted { kind: &'static str },

    /// The persistent store failed; no changes were applied.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The file-scan port failed before resolution started.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Failed to parse resolver configuration.
    #[error("failed to parse resolver configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O error reading configuration.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors reported by a manifest parser port
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The manifest could not be read or is not well-formed.
    #[error("malformed manifest {manifest}: {reason}")]
    Malformed { manifest: PathBuf, reason: String },

    /// The manifest parsed but its header or identifiers are invalid.
    #[error("invalid addin declared in {manifest}: {reason}")]
    Invalid { manifest: PathBuf, reason: String },
}

/// Errors reported by a type introspection port
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntrospectionError {
    /// The assembly file is missing or its metadata cannot be read.
    #[error("cannot read metadata of assembly {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },
}

/// Errors reported by a persistent store port
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store data at {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("failed to serialize store records: {0}")]
    Serialize(String),

    #[error("Lock acquisition failed for {path}")]
    LockFailed { path: PathBuf },

    #[error("no store transaction is active")]
    NoTransaction,

    #[error("a store transaction is already active")]
    TransactionActive,

    /// Commit failed and the store was restored to its state before the run.
    #[error("commit failed: {reason}")]
    CommitFailed { reason: String },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors reported by a file-scan port
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("scan I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("scan failed: {0}")]
    Failed(String),
}
