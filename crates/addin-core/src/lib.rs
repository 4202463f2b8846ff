//! Incremental addin resolution engine for Addin Manager
//!
//! Given the addins persisted by earlier runs and a batch of new or changed
//! addin packs, this crate decides which addins are valid, in what order
//! they can be loaded, and what to persist for the next run:
//!
//! - **Reclassification**: persisted addins are split into directly
//!   affected, indirectly affected and unaffected by the batch, so only what
//!   changed is re-resolved
//! - **Fixed-point resolution**: extension points, builders, extensions and
//!   assembly references are resolved round-robin until nothing changes;
//!   failures cascade to dependents
//! - **Collision trimming**: duplicate addin ids, point ids, builder paths
//!   and extension paths are settled after resolution
//! - **Records**: survivors are turned into compact index and body records
//!   with stable integer UIDs
//!
//! # Architecture
//!
//! Parsing, type introspection, storage and file scanning are ports (see
//! [`ports`]); the engine itself is single-threaded and synchronous.
//!
//! ```text
//!      FileScanner ──> Resolver ──> AddinStore
//!                        |
//!          ManifestParser + TypeIntrospector
//! ```
//!
//! # Example
//!
//! ```ignore
//! use addin_core::{ResolutionInput, Resolver, StoreSnapshot};
//!
//! let resolver = Resolver::new(&parser, &introspector);
//! let outcome = resolver.resolve(&ResolutionInput::new(packs), &StoreSnapshot::default())?;
//! for addin in &outcome.ordered {
//!     println!("{} {}", addin.name, addin.version);
//! }
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod ports;
pub mod record;
pub mod report;
pub mod resolution;
pub mod resolver;

pub use config::{CollisionPolicy, ResolverConfig};
pub use error::{Error, IntrospectionError, ParseError, Result, ScanError, StoreError};
pub use model::{
    AddinCategory, AddinDescription, AddinHeader, AddinId, AssemblyFile, AssemblyIdentity,
    CapabilityKind, ManifestFile, PropertyMetadata, TypeMetadata, Uid,
};
pub use ports::{AddinStore, FilePack, FileScanner, ManifestParser, ResolutionInput, TypeIntrospector};
pub use record::{InvalidAddinRecord, StoreSnapshot, UidSeed};
pub use report::{FailureKind, ResolutionFailure, ResolutionReport};
pub use resolution::{CollisionEntry, CollisionKey, CollisionReport, ResolutionStatus, VariantKind};
pub use resolver::{InvalidPack, ResolutionOutcome, ResolvedAddin, Resolver};
