//! Collaborators the resolution engine depends on
//!
//! Manifest parsing, metadata introspection, persistence and file scanning
//! live outside this crate. The engine only sees them through these traits.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{IntrospectionError, ParseError, ScanError, StoreError};
use crate::model::{AddinDescription, AddinId, AssemblyFile, AssemblyIdentity, TypeMetadata};
use crate::record::StoreSnapshot;

/// The files making up one addin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilePack {
    pub manifest: PathBuf,
    #[serde(default)]
    pub assemblies: Vec<PathBuf>,
    #[serde(default)]
    pub data_files: Vec<PathBuf>,
}

impl FilePack {
    pub fn new(manifest: impl Into<PathBuf>) -> Self {
        Self {
            manifest: manifest.into(),
            assemblies: Vec::new(),
            data_files: Vec::new(),
        }
    }
}

/// Input of one resolution run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionInput {
    /// Packs that are new or changed since the last run.
    #[serde(default)]
    pub candidates: Vec<FilePack>,
    /// Persisted addins whose files no longer exist.
    #[serde(default)]
    pub removed: Vec<AddinId>,
}

impl ResolutionInput {
    pub fn new(candidates: Vec<FilePack>) -> Self {
        Self {
            candidates,
            removed: Vec::new(),
        }
    }

    pub fn with_removed(mut self, removed: Vec<AddinId>) -> Self {
        self.removed = removed;
        self
    }
}

/// Turns one addin's file pack into its declarations.
pub trait ManifestParser {
    fn try_parse(&self, pack: &FilePack) -> Result<AddinDescription, ParseError>;
}

/// Reads type metadata from assemblies without loading or executing them.
pub trait TypeIntrospector {
    /// Look up a type defined in `assembly`. `Ok(None)` means the assembly
    /// was read but does not define the type.
    fn try_get_type(
        &self,
        assembly: &AssemblyFile,
        type_name: &str,
    ) -> Result<Option<TypeMetadata>, IntrospectionError>;

    /// Assemblies `assembly` references that the host cannot satisfy itself.
    fn external_references(
        &self,
        assembly: &AssemblyFile,
    ) -> Result<Vec<AssemblyIdentity>, IntrospectionError>;

    /// Look up a type provided by the host runtime.
    fn try_get_host_type(&self, type_name: &str) -> Option<TypeMetadata>;
}

/// Transactional persistence of resolved records.
///
/// A run writes inside one transaction. If `commit` fails, or `rollback`
/// is called, the store must be left exactly as it was before
/// `start_transaction`. A failed `commit` also ends the transaction, so
/// callers do not roll back after it.
pub trait AddinStore {
    fn load(&self) -> Result<StoreSnapshot, StoreError>;

    fn start_transaction(&mut self) -> Result<(), StoreError>;

    /// Stage the index and body records (plus UID seed and quarantine list)
    /// that replace the current contents on commit.
    fn write(&mut self, snapshot: &StoreSnapshot) -> Result<(), StoreError>;

    fn commit(&mut self) -> Result<(), StoreError>;

    fn rollback(&mut self) -> Result<(), StoreError>;
}

/// Discovers packs that changed since the persisted snapshot was written.
pub trait FileScanner {
    fn scan(&self, snapshot: &StoreSnapshot) -> Result<ResolutionInput, ScanError>;
}
