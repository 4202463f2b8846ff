//! [`FakeIntrospector`]: type metadata keyed by assembly path.
//!
//! Realism level: **FAKE**. Nothing is read from disk; an assembly the
//! fixture was never told about reads as empty.

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use addin_core::error::IntrospectionError;
use addin_core::model::{AssemblyFile, AssemblyIdentity, TypeMetadata};
use addin_core::ports::TypeIntrospector;

#[derive(Debug, Default, Clone)]
struct FakeAssembly {
    types: HashMap<String, TypeMetadata>,
    references: Vec<AssemblyIdentity>,
}

/// In-memory [`TypeIntrospector`].
///
/// Every call is counted so tests can assert that cached addins were linked
/// without introspection.
#[derive(Debug, Default)]
pub struct FakeIntrospector {
    assemblies: HashMap<PathBuf, FakeAssembly>,
    unreadable: HashSet<PathBuf>,
    host_types: HashMap<String, TypeMetadata>,
    calls: Cell<usize>,
}

impl FakeIntrospector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define `metadata` in the assembly at `assembly`.
    pub fn with_type(mut self, assembly: impl Into<PathBuf>, metadata: TypeMetadata) -> Self {
        self.add_type(assembly, metadata);
        self
    }

    pub fn add_type(&mut self, assembly: impl Into<PathBuf>, metadata: TypeMetadata) {
        self.assemblies
            .entry(assembly.into())
            .or_default()
            .types
            .insert(metadata.name.clone(), metadata);
    }

    /// Make the assembly at `assembly` reference `identity`.
    pub fn with_reference(mut self, assembly: impl Into<PathBuf>, identity: AssemblyIdentity) -> Self {
        self.add_reference(assembly, identity);
        self
    }

    pub fn add_reference(&mut self, assembly: impl Into<PathBuf>, identity: AssemblyIdentity) {
        self.assemblies
            .entry(assembly.into())
            .or_default()
            .references
            .push(identity);
    }

    /// Make every read of the assembly at `assembly` fail.
    pub fn with_unreadable(mut self, assembly: impl Into<PathBuf>) -> Self {
        self.unreadable.insert(assembly.into());
        self
    }

    /// Provide `metadata` from the host runtime.
    pub fn with_host_type(mut self, metadata: TypeMetadata) -> Self {
        self.host_types.insert(metadata.name.clone(), metadata);
        self
    }

    /// Number of port calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn reset_calls(&self) {
        self.calls.set(0);
    }

    fn read(&self, path: &Path) -> Result<Option<&FakeAssembly>, IntrospectionError> {
        self.calls.set(self.calls.get() + 1);
        if self.unreadable.contains(path) {
            return Err(IntrospectionError::Unreadable {
                path: path.to_path_buf(),
                reason: "metadata table is corrupt".to_string(),
            });
        }
        Ok(self.assemblies.get(path))
    }
}

impl TypeIntrospector for FakeIntrospector {
    fn try_get_type(
        &self,
        assembly: &AssemblyFile,
        type_name: &str,
    ) -> Result<Option<TypeMetadata>, IntrospectionError> {
        Ok(self
            .read(&assembly.path)?
            .and_then(|a| a.types.get(type_name))
            .cloned())
    }

    fn external_references(
        &self,
        assembly: &AssemblyFile,
    ) -> Result<Vec<AssemblyIdentity>, IntrospectionError> {
        Ok(self
            .read(&assembly.path)?
            .map(|a| a.references.clone())
            .unwrap_or_default())
    }

    fn try_get_host_type(&self, type_name: &str) -> Option<TypeMetadata> {
        self.calls.set(self.calls.get() + 1);
        self.host_types.get(type_name).cloned()
    }
}
