//! Assembly identities and type metadata returned by the introspection port

use std::fmt;
use std::path::PathBuf;

use semver::Version;
use serde::{Deserialize, Serialize};

/// Identity of a compiled assembly: name plus version.
///
/// Assemblies with equal identities are interchangeable, whichever addin
/// ships them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssemblyIdentity {
    pub name: String,
    pub version: Version,
}

impl AssemblyIdentity {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

impl fmt::Display for AssemblyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.name, self.version)
    }
}

/// One physical assembly shipped by an addin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssemblyFile {
    pub identity: AssemblyIdentity,
    pub path: PathBuf,
}

impl AssemblyFile {
    pub fn new(identity: AssemblyIdentity, path: impl Into<PathBuf>) -> Self {
        Self {
            identity,
            path: path.into(),
        }
    }
}

/// The extensibility role a type can implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    /// Root of an extension tree.
    ExtensionPoint,
    /// Builds leaf extensions.
    ExtensionBuilder,
    /// Builds extensions that accept child builders.
    CompositeExtensionBuilder,
}

/// A capability implemented by a type, parameterised by the extension
/// payload type it produces or accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capability {
    pub kind: CapabilityKind,
    pub extension_type: String,
}

/// A settable property of a builder's target type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyMetadata {
    pub name: String,
    /// Required properties must receive a value from the extension data.
    pub required: bool,
}

impl PropertyMetadata {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
        }
    }
}

/// What the introspection port knows about one type, read without loading
/// or executing the assembly that defines it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMetadata {
    pub name: String,
    pub is_class: bool,
    pub is_abstract: bool,
    pub capabilities: Vec<Capability>,
    pub has_public_parameterless_ctor: bool,
    pub settable_properties: Vec<PropertyMetadata>,
}

impl TypeMetadata {
    /// A concrete class with a public parameterless constructor and no
    /// capabilities.
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_class: true,
            is_abstract: false,
            capabilities: Vec::new(),
            has_public_parameterless_ctor: true,
            settable_properties: Vec::new(),
        }
    }

    pub fn extension_point(name: impl Into<String>, extension_type: impl Into<String>) -> Self {
        Self::class(name).with_capability(CapabilityKind::ExtensionPoint, extension_type)
    }

    pub fn extension_builder(name: impl Into<String>, extension_type: impl Into<String>) -> Self {
        Self::class(name).with_capability(CapabilityKind::ExtensionBuilder, extension_type)
    }

    pub fn composite_builder(name: impl Into<String>, extension_type: impl Into<String>) -> Self {
        Self::class(name).with_capability(CapabilityKind::CompositeExtensionBuilder, extension_type)
    }

    pub fn with_capability(mut self, kind: CapabilityKind, extension_type: impl Into<String>) -> Self {
        self.capabilities.push(Capability {
            kind,
            extension_type: extension_type.into(),
        });
        self
    }

    pub fn with_property(mut self, property: PropertyMetadata) -> Self {
        self.settable_properties.push(property);
        self
    }

    pub fn is_concrete_class(&self) -> bool {
        self.is_class && !self.is_abstract
    }

    /// Extension payload type for the first capability of the given kind.
    pub fn extension_type_for(&self, kind: CapabilityKind) -> Option<&str> {
        self.capabilities
            .iter()
            .find(|c| c.kind == kind)
            .map(|c| c.extension_type.as_str())
    }

    /// Builder capability of this type, preferring the composite form.
    pub fn builder_capability(&self) -> Option<(&str, bool)> {
        if let Some(ext) = self.extension_type_for(CapabilityKind::CompositeExtensionBuilder) {
            return Some((ext, true));
        }
        self.extension_type_for(CapabilityKind::ExtensionBuilder)
            .map(|ext| (ext, false))
    }
}
