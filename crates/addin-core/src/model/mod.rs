//! Addin data model
//!
//! Identities, headers, assembly/type metadata and parsed declarations.

mod description;
mod header;
mod ids;
mod metadata;

pub use description::{
    AddinDescription, BuilderKind, ExtensionBuilderDescription, ExtensionBuilderGroup,
    ExtensionDescription, ExtensionGroup, ExtensionPointDescription, PATH_SEPARATOR,
    RelativePosition, SiblingRef, join_path, root_point_id,
};
pub use header::{AddinCategory, AddinHeader, ManifestFile};
pub use ids::{AddinId, Uid};
pub use metadata::{
    AssemblyFile, AssemblyIdentity, Capability, CapabilityKind, PropertyMetadata, TypeMetadata,
};
