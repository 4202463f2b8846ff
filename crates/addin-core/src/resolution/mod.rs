//! Resolution engine
//!
//! A run registers every participating addin into a
//! [`ResolutionContext`], drives the pending ones to a fixed point, settles
//! collisions and turns the survivors into store records.
//!
//! Persisted addins are classified first (see [`reclassify`]): addins
//! untouched by the run's changes keep their records and are never
//! resolved again.

mod addin;
mod assembly;
mod collision;
mod context;
mod driver;
mod extension;
mod extension_builder;
mod extension_point;
mod handle;
mod persist;
mod reclassify;
mod registration;
mod status;
mod uid;

pub use addin::{AddinResolution, AddinVariant, CachedRecords, VariantKind};
pub use assembly::{AssemblyResolution, AssemblyResolutionSet};
pub use collision::{AddinCollision, CollisionEntry, CollisionKey, CollisionReport};
pub use context::{ResolutionContext, ResolvedType, TypeOrigin};
pub use extension::{BuilderRef, ExtensionParent, ExtensionResolution};
pub use extension_builder::{BuilderParent, BuilderResolutionKind, ExtensionBuilderResolution};
pub use extension_point::ExtensionPointResolution;
pub use handle::{
    AddinHandle, AssemblyHandle, AssemblySetHandle, BuilderHandle, ExtensionHandle, PointHandle,
};
pub use reclassify::{PersistedClass, Reclassification, reclassify};
pub use status::ResolutionStatus;
pub use uid::UidAllocator;

pub(crate) use addin::propagate_enablement;
pub(crate) use driver::resolve_all;
pub(crate) use persist::build_snapshot;
pub(crate) use registration::{Registrar, link_cached};
pub(crate) use status::ResolveEnv;
