//! Arenas and registries of one resolution run

use std::collections::{BTreeSet, HashMap};

use crate::error::{Error, Result};
use crate::model::{AddinId, AssemblyFile, AssemblyIdentity, PropertyMetadata, TypeMetadata, Uid};
use crate::ports::TypeIntrospector;
use crate::record::TypeSignature;

use super::addin::AddinResolution;
use super::assembly::{AssemblyResolution, AssemblyResolutionSet};
use super::extension::{BuilderRef, ExtensionResolution};
use super::extension_builder::{BuilderResolutionKind, ExtensionBuilderResolution};
use super::extension_point::ExtensionPointResolution;
use super::handle::{
    AddinHandle, AssemblyHandle, AssemblySetHandle, BuilderHandle, ExtensionHandle, PointHandle,
};
use super::status::ResolutionStatus;
use super::uid::UidAllocator;

/// Where a resolved type lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeOrigin {
    /// Provided by the host application.
    Host,
    /// Found in an assembly during this run.
    Assembly(AssemblyHandle),
    /// Restored from a persisted signature.
    Persisted(Option<Uid>),
}

/// The type an extension point or builder resolved to, reduced to what
/// dependents need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedType {
    pub type_name: String,
    pub origin: TypeOrigin,
    pub extension_type: String,
    pub settable_properties: Vec<PropertyMetadata>,
    /// Whether child builders may hang below this one.
    pub composite: bool,
}

impl ResolvedType {
    pub(crate) fn from_lookup(lookup: &TypeLookup, extension_type: &str, composite: bool) -> Self {
        let origin = match lookup.assembly {
            Some(assembly) => TypeOrigin::Assembly(assembly),
            None => TypeOrigin::Host,
        };
        Self {
            type_name: lookup.metadata.name.clone(),
            origin,
            extension_type: extension_type.to_string(),
            settable_properties: lookup.metadata.settable_properties.clone(),
            composite,
        }
    }

    pub(crate) fn from_signature(signature: &TypeSignature) -> Self {
        Self {
            type_name: signature.type_name.clone(),
            origin: TypeOrigin::Persisted(signature.assembly),
            extension_type: signature.extension_type.clone(),
            settable_properties: signature.settable_properties.clone(),
            composite: signature.composite,
        }
    }

    pub(crate) fn missing_required<'a>(
        &'a self,
        data: &'a std::collections::BTreeMap<String, String>,
    ) -> impl Iterator<Item = &'a str> {
        self.settable_properties
            .iter()
            .filter(move |p| p.required && !data.contains_key(&p.name))
            .map(|p| p.name.as_str())
    }
}

/// Result of a successful type lookup.
#[derive(Debug, Clone)]
pub(crate) struct TypeLookup {
    /// `None` for host types.
    pub owner: Option<AddinHandle>,
    pub assembly: Option<AssemblyHandle>,
    pub metadata: TypeMetadata,
}

/// Owns every resolvable of a run plus the indices used to find them.
///
/// Registration is first-writer-wins: the `try_register_*` methods hand
/// back the handle already registered under a key so the caller can record
/// a collision.
#[derive(Debug, Default)]
pub struct ResolutionContext {
    pub(crate) addins: Vec<AddinResolution>,
    pub(crate) assemblies: Vec<AssemblyResolution>,
    pub(crate) assembly_sets: Vec<AssemblyResolutionSet>,
    pub(crate) points: Vec<ExtensionPointResolution>,
    pub(crate) builders: Vec<ExtensionBuilderResolution>,
    pub(crate) extensions: Vec<ExtensionResolution>,

    addin_ids: HashMap<AddinId, AddinHandle>,
    point_ids: HashMap<String, PointHandle>,
    builder_paths: HashMap<String, BuilderHandle>,
    extension_paths: HashMap<String, ExtensionHandle>,
    sets_by_identity: HashMap<AssemblyIdentity, AssemblySetHandle>,

    builder_uids: HashMap<Uid, BuilderHandle>,
    /// Builders of superseded addins, by old UID, to their path.
    moved_builders: HashMap<Uid, String>,

    uids: UidAllocator,
}

impl ResolutionContext {
    pub fn new(uids: UidAllocator) -> Self {
        Self {
            uids,
            ..Self::default()
        }
    }

    pub fn addin_count(&self) -> usize {
        self.addins.len()
    }

    pub(crate) fn addin_handles(&self) -> Vec<AddinHandle> {
        (0..self.addins.len()).map(AddinHandle::from_index).collect()
    }

    pub(crate) fn uids_mut(&mut self) -> &mut UidAllocator {
        &mut self.uids
    }

    pub(crate) fn uid_seed(&self) -> crate::record::UidSeed {
        self.uids.seed()
    }

    pub fn addin(&self, handle: AddinHandle) -> &AddinResolution {
        &self.addins[handle.index()]
    }

    pub(crate) fn addin_mut(&mut self, handle: AddinHandle) -> &mut AddinResolution {
        &mut self.addins[handle.index()]
    }

    pub(crate) fn assembly(&self, handle: AssemblyHandle) -> &AssemblyResolution {
        &self.assemblies[handle.index()]
    }

    pub(crate) fn assembly_mut(&mut self, handle: AssemblyHandle) -> &mut AssemblyResolution {
        &mut self.assemblies[handle.index()]
    }

    pub(crate) fn assembly_set(&self, handle: AssemblySetHandle) -> &AssemblyResolutionSet {
        &self.assembly_sets[handle.index()]
    }

    pub(crate) fn point(&self, handle: PointHandle) -> &ExtensionPointResolution {
        &self.points[handle.index()]
    }

    pub(crate) fn point_mut(&mut self, handle: PointHandle) -> &mut ExtensionPointResolution {
        &mut self.points[handle.index()]
    }

    pub(crate) fn builder(&self, handle: BuilderHandle) -> &ExtensionBuilderResolution {
        &self.builders[handle.index()]
    }

    pub(crate) fn builder_mut(&mut self, handle: BuilderHandle) -> &mut ExtensionBuilderResolution {
        &mut self.builders[handle.index()]
    }

    pub(crate) fn extension(&self, handle: ExtensionHandle) -> &ExtensionResolution {
        &self.extensions[handle.index()]
    }

    pub(crate) fn extension_mut(&mut self, handle: ExtensionHandle) -> &mut ExtensionResolution {
        &mut self.extensions[handle.index()]
    }

    pub(crate) fn add_addin(&mut self, addin: AddinResolution) -> AddinHandle {
        self.addins.push(addin);
        AddinHandle::from_index(self.addins.len() - 1)
    }

    /// Add an assembly and file it into the set for its identity.
    pub(crate) fn add_assembly(
        &mut self,
        owner: AddinHandle,
        file: AssemblyFile,
        uid: Option<Uid>,
        status: ResolutionStatus,
    ) -> AssemblyHandle {
        let handle = AssemblyHandle::from_index(self.assemblies.len());
        let set = match self.sets_by_identity.get(&file.identity) {
            Some(&set) => set,
            None => {
                let set = AssemblySetHandle::from_index(self.assembly_sets.len());
                self.assembly_sets
                    .push(AssemblyResolutionSet::new(file.identity.clone()));
                self.sets_by_identity.insert(file.identity.clone(), set);
                set
            }
        };
        self.assembly_sets[set.index()].members.push(handle);
        self.assemblies.push(AssemblyResolution {
            owner,
            file,
            uid,
            set,
            status,
        });
        self.addin_mut(owner).assemblies.push(handle);
        handle
    }

    pub(crate) fn add_point(&mut self, point: ExtensionPointResolution) -> PointHandle {
        let handle = PointHandle::from_index(self.points.len());
        self.addin_mut(point.owner).extension_points.push(handle);
        self.points.push(point);
        handle
    }

    pub(crate) fn add_builder(&mut self, builder: ExtensionBuilderResolution) -> BuilderHandle {
        let handle = BuilderHandle::from_index(self.builders.len());
        if let Some(uid) = builder.uid {
            self.builder_uids.insert(uid, handle);
        }
        self.addin_mut(builder.owner).extension_builders.push(handle);
        self.builders.push(builder);
        handle
    }

    pub(crate) fn add_extension(&mut self, extension: ExtensionResolution) -> ExtensionHandle {
        let handle = ExtensionHandle::from_index(self.extensions.len());
        self.addin_mut(extension.owner).extensions.push(handle);
        self.extensions.push(extension);
        handle
    }

    pub(crate) fn try_register_addin(&mut self, handle: AddinHandle) -> std::result::Result<(), AddinHandle> {
        let id = self.addin(handle).header.id;
        try_insert(&mut self.addin_ids, id, handle)
    }

    pub(crate) fn try_register_extension_point(
        &mut self,
        handle: PointHandle,
    ) -> std::result::Result<(), PointHandle> {
        let id = self.point(handle).id.clone();
        try_insert(&mut self.point_ids, id, handle)
    }

    pub(crate) fn try_register_extension_builder(
        &mut self,
        handle: BuilderHandle,
    ) -> std::result::Result<(), BuilderHandle> {
        let path = self.builder(handle).path.clone();
        try_insert(&mut self.builder_paths, path, handle)
    }

    pub(crate) fn try_register_extension(
        &mut self,
        handle: ExtensionHandle,
    ) -> std::result::Result<(), ExtensionHandle> {
        let path = self.extension(handle).path.clone();
        try_insert(&mut self.extension_paths, path, handle)
    }

    /// Remember where a builder of a superseded addin used to live.
    pub(crate) fn register_moved_builder(&mut self, uid: Uid, path: String) {
        self.moved_builders.insert(uid, path);
    }

    pub fn addin_by_id(&self, id: AddinId) -> Option<AddinHandle> {
        self.addin_ids.get(&id).copied()
    }

    pub(crate) fn point_by_id(&self, id: &str) -> Option<PointHandle> {
        self.point_ids.get(id).copied()
    }

    pub(crate) fn builder_by_path(&self, path: &str) -> Option<BuilderHandle> {
        self.builder_paths.get(path).copied()
    }

    pub(crate) fn builder_by_uid(&self, uid: Uid) -> Option<BuilderHandle> {
        self.builder_uids.get(&uid).copied()
    }

    pub(crate) fn extension_by_path(&self, path: &str) -> Option<ExtensionHandle> {
        self.extension_paths.get(path).copied()
    }

    /// Signature of a builder, following referenced builders to the
    /// builder they reuse.
    pub(crate) fn builder_signature(&self, handle: BuilderHandle) -> Option<&ResolvedType> {
        let mut current = handle;
        for _ in 0..=self.builders.len() {
            let builder = self.builder(current);
            if let Some(signature) = builder.signature.as_ref() {
                return Some(signature);
            }
            match builder.kind {
                BuilderResolutionKind::Referenced {
                    target: Some(target),
                    ..
                } => current = target,
                _ => return None,
            }
        }
        None
    }

    /// `handle` followed by every builder it aliases, nearest first.
    pub(crate) fn builder_alias_chain(&self, handle: BuilderHandle) -> Vec<BuilderHandle> {
        let mut chain = vec![handle];
        let mut current = handle;
        while let BuilderResolutionKind::Referenced {
            target: Some(target),
            ..
        } = self.builder(current).kind
        {
            if chain.contains(&target) {
                break;
            }
            chain.push(target);
            current = target;
        }
        chain
    }

    /// Find the builder an extension refers to.
    ///
    /// A UID that no longer matches a live builder is looked up in the
    /// moved-builder table and followed by path, which is how extensions
    /// of persisted addins find builders of an updated addin.
    pub(crate) fn find_builder(&self, reference: &BuilderRef) -> Option<BuilderHandle> {
        match reference {
            BuilderRef::Path(path) => self.builder_by_path(path),
            BuilderRef::Uid(uid) => self.builder_by_uid(*uid).or_else(|| {
                self.moved_builders
                    .get(uid)
                    .and_then(|path| self.builder_by_path(path))
            }),
        }
    }

    pub fn try_get_assembly_reference_set(
        &self,
        identity: &AssemblyIdentity,
    ) -> Option<AssemblySetHandle> {
        self.sets_by_identity.get(identity).copied()
    }

    /// Sets for every identity, or the first identity nothing provides.
    pub fn try_get_assembly_reference_sets(
        &self,
        identities: &[AssemblyIdentity],
    ) -> std::result::Result<Vec<AssemblySetHandle>, AssemblyIdentity> {
        identities
            .iter()
            .map(|identity| {
                self.try_get_assembly_reference_set(identity)
                    .ok_or_else(|| identity.clone())
            })
            .collect()
    }

    /// Distinct addins shipping an assembly of the set, in member order.
    pub(crate) fn set_providers(&self, set: AssemblySetHandle) -> Vec<AddinHandle> {
        let mut providers = Vec::new();
        for &member in &self.assembly_set(set).members {
            let owner = self.assembly(member).owner;
            if !providers.contains(&owner) {
                providers.push(owner);
            }
        }
        providers
    }

    /// Status of a referenced set as seen by `requester`.
    ///
    /// Success once every provider that has not failed has resolved, failed
    /// when all providers failed.
    pub(crate) fn set_status(&self, requester: AddinHandle, set: AssemblySetHandle) -> ResolutionStatus {
        let mut any_alive = false;
        let mut status = ResolutionStatus::Success;
        for provider in self.set_providers(set) {
            if provider == requester {
                return ResolutionStatus::Success;
            }
            match self.addin(provider).status {
                ResolutionStatus::Failed => {}
                other => {
                    any_alive = true;
                    status = status.and(other);
                }
            }
        }
        if any_alive {
            status
        } else {
            ResolutionStatus::Failed
        }
    }

    pub(crate) fn depend_on_addin(&mut self, owner: AddinHandle, other: AddinHandle) {
        if owner != other {
            self.addin_mut(owner).extended_addins.insert(other);
        }
    }

    /// Record that `owner` extends `point`, which also makes it depend on
    /// the point's addin.
    pub(crate) fn depend_on_point(&mut self, owner: AddinHandle, point: PointHandle) {
        let point_owner = self.point(point).owner;
        if point_owner != owner {
            self.addin_mut(owner).extended_extension_points.insert(point);
            self.depend_on_addin(owner, point_owner);
        }
    }

    /// Record a reference to an assembly set, unless `owner` ships one of
    /// its members itself.
    pub(crate) fn depend_on_set(&mut self, owner: AddinHandle, set: AssemblySetHandle) {
        if !self.set_providers(set).contains(&owner) {
            self.addin_mut(owner).referenced_assembly_sets.insert(set);
        }
    }

    /// Make `owner` depend on wherever a looked-up type lives and report
    /// whether that dependency is usable yet.
    pub(crate) fn depend_on_type(&mut self, owner: AddinHandle, lookup: &TypeLookup) -> ResolutionStatus {
        let (Some(type_owner), Some(assembly)) = (lookup.owner, lookup.assembly) else {
            return ResolutionStatus::Success;
        };
        if type_owner == owner {
            return ResolutionStatus::Success;
        }
        let set = self.assembly(assembly).set;
        self.depend_on_set(owner, set);
        self.set_status(owner, set)
    }

    /// Addins `addin` cannot do without: extended addins, plus providers of
    /// referenced sets when they are the last providers standing.
    pub(crate) fn can_resolve_without(&self, addin: AddinHandle, removed: AddinHandle) -> bool {
        let node = self.addin(addin);
        if node.extended_addins.contains(&removed) {
            return false;
        }
        node.referenced_assembly_sets.iter().all(|&set| {
            let providers = self.set_providers(set);
            !providers.contains(&removed)
                || providers
                    .iter()
                    .any(|&p| p != removed && !self.addin(p).status.is_failed())
        })
    }

    /// Find the unique type named `type_name` as seen from `requester`.
    ///
    /// The requester's own assemblies are searched first, then the host,
    /// then every other registered assembly. Matches in interchangeable
    /// assemblies (same identity) count once; matches owned by more than one
    /// distinct addin abort the run, whether or not those addins have failed
    /// yet. Among the matches, one from an addin that has not failed wins.
    pub(crate) fn get_unique_addin_type(
        &self,
        requester: AddinHandle,
        type_name: &str,
        introspector: &dyn TypeIntrospector,
    ) -> Result<Option<TypeLookup>> {
        for &assembly in &self.addin(requester).assemblies {
            if let Some(metadata) = self.inspect(assembly, type_name, introspector) {
                return Ok(Some(TypeLookup {
                    owner: Some(requester),
                    assembly: Some(assembly),
                    metadata,
                }));
            }
        }

        if let Some(metadata) = introspector.try_get_host_type(type_name) {
            return Ok(Some(TypeLookup {
                owner: None,
                assembly: None,
                metadata,
            }));
        }

        let mut matches: Vec<TypeLookup> = Vec::new();
        let mut sets: BTreeSet<AssemblySetHandle> = BTreeSet::new();
        for (index, assembly) in self.assemblies.iter().enumerate() {
            if assembly.owner == requester {
                continue;
            }
            let handle = AssemblyHandle::from_index(index);
            if let Some(metadata) = self.inspect(handle, type_name, introspector) {
                sets.insert(assembly.set);
                matches.push(TypeLookup {
                    owner: Some(assembly.owner),
                    assembly: Some(handle),
                    metadata,
                });
            }
        }

        let owners: BTreeSet<AddinId> = matches
            .iter()
            .filter_map(|m| m.owner)
            .map(|o| self.addin(o).header.id)
            .collect();
        if sets.len() > 1 && owners.len() > 1 {
            let mut labels: Vec<String> = matches
                .iter()
                .filter_map(|m| m.owner)
                .map(|o| self.addin(o).label())
                .collect();
            labels.dedup();
            return Err(Error::AmbiguousType {
                type_name: type_name.to_string(),
                requester: self.addin(requester).label(),
                owners: labels,
            });
        }
        let live = matches.iter().position(|m| {
            m.owner
                .is_none_or(|owner| !self.addin(owner).status.is_failed())
        });
        Ok(match live {
            Some(index) => Some(matches.swap_remove(index)),
            None => matches.into_iter().next(),
        })
    }

    fn inspect(
        &self,
        assembly: AssemblyHandle,
        type_name: &str,
        introspector: &dyn TypeIntrospector,
    ) -> Option<TypeMetadata> {
        let file = &self.assembly(assembly).file;
        match introspector.try_get_type(file, type_name) {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(
                    assembly = %file.path.display(),
                    error = %err,
                    "Skipping unreadable assembly during type lookup"
                );
                None
            }
        }
    }
}

fn try_insert<K, H>(map: &mut HashMap<K, H>, key: K, handle: H) -> std::result::Result<(), H>
where
    K: std::hash::Hash + Eq,
    H: Copy,
{
    match map.entry(key) {
        std::collections::hash_map::Entry::Occupied(existing) => Err(*existing.get()),
        std::collections::hash_map::Entry::Vacant(slot) => {
            slot.insert(handle);
            Ok(())
        }
    }
}
