//! Building the arenas from descriptions and persisted records

use crate::model::{
    AddinDescription, AddinHeader, BuilderKind, ExtensionBuilderDescription, ExtensionDescription,
    ManifestFile, join_path,
};
use crate::record::{AddinBodyRecord, AddinIndexRecord, BuilderRecordKind};
use crate::report::FailureKind;

use super::addin::{AddinResolution, AddinVariant};
use super::collision::{AddinCollision, CollisionKey};
use super::context::{ResolutionContext, ResolvedType};
use super::extension::{BuilderRef, ExtensionParent, ExtensionResolution};
use super::extension_builder::{BuilderParent, BuilderResolutionKind, ExtensionBuilderResolution};
use super::extension_point::ExtensionPointResolution;
use super::handle::{AddinHandle, BuilderHandle, ExtensionHandle};
use super::status::ResolutionStatus;

/// Registers addins and their assets into a context, recording every
/// collision on the way.
pub(crate) struct Registrar<'a> {
    ctx: &'a mut ResolutionContext,
    collisions: &'a mut AddinCollision,
}

impl<'a> Registrar<'a> {
    pub fn new(ctx: &'a mut ResolutionContext, collisions: &'a mut AddinCollision) -> Self {
        Self { ctx, collisions }
    }

    /// Register a freshly parsed addin. All its assets start pending.
    pub fn register_description(
        &mut self,
        description: AddinDescription,
        variant: AddinVariant,
    ) -> AddinHandle {
        let AddinDescription {
            header,
            manifest,
            assemblies,
            extension_points,
            extension_builder_groups,
            extension_groups,
        } = description;
        let addin = self.register_addin(header, manifest, variant);

        for file in assemblies {
            self.ctx
                .add_assembly(addin, file, None, ResolutionStatus::Pending);
        }
        for point in extension_points {
            let handle = self.ctx.add_point(ExtensionPointResolution {
                owner: addin,
                id: point.id.clone(),
                type_name: point.type_name,
                description: point.description,
                uid: None,
                status: ResolutionStatus::Pending,
                signature: None,
            });
            if let Err(existing) = self.ctx.try_register_extension_point(handle) {
                let existing = self.ctx.point(existing).owner;
                self.collide(CollisionKey::ExtensionPoint(point.id.clone()), existing, addin);
            }
            for builder in point.builders {
                self.declare_builder(addin, &point.id, builder);
            }
        }
        for group in extension_builder_groups {
            for builder in group.builders {
                self.declare_builder(addin, &group.parent_path, builder);
            }
        }
        for group in extension_groups {
            for extension in group.extensions {
                self.declare_extension(addin, &group.parent_path, extension);
            }
        }
        addin
    }

    /// Register a persisted addin from its records.
    ///
    /// Assets of cached variants are settled on arrival and keep their
    /// persisted signatures; assets of directly affected addins are pending
    /// and get resolved again.
    pub fn register_persisted(
        &mut self,
        index: &AddinIndexRecord,
        body: &AddinBodyRecord,
        variant: AddinVariant,
    ) -> AddinHandle {
        let cached = variant.cached().is_some();
        let status = if cached {
            ResolutionStatus::Success
        } else {
            ResolutionStatus::Pending
        };
        let addin = self.register_addin(index.header.clone(), index.manifest.clone(), variant);

        for record in &body.assemblies {
            self.ctx
                .add_assembly(addin, record.file.clone(), Some(record.uid), status);
        }
        for record in &body.extension_points {
            let handle = self.ctx.add_point(ExtensionPointResolution {
                owner: addin,
                id: record.id.clone(),
                type_name: record.signature.type_name.clone(),
                description: record.description.clone(),
                uid: Some(record.uid),
                status,
                signature: cached.then(|| ResolvedType::from_signature(&record.signature)),
            });
            if let Err(existing) = self.ctx.try_register_extension_point(handle) {
                let existing = self.ctx.point(existing).owner;
                self.collide(CollisionKey::ExtensionPoint(record.id.clone()), existing, addin);
            }
        }
        for record in &body.extension_builders {
            let (kind, signature) = match &record.kind {
                BuilderRecordKind::Declared { signature } => (
                    BuilderResolutionKind::Declared {
                        type_name: signature.type_name.clone(),
                    },
                    cached.then(|| ResolvedType::from_signature(signature)),
                ),
                BuilderRecordKind::Referenced { target } => (
                    BuilderResolutionKind::Referenced {
                        target: None,
                        persisted_target: Some(*target),
                    },
                    None,
                ),
            };
            let handle = self.ctx.add_builder(ExtensionBuilderResolution {
                owner: addin,
                id: record.id.clone(),
                parent_path: record.parent_path.clone(),
                path: record.path(),
                description: record.description.clone(),
                uid: Some(record.uid),
                status,
                kind,
                parent: None,
                signature,
            });
            self.register_builder(handle);
        }
        for record in &body.extensions {
            let handle = self.ctx.add_extension(ExtensionResolution {
                owner: addin,
                id: record.id.clone(),
                parent_path: record.parent_path.clone(),
                path: record.path(),
                status,
                builder_ref: BuilderRef::Uid(record.builder),
                sibling: record.sibling.clone(),
                data: record.data.clone(),
                parent: None,
                builder: None,
                sibling_link: None,
            });
            self.register_extension(handle);
        }
        addin
    }

    fn register_addin(
        &mut self,
        header: AddinHeader,
        manifest: ManifestFile,
        variant: AddinVariant,
    ) -> AddinHandle {
        let id = header.id;
        let addin = self
            .ctx
            .add_addin(AddinResolution::new(header, manifest, variant));
        if let Err(existing) = self.ctx.try_register_addin(addin) {
            self.collide(CollisionKey::Addin(id), existing, addin);
        }
        addin
    }

    fn declare_builder(
        &mut self,
        addin: AddinHandle,
        parent_path: &str,
        description: ExtensionBuilderDescription,
    ) {
        let path = join_path(parent_path, &description.id);
        let kind = match description.kind {
            BuilderKind::Declared { type_name } => BuilderResolutionKind::Declared { type_name },
            BuilderKind::Referenced => BuilderResolutionKind::Referenced {
                target: None,
                persisted_target: None,
            },
        };
        let handle = self.ctx.add_builder(ExtensionBuilderResolution {
            owner: addin,
            id: description.id,
            parent_path: parent_path.to_string(),
            path: path.clone(),
            description: description.description,
            uid: None,
            status: ResolutionStatus::Pending,
            kind,
            parent: None,
            signature: None,
        });
        self.register_builder(handle);
        for child in description.children {
            self.declare_builder(addin, &path, child);
        }
    }

    fn declare_extension(
        &mut self,
        addin: AddinHandle,
        parent_path: &str,
        description: ExtensionDescription,
    ) {
        let path = join_path(parent_path, &description.id);
        let handle = self.ctx.add_extension(ExtensionResolution {
            owner: addin,
            id: description.id,
            parent_path: parent_path.to_string(),
            path: path.clone(),
            status: ResolutionStatus::Pending,
            builder_ref: BuilderRef::Path(description.builder_path),
            sibling: description.sibling,
            data: description.data,
            parent: None,
            builder: None,
            sibling_link: None,
        });
        self.register_extension(handle);
        for child in description.children {
            self.declare_extension(addin, &path, child);
        }
    }

    fn register_builder(&mut self, handle: BuilderHandle) {
        if let Err(existing) = self.ctx.try_register_extension_builder(handle) {
            let key = CollisionKey::ExtensionBuilder(self.ctx.builder(handle).path.clone());
            let existing = self.ctx.builder(existing).owner;
            let incoming = self.ctx.builder(handle).owner;
            self.collide(key, existing, incoming);
        }
    }

    fn register_extension(&mut self, handle: ExtensionHandle) {
        if let Err(existing) = self.ctx.try_register_extension(handle) {
            let key = CollisionKey::Extension(self.ctx.extension(handle).path.clone());
            let existing = self.ctx.extension(existing).owner;
            let incoming = self.ctx.extension(handle).owner;
            self.collide(key, existing, incoming);
        }
    }

    /// A key claimed twice by the same addin is that addin's own error, not
    /// a collision between addins.
    fn collide(&mut self, key: CollisionKey, existing: AddinHandle, incoming: AddinHandle) {
        if existing == incoming {
            let message = format!("declares {key} more than once");
            self.ctx
                .addin_mut(incoming)
                .registration_errors
                .push((FailureKind::RuleViolation, message));
        } else {
            tracing::debug!(%key, "Collision recorded during registration");
            self.collisions.add(key, existing, incoming);
        }
    }
}

/// Restore the links of cached addins once everything is registered.
///
/// Cached assets are not resolved again, so their parents, builders,
/// siblings and addin-level edges are looked up from the persisted ids,
/// paths and UIDs instead. Links that no longer resolve are recorded
/// against the addin and fail it when it is re-checked.
pub(crate) fn link_cached(ctx: &mut ResolutionContext) {
    for addin in ctx.addin_handles() {
        let Some(cached) = ctx.addin(addin).variant.cached() else {
            continue;
        };
        let index = cached.index.clone();

        for id in &index.extended_addins {
            match ctx.addin_by_id(*id) {
                Some(other) => ctx.depend_on_addin(addin, other),
                None => broken(
                    ctx,
                    addin,
                    FailureKind::DependencyFailed,
                    format!("extended addin {id} is not installed"),
                ),
            }
        }
        for identity in &index.referenced_assemblies {
            match ctx.try_get_assembly_reference_set(identity) {
                Some(set) => ctx.depend_on_set(addin, set),
                None => broken(
                    ctx,
                    addin,
                    FailureKind::MissingReference,
                    format!("no installed addin provides assembly {identity}"),
                ),
            }
        }
        for point_id in &index.extended_extension_points {
            match ctx.point_by_id(point_id) {
                Some(point) => ctx.depend_on_point(addin, point),
                None => broken(
                    ctx,
                    addin,
                    FailureKind::MissingParent,
                    format!("extension point '{point_id}' no longer exists"),
                ),
            }
        }

        for builder in ctx.addin(addin).extension_builders.clone() {
            link_builder(ctx, addin, builder);
        }
        for extension in ctx.addin(addin).extensions.clone() {
            link_extension(ctx, addin, extension);
        }
    }
}

fn link_builder(ctx: &mut ResolutionContext, addin: AddinHandle, builder: BuilderHandle) {
    let node = ctx.builder(builder);
    let parent_path = node.parent_path.clone();
    let persisted_target = match node.kind {
        BuilderResolutionKind::Referenced {
            persisted_target, ..
        } => persisted_target,
        BuilderResolutionKind::Declared { .. } => None,
    };

    match BuilderParent::find(ctx, &parent_path) {
        Some(parent) => ctx.builder_mut(builder).parent = Some(parent),
        None => broken(
            ctx,
            addin,
            FailureKind::MissingParent,
            format!("parent '{parent_path}' of a builder no longer exists"),
        ),
    }
    if let Some(uid) = persisted_target {
        match ctx.builder_by_uid(uid) {
            Some(target) => {
                ctx.builder_mut(builder).kind = BuilderResolutionKind::Referenced {
                    target: Some(target),
                    persisted_target: Some(uid),
                };
            }
            None => broken(
                ctx,
                addin,
                FailureKind::MissingBuilder,
                format!("referenced builder {uid} no longer exists"),
            ),
        }
    }
}

fn link_extension(ctx: &mut ResolutionContext, addin: AddinHandle, extension: ExtensionHandle) {
    let node = ctx.extension(extension);
    let parent_path = node.parent_path.clone();
    let builder_ref = node.builder_ref.clone();
    let sibling_path = node
        .sibling
        .as_ref()
        .map(|sibling| join_path(&parent_path, &sibling.id));

    match ExtensionParent::find(ctx, &parent_path) {
        Some(parent) => ctx.extension_mut(extension).parent = Some(parent),
        None => broken(
            ctx,
            addin,
            FailureKind::MissingParent,
            format!("parent '{parent_path}' of an extension no longer exists"),
        ),
    }
    match ctx.find_builder(&builder_ref) {
        Some(builder) => ctx.extension_mut(extension).builder = Some(builder),
        None => {
            let message = format!(
                "builder of extension '{}' no longer exists",
                ctx.extension(extension).path
            );
            broken(ctx, addin, FailureKind::MissingBuilder, message);
        }
    }
    if let Some(path) = sibling_path {
        match ctx.extension_by_path(&path) {
            Some(sibling) => ctx.extension_mut(extension).sibling_link = Some(sibling),
            None => broken(
                ctx,
                addin,
                FailureKind::MissingSibling,
                format!("sibling '{path}' no longer exists"),
            ),
        }
    }
}

fn broken(ctx: &mut ResolutionContext, addin: AddinHandle, kind: FailureKind, message: String) {
    tracing::warn!(addin = %ctx.addin(addin).label(), %kind, "{message}");
    ctx.addin_mut(addin).registration_errors.push((kind, message));
}
