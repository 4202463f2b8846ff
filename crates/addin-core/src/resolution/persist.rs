//! Turning resolved addins into store records

use std::collections::BTreeSet;

use crate::error::Result;
use crate::model::{AddinId, AssemblyIdentity, Uid};
use crate::record::{
    AddinBodyRecord, AddinIndexRecord, AssemblyRecord, BuilderRecordKind, ExtensionBuilderRecord,
    ExtensionPointRecord, ExtensionRecord, InvalidAddinRecord, StoreSnapshot, TypeSignature,
};

use super::context::{ResolutionContext, ResolvedType, TypeOrigin};
use super::extension_builder::BuilderResolutionKind;
use super::handle::{AddinHandle, AssemblyHandle, BuilderHandle, PointHandle};

/// Build the snapshot to persist for `ordered`.
///
/// UIDs are allocated here, in resolved order, so records of a dependency
/// always exist before records that point at it. Addins keep a persisted
/// UID when they have one; new UIDs are written back into the context.
/// Cached addins reuse their records verbatim apart from the enabled flag.
/// Fails only when a UID counter is exhausted.
pub(crate) fn build_snapshot(
    ctx: &mut ResolutionContext,
    ordered: &[AddinHandle],
    invalid: Vec<InvalidAddinRecord>,
) -> Result<StoreSnapshot> {
    let mut index = Vec::with_capacity(ordered.len());
    let mut bodies = Vec::with_capacity(ordered.len());

    for &addin in ordered {
        let enabled = ctx.addin(addin).enabled;
        let (mut index_record, body) = match ctx.addin(addin).variant.cached() {
            Some(cached) => (cached.index.clone(), cached.body.clone()),
            None => build_records(ctx, addin)?,
        };
        index_record.enabled = enabled;
        index.push(index_record);
        bodies.push(body);
    }

    Ok(StoreSnapshot {
        uids: ctx.uid_seed(),
        index,
        bodies,
        invalid,
    })
}

/// UID of a resolved addin, allocating one for new addins.
fn addin_uid(ctx: &mut ResolutionContext, addin: AddinHandle) -> Result<Uid> {
    match ctx.addin(addin).variant.persisted_uid() {
        Some(uid) => Ok(uid),
        None => ctx.uids_mut().next_addin(),
    }
}

fn build_records(
    ctx: &mut ResolutionContext,
    addin: AddinHandle,
) -> Result<(AddinIndexRecord, AddinBodyRecord)> {
    let uid = addin_uid(ctx, addin)?;
    let node = ctx.addin(addin);
    let id = node.header.id;
    let header = node.header.clone();
    let manifest = node.manifest.clone();
    let assemblies = node.assemblies.clone();
    let points = node.extension_points.clone();
    let builders = node.extension_builders.clone();
    let extensions = node.extensions.clone();

    let assembly_records = assemblies
        .iter()
        .map(|&assembly| -> Result<AssemblyRecord> {
            Ok(AssemblyRecord {
                uid: assembly_uid(ctx, assembly)?,
                file: ctx.assembly(assembly).file.clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut point_records = Vec::with_capacity(points.len());
    for &point in &points {
        let uid = point_uid(ctx, point)?;
        let node = ctx.point(point);
        let Some(signature) = node.signature.clone() else {
            continue;
        };
        let (id, description) = (node.id.clone(), node.description.clone());
        point_records.push(ExtensionPointRecord {
            uid,
            id,
            signature: signature_record(ctx, &signature)?,
            description,
        });
    }

    let mut builder_records = Vec::with_capacity(builders.len());
    for &builder in &builders {
        let uid = builder_uid(ctx, builder)?;
        let kind = match ctx.builder(builder).kind.clone() {
            BuilderResolutionKind::Referenced {
                target: Some(target),
                ..
            } => BuilderRecordKind::Referenced {
                target: builder_uid(ctx, target)?,
            },
            _ => {
                let Some(signature) = ctx.builder(builder).signature.clone() else {
                    continue;
                };
                BuilderRecordKind::Declared {
                    signature: signature_record(ctx, &signature)?,
                }
            }
        };
        let node = ctx.builder(builder);
        builder_records.push(ExtensionBuilderRecord {
            uid,
            id: node.id.clone(),
            parent_path: node.parent_path.clone(),
            kind,
            description: node.description.clone(),
        });
    }

    let mut extension_records = Vec::with_capacity(extensions.len());
    for &extension in &extensions {
        let Some(builder) = ctx.extension(extension).builder else {
            continue;
        };
        let builder = builder_uid(ctx, builder)?;
        let node = ctx.extension(extension);
        extension_records.push(ExtensionRecord {
            id: node.id.clone(),
            parent_path: node.parent_path.clone(),
            builder,
            sibling: node.sibling.clone(),
            data: node.data.clone(),
        });
    }

    let node = ctx.addin(addin);
    let extended_addins: Vec<AddinId> = node
        .extended_addins
        .iter()
        .map(|&dep| ctx.addin(dep).header.id)
        .collect();
    let mut referenced_addins = BTreeSet::new();
    let mut referenced_assemblies: Vec<AssemblyIdentity> = Vec::new();
    for &set in &node.referenced_assembly_sets {
        referenced_assemblies.push(ctx.assembly_set(set).identity.clone());
        for provider in ctx.set_providers(set) {
            if provider != addin && ctx.addin(provider).status.is_success() {
                referenced_addins.insert(ctx.addin(provider).header.id);
            }
        }
    }
    let extended_extension_points = node
        .extended_extension_points
        .iter()
        .map(|&point| ctx.point(point).id.clone())
        .collect();

    let index = AddinIndexRecord {
        uid,
        header,
        manifest,
        enabled: node.enabled,
        extended_addins,
        referenced_addins: referenced_addins.into_iter().collect(),
        referenced_assemblies,
        extended_extension_points,
    };
    let body = AddinBodyRecord {
        addin: id,
        assemblies: assembly_records,
        extension_points: point_records,
        extension_builders: builder_records,
        extensions: extension_records,
    };
    Ok((index, body))
}

fn signature_record(ctx: &mut ResolutionContext, signature: &ResolvedType) -> Result<TypeSignature> {
    let assembly = match signature.origin {
        TypeOrigin::Host => None,
        TypeOrigin::Assembly(assembly) => Some(assembly_uid(ctx, assembly)?),
        TypeOrigin::Persisted(uid) => uid,
    };
    Ok(TypeSignature {
        type_name: signature.type_name.clone(),
        assembly,
        extension_type: signature.extension_type.clone(),
        settable_properties: signature.settable_properties.clone(),
        composite: signature.composite,
    })
}

fn assembly_uid(ctx: &mut ResolutionContext, assembly: AssemblyHandle) -> Result<Uid> {
    if let Some(uid) = ctx.assembly(assembly).uid {
        return Ok(uid);
    }
    let uid = ctx.uids_mut().next_assembly()?;
    ctx.assembly_mut(assembly).uid = Some(uid);
    Ok(uid)
}

fn point_uid(ctx: &mut ResolutionContext, point: PointHandle) -> Result<Uid> {
    if let Some(uid) = ctx.point(point).uid {
        return Ok(uid);
    }
    let uid = ctx.uids_mut().next_extension_point()?;
    ctx.point_mut(point).uid = Some(uid);
    Ok(uid)
}

fn builder_uid(ctx: &mut ResolutionContext, builder: BuilderHandle) -> Result<Uid> {
    if let Some(uid) = ctx.builder(builder).uid {
        return Ok(uid);
    }
    let uid = ctx.uids_mut().next_extension_builder()?;
    ctx.builder_mut(builder).uid = Some(uid);
    Ok(uid)
}
