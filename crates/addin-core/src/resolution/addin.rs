//! Addin resolutions: the unit of work of a run

use std::collections::BTreeSet;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{AddinHeader, ManifestFile, Uid};
use crate::record::{AddinBodyRecord, AddinIndexRecord};
use crate::report::{FailureKind, ResolutionReport};

use super::context::ResolutionContext;
use super::handle::{
    AddinHandle, AssemblyHandle, AssemblySetHandle, BuilderHandle, ExtensionHandle, PointHandle,
};
use super::status::{Resolvable, ResolutionStatus, ResolveEnv};

/// Persisted records reused verbatim by addins that need no rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedRecords {
    pub index: AddinIndexRecord,
    pub body: AddinBodyRecord,
}

/// How an addin relates to the persisted set, with the data each case
/// carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddinVariant {
    /// Seen for the first time.
    New,
    /// A new version of a persisted addin; keeps the persisted addin UID.
    Updated {
        previous_uid: Uid,
        previous_version: Version,
    },
    /// Persisted, and depends directly on an updated or removed addin.
    /// Rebuilt from its records and fully re-resolved.
    DirectlyAffected { uid: Uid },
    /// Persisted, and depends only transitively on a changed addin. Its
    /// records are reused; only its dependencies are re-checked.
    IndirectlyAffected { uid: Uid, cached: Box<CachedRecords> },
    /// Persisted and untouched by this run. Never re-resolved.
    Unaffected { uid: Uid, cached: Box<CachedRecords> },
}

/// [`AddinVariant`] without its payload, for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    New,
    Updated,
    DirectlyAffected,
    IndirectlyAffected,
    Unaffected,
}

impl AddinVariant {
    pub fn kind(&self) -> VariantKind {
        match self {
            Self::New => VariantKind::New,
            Self::Updated { .. } => VariantKind::Updated,
            Self::DirectlyAffected { .. } => VariantKind::DirectlyAffected,
            Self::IndirectlyAffected { .. } => VariantKind::IndirectlyAffected,
            Self::Unaffected { .. } => VariantKind::Unaffected,
        }
    }

    /// UID the addin keeps when persisted again, if any.
    pub fn persisted_uid(&self) -> Option<Uid> {
        match self {
            Self::New => None,
            Self::Updated { previous_uid, .. } => Some(*previous_uid),
            Self::DirectlyAffected { uid }
            | Self::IndirectlyAffected { uid, .. }
            | Self::Unaffected { uid, .. } => Some(*uid),
        }
    }

    /// Whether this exact addin (not a new version of it) is already in
    /// the store.
    pub fn is_persisted(&self) -> bool {
        matches!(
            self,
            Self::DirectlyAffected { .. }
                | Self::IndirectlyAffected { .. }
                | Self::Unaffected { .. }
        )
    }

    /// Records reused verbatim, for variants that skip the rebuild.
    pub fn cached(&self) -> Option<&CachedRecords> {
        match self {
            Self::IndirectlyAffected { cached, .. } | Self::Unaffected { cached, .. } => {
                Some(cached)
            }
            _ => None,
        }
    }
}

/// One addin during a run.
#[derive(Debug, Clone)]
pub struct AddinResolution {
    pub(crate) header: AddinHeader,
    pub(crate) manifest: ManifestFile,
    pub(crate) variant: AddinVariant,
    pub(crate) status: ResolutionStatus,
    pub(crate) assemblies: Vec<AssemblyHandle>,
    pub(crate) extension_points: Vec<PointHandle>,
    /// Builders this addin declares, parents before children.
    pub(crate) extension_builders: Vec<BuilderHandle>,
    /// Extensions this addin declares, parents before children.
    pub(crate) extensions: Vec<ExtensionHandle>,
    pub(crate) referenced_assembly_sets: BTreeSet<AssemblySetHandle>,
    pub(crate) extended_addins: BTreeSet<AddinHandle>,
    pub(crate) extended_extension_points: BTreeSet<PointHandle>,
    /// Problems found while registering or re-linking, reported on resolve.
    pub(crate) registration_errors: Vec<(FailureKind, String)>,
    pub(crate) enabled: bool,
}

impl AddinResolution {
    pub(crate) fn new(header: AddinHeader, manifest: ManifestFile, variant: AddinVariant) -> Self {
        let status = match variant {
            AddinVariant::Unaffected { .. } => ResolutionStatus::Success,
            _ => ResolutionStatus::Pending,
        };
        let enabled = header.enabled;
        Self {
            header,
            manifest,
            variant,
            status,
            assemblies: Vec::new(),
            extension_points: Vec::new(),
            extension_builders: Vec::new(),
            extensions: Vec::new(),
            referenced_assembly_sets: BTreeSet::new(),
            extended_addins: BTreeSet::new(),
            extended_extension_points: BTreeSet::new(),
            registration_errors: Vec::new(),
            enabled,
        }
    }

    pub fn header(&self) -> &AddinHeader {
        &self.header
    }

    pub fn manifest(&self) -> &ManifestFile {
        &self.manifest
    }

    pub fn variant(&self) -> &AddinVariant {
        &self.variant
    }

    pub fn status(&self) -> ResolutionStatus {
        self.status
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn label(&self) -> String {
        self.header.label()
    }

    pub(crate) fn asset_label(&self) -> String {
        format!("addin '{}'", self.header.name)
    }
}

impl Resolvable for AddinHandle {
    fn status(self, ctx: &ResolutionContext) -> ResolutionStatus {
        ctx.addin(self).status
    }

    fn set_status(self, ctx: &mut ResolutionContext, status: ResolutionStatus) {
        ctx.addin_mut(self).status = status;
    }

    fn try_resolve(
        self,
        ctx: &mut ResolutionContext,
        env: &mut ResolveEnv<'_>,
    ) -> Result<ResolutionStatus> {
        if let Some(status) = report_registration_errors(ctx, env, self) {
            return Ok(status);
        }
        match ctx.addin(self).variant.kind() {
            VariantKind::Unaffected => Ok(ResolutionStatus::Success),
            VariantKind::IndirectlyAffected => Ok(dependency_status(ctx, env, self)),
            VariantKind::New | VariantKind::Updated | VariantKind::DirectlyAffected => {
                resolve_declarations(ctx, env, self)
            }
        }
    }
}

fn report_registration_errors(
    ctx: &ResolutionContext,
    env: &mut ResolveEnv<'_>,
    addin: AddinHandle,
) -> Option<ResolutionStatus> {
    let errors = &ctx.addin(addin).registration_errors;
    if errors.is_empty() {
        return None;
    }
    let asset = ctx.addin(addin).asset_label();
    for (kind, message) in errors.clone() {
        env.fail(ctx, addin, asset.clone(), kind, message);
    }
    Some(ResolutionStatus::Failed)
}

/// Resolve every declared asset, then the addin-level dependencies.
///
/// All children are visited even after one fails or stays pending, so the
/// dependency edges are as complete as possible and every failure is
/// reported.
fn resolve_declarations(
    ctx: &mut ResolutionContext,
    env: &mut ResolveEnv<'_>,
    addin: AddinHandle,
) -> Result<ResolutionStatus> {
    let node = ctx.addin(addin);
    let assemblies = node.assemblies.clone();
    let points = node.extension_points.clone();
    let builders = node.extension_builders.clone();
    let extensions = node.extensions.clone();

    let mut status = ResolutionStatus::Success;
    for assembly in assemblies {
        status = status.and(assembly.resolve(ctx, env)?);
    }
    for point in points {
        status = status.and(point.resolve(ctx, env)?);
    }
    for builder in builders {
        status = status.and(builder.resolve(ctx, env)?);
    }
    for extension in extensions {
        status = status.and(extension.resolve(ctx, env)?);
    }

    if status != ResolutionStatus::Success {
        return Ok(status);
    }
    if env.config.enforce_category_rules && !check_categories(ctx, env, addin) {
        return Ok(ResolutionStatus::Failed);
    }
    Ok(dependency_status(ctx, env, addin))
}

/// Status of the addins this addin needs: extended addins and the
/// providers of every referenced assembly set.
fn dependency_status(
    ctx: &ResolutionContext,
    env: &mut ResolveEnv<'_>,
    addin: AddinHandle,
) -> ResolutionStatus {
    let node = ctx.addin(addin);
    let asset = node.asset_label();
    let mut status = ResolutionStatus::Success;

    for &dep in &node.extended_addins {
        let dep_status = ctx.addin(dep).status;
        if dep_status.is_failed() {
            let message = format!("extends failed addin {}", ctx.addin(dep).label());
            return env.fail(ctx, addin, asset, FailureKind::DependencyFailed, message);
        }
        status = status.and(dep_status);
    }
    for &set in &node.referenced_assembly_sets {
        let set_status = ctx.set_status(addin, set);
        if set_status.is_failed() {
            let message = format!(
                "no addin providing assembly {} resolved",
                ctx.assembly_set(set).identity
            );
            return env.fail(ctx, addin, asset, FailureKind::DependencyFailed, message);
        }
        status = status.and(set_status);
    }
    status
}

/// An addin may only depend on addins of the same or a more privileged
/// category. A referenced assembly set passes if any provider qualifies.
fn check_categories(
    ctx: &ResolutionContext,
    env: &mut ResolveEnv<'_>,
    addin: AddinHandle,
) -> bool {
    let node = ctx.addin(addin);
    let category = node.header.category;
    let asset = node.asset_label();

    for &dep in &node.extended_addins {
        let dep_category = ctx.addin(dep).header.category;
        if !category.may_depend_on(dep_category) {
            let message = format!(
                "{category} addin cannot extend {dep_category} addin {}",
                ctx.addin(dep).label()
            );
            env.fail(ctx, addin, asset, FailureKind::CategoryViolation, message);
            return false;
        }
    }
    for &set in &node.referenced_assembly_sets {
        let providers = ctx.set_providers(set);
        let allowed = providers
            .iter()
            .any(|&p| category.may_depend_on(ctx.addin(p).header.category));
        if !allowed {
            let message = format!(
                "{category} addin cannot reference assembly {} provided only by less privileged addins",
                ctx.assembly_set(set).identity
            );
            env.fail(ctx, addin, asset, FailureKind::CategoryViolation, message);
            return false;
        }
    }
    true
}

/// Compute effective enablement in resolved order.
///
/// `ordered` must be topologically sorted, so every dependency's state is
/// final when a dependent is visited.
pub(crate) fn propagate_enablement(
    ctx: &mut ResolutionContext,
    ordered: &[AddinHandle],
    report: &mut ResolutionReport,
) {
    for &addin in ordered {
        let node = ctx.addin(addin);
        let mut enabled = node.header.enabled;
        if !enabled && !node.header.category.can_disable() {
            tracing::warn!(addin = %node.label(), "Root addin declared disabled; keeping it enabled");
            report.message(format!("{} is a root addin and stays enabled", node.label()));
            enabled = true;
        }

        let disabled_dep = node
            .extended_addins
            .iter()
            .find(|&&dep| !ctx.addin(dep).enabled)
            .map(|&dep| ctx.addin(dep).label());
        let disabled_set = node.referenced_assembly_sets.iter().find(|&&set| {
            !ctx
                .set_providers(set)
                .iter()
                .any(|&p| ctx.addin(p).status.is_success() && ctx.addin(p).enabled)
        });

        if enabled {
            if let Some(dep) = disabled_dep {
                report.message(format!("{} disabled: depends on disabled addin {dep}", node.label()));
                enabled = false;
            } else if let Some(&set) = disabled_set {
                report.message(format!(
                    "{} disabled: no enabled provider of assembly {}",
                    node.label(),
                    ctx.assembly_set(set).identity
                ));
                enabled = false;
            }
        }
        ctx.addin_mut(addin).enabled = enabled;
    }
}
