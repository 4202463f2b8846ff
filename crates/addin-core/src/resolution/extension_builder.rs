//! Extension builders, declared and referenced

use crate::error::Result;
use crate::model::{PATH_SEPARATOR, Uid, root_point_id};
use crate::report::FailureKind;

use super::context::{ResolutionContext, ResolvedType};
use super::extension_point::check_instantiable;
use super::handle::{AddinHandle, BuilderHandle, PointHandle};
use super::status::{Resolvable, ResolutionStatus, ResolveEnv, link_status};

/// What a builder hangs below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderParent {
    Point(PointHandle),
    Builder(BuilderHandle),
}

impl BuilderParent {
    /// Find the parent for `parent_path`: a bare id names an extension
    /// point, anything longer names a builder.
    pub(crate) fn find(ctx: &ResolutionContext, parent_path: &str) -> Option<Self> {
        if parent_path.contains(PATH_SEPARATOR) {
            ctx.builder_by_path(parent_path).map(Self::Builder)
        } else {
            ctx.point_by_id(parent_path).map(Self::Point)
        }
    }

    pub(crate) fn owner(self, ctx: &ResolutionContext) -> AddinHandle {
        match self {
            Self::Point(point) => ctx.point(point).owner,
            Self::Builder(builder) => ctx.builder(builder).owner,
        }
    }

    pub(crate) fn signature(self, ctx: &ResolutionContext) -> Option<&ResolvedType> {
        match self {
            Self::Point(point) => ctx.point(point).signature.as_ref(),
            Self::Builder(builder) => ctx.builder_signature(builder),
        }
    }

    pub(crate) fn label(self, ctx: &ResolutionContext) -> String {
        match self {
            Self::Point(point) => ctx.point(point).asset_label(),
            Self::Builder(builder) => ctx.builder(builder).asset_label(),
        }
    }

    fn link(
        self,
        ctx: &mut ResolutionContext,
        env: &mut ResolveEnv<'_>,
        owner: AddinHandle,
    ) -> Result<ResolutionStatus> {
        let parent_owner = self.owner(ctx);
        match self {
            Self::Point(point) => link_status(ctx, env, owner, parent_owner, point),
            Self::Builder(builder) => link_status(ctx, env, owner, parent_owner, builder),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuilderResolutionKind {
    /// Backed by a type of its own.
    Declared { type_name: String },
    /// Reuses the signature of an ancestor builder with the same id, which
    /// is how recursive trees such as nested menus are declared.
    Referenced {
        target: Option<BuilderHandle>,
        /// Target UID from the store, used to re-link cached builders.
        persisted_target: Option<Uid>,
    },
}

#[derive(Debug, Clone)]
pub struct ExtensionBuilderResolution {
    pub(crate) owner: AddinHandle,
    pub(crate) id: String,
    pub(crate) parent_path: String,
    pub(crate) path: String,
    pub(crate) description: Option<String>,
    pub(crate) uid: Option<Uid>,
    pub(crate) status: ResolutionStatus,
    pub(crate) kind: BuilderResolutionKind,
    pub(crate) parent: Option<BuilderParent>,
    pub(crate) signature: Option<ResolvedType>,
}

impl ExtensionBuilderResolution {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn signature(&self) -> Option<&ResolvedType> {
        self.signature.as_ref()
    }

    pub(crate) fn asset_label(&self) -> String {
        format!("extension builder '{}'", self.path)
    }
}

impl Resolvable for BuilderHandle {
    fn status(self, ctx: &ResolutionContext) -> ResolutionStatus {
        ctx.builder(self).status
    }

    fn set_status(self, ctx: &mut ResolutionContext, status: ResolutionStatus) {
        ctx.builder_mut(self).status = status;
    }

    fn try_resolve(
        self,
        ctx: &mut ResolutionContext,
        env: &mut ResolveEnv<'_>,
    ) -> Result<ResolutionStatus> {
        let builder = ctx.builder(self);
        let owner = builder.owner;
        let asset = builder.asset_label();
        let parent_path = builder.parent_path.clone();

        let Some(parent) = BuilderParent::find(ctx, &parent_path) else {
            let message = format!("parent '{parent_path}' does not exist");
            return Ok(env.fail(ctx, owner, asset, FailureKind::MissingParent, message));
        };
        match parent.link(ctx, env, owner)? {
            ResolutionStatus::Success => {}
            ResolutionStatus::Pending => return Ok(ResolutionStatus::Pending),
            ResolutionStatus::Failed => {
                let message = format!("parent {} failed", parent.label(ctx));
                return Ok(env.fail(ctx, owner, asset, FailureKind::DependencyFailed, message));
            }
        }
        ctx.builder_mut(self).parent = Some(parent);

        let Some(parent_signature) = parent.signature(ctx).cloned() else {
            let message = format!("parent {} has no resolved type", parent.label(ctx));
            return Ok(env.fail(ctx, owner, asset, FailureKind::DependencyFailed, message));
        };
        if !parent_signature.composite {
            let message = format!("parent {} does not accept child builders", parent.label(ctx));
            return Ok(env.fail(ctx, owner, asset, FailureKind::RuleViolation, message));
        }

        let resolved = match ctx.builder(self).kind.clone() {
            BuilderResolutionKind::Declared { type_name } => {
                resolve_declared(ctx, env, self, &type_name, &parent_signature)?
            }
            BuilderResolutionKind::Referenced { .. } => {
                resolve_referenced(ctx, env, self, parent, &parent_signature)?
            }
        };
        let signature = match resolved {
            Ok(signature) => signature,
            Err(status) => return Ok(status),
        };
        ctx.builder_mut(self).signature = Some(signature);

        let path = ctx.builder(self).path.clone();
        if let Some(point) = ctx.point_by_id(root_point_id(&path)) {
            ctx.depend_on_point(owner, point);
        }
        Ok(ResolutionStatus::Success)
    }
}

/// Outcome of the kind-specific half: a signature, or the status to stop
/// with.
type KindOutcome = std::result::Result<ResolvedType, ResolutionStatus>;

fn resolve_declared(
    ctx: &mut ResolutionContext,
    env: &mut ResolveEnv<'_>,
    builder: BuilderHandle,
    type_name: &str,
    parent_signature: &ResolvedType,
) -> Result<KindOutcome> {
    let owner = ctx.builder(builder).owner;
    let asset = ctx.builder(builder).asset_label();

    let Some(lookup) = ctx.get_unique_addin_type(owner, type_name, env.introspector)? else {
        let message = format!("type '{type_name}' not found");
        return Ok(Err(env.fail(ctx, owner, asset, FailureKind::MissingType, message)));
    };
    match ctx.depend_on_type(owner, &lookup) {
        ResolutionStatus::Success => {}
        ResolutionStatus::Pending => return Ok(Err(ResolutionStatus::Pending)),
        ResolutionStatus::Failed => {
            let message = format!("addin providing type '{type_name}' failed");
            return Ok(Err(env.fail(ctx, owner, asset, FailureKind::DependencyFailed, message)));
        }
    }

    if let Err(message) = check_instantiable(&lookup.metadata) {
        return Ok(Err(env.fail(ctx, owner, asset, FailureKind::RuleViolation, message)));
    }
    let Some((extension_type, composite)) = lookup.metadata.builder_capability() else {
        let message = format!("type '{type_name}' is not an extension builder");
        return Ok(Err(env.fail(ctx, owner, asset, FailureKind::RuleViolation, message)));
    };
    if extension_type != parent_signature.extension_type {
        let message = format!(
            "builds '{extension_type}' but the parent expects '{}'",
            parent_signature.extension_type
        );
        return Ok(Err(env.fail(ctx, owner, asset, FailureKind::RuleViolation, message)));
    }
    Ok(Ok(ResolvedType::from_lookup(&lookup, extension_type, composite)))
}

fn resolve_referenced(
    ctx: &mut ResolutionContext,
    env: &mut ResolveEnv<'_>,
    builder: BuilderHandle,
    parent: BuilderParent,
    parent_signature: &ResolvedType,
) -> Result<KindOutcome> {
    let node = ctx.builder(builder);
    let owner = node.owner;
    let asset = node.asset_label();
    let id = node.id.clone();
    let parent_path = node.parent_path.clone();

    let Some(target) = find_ancestor(ctx, parent, &id).or_else(|| find_by_prefix(ctx, &parent_path, &id))
    else {
        let message = format!("no ancestor builder with id '{id}'");
        return Ok(Err(env.fail(ctx, owner, asset, FailureKind::MissingBuilder, message)));
    };

    let target_owner = ctx.builder(target).owner;
    match link_status(ctx, env, owner, target_owner, target)? {
        ResolutionStatus::Success => {}
        ResolutionStatus::Pending => return Ok(Err(ResolutionStatus::Pending)),
        ResolutionStatus::Failed => {
            let message = format!("referenced {} failed", ctx.builder(target).asset_label());
            return Ok(Err(env.fail(ctx, owner, asset, FailureKind::DependencyFailed, message)));
        }
    }

    let Some(signature) = ctx.builder_signature(target).cloned() else {
        let message = format!("referenced {} has no resolved type", ctx.builder(target).asset_label());
        return Ok(Err(env.fail(ctx, owner, asset, FailureKind::DependencyFailed, message)));
    };
    if signature.extension_type != parent_signature.extension_type {
        let message = format!(
            "referenced builder builds '{}' but the parent expects '{}'",
            signature.extension_type, parent_signature.extension_type
        );
        return Ok(Err(env.fail(ctx, owner, asset, FailureKind::RuleViolation, message)));
    }

    ctx.builder_mut(builder).kind = BuilderResolutionKind::Referenced {
        target: Some(target),
        persisted_target: None,
    };
    Ok(Ok(signature))
}

/// Walk up the linked builder chain starting at `parent`.
fn find_ancestor(ctx: &ResolutionContext, parent: BuilderParent, id: &str) -> Option<BuilderHandle> {
    let mut cursor = Some(parent);
    while let Some(BuilderParent::Builder(builder)) = cursor {
        let node = ctx.builder(builder);
        if node.id == id {
            return Some(builder);
        }
        cursor = node.parent;
    }
    None
}

/// Fallback for chains not linked yet: prefixes of `parent_path` ending in
/// `id`, longest first.
fn find_by_prefix(ctx: &ResolutionContext, parent_path: &str, id: &str) -> Option<BuilderHandle> {
    let segments: Vec<&str> = parent_path.split(PATH_SEPARATOR).collect();
    (2..=segments.len())
        .rev()
        .filter(|&end| segments[end - 1] == id)
        .find_map(|end| ctx.builder_by_path(&segments[..end].join("/")))
}
