//! Extensions

use std::collections::BTreeMap;

use crate::error::Result;
use crate::model::{PATH_SEPARATOR, SiblingRef, Uid, join_path, root_point_id};
use crate::report::FailureKind;

use super::context::ResolutionContext;
use super::handle::{AddinHandle, BuilderHandle, ExtensionHandle, PointHandle};
use super::status::{Resolvable, ResolutionStatus, ResolveEnv, link_status};

/// How an extension names its builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuilderRef {
    /// Full builder path, as written in a manifest.
    Path(String),
    /// Builder UID, as persisted.
    Uid(Uid),
}

/// What an extension hangs below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionParent {
    Point(PointHandle),
    Extension(ExtensionHandle),
}

impl ExtensionParent {
    pub(crate) fn find(ctx: &ResolutionContext, parent_path: &str) -> Option<Self> {
        if parent_path.contains(PATH_SEPARATOR) {
            ctx.extension_by_path(parent_path).map(Self::Extension)
        } else {
            ctx.point_by_id(parent_path).map(Self::Point)
        }
    }

    fn owner(self, ctx: &ResolutionContext) -> AddinHandle {
        match self {
            Self::Point(point) => ctx.point(point).owner,
            Self::Extension(extension) => ctx.extension(extension).owner,
        }
    }

    fn label(self, ctx: &ResolutionContext) -> String {
        match self {
            Self::Point(point) => ctx.point(point).asset_label(),
            Self::Extension(extension) => ctx.extension(extension).asset_label(),
        }
    }

    /// Paths the builder of a child extension may hang below. Under an
    /// extension built by a referenced builder, the children of every
    /// builder it aliases qualify as well.
    fn expected_builder_parents(self, ctx: &ResolutionContext) -> Vec<String> {
        match self {
            Self::Point(point) => vec![ctx.point(point).id.clone()],
            Self::Extension(extension) => ctx
                .extension(extension)
                .builder
                .map(|builder| {
                    ctx.builder_alias_chain(builder)
                        .into_iter()
                        .map(|b| ctx.builder(b).path.clone())
                        .collect()
                })
                .unwrap_or_default(),
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
            Self::Extension(extension) => link_status(ctx, env, owner, parent_owner, extension),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtensionResolution {
    pub(crate) owner: AddinHandle,
    pub(crate) id: String,
    pub(crate) parent_path: String,
    pub(crate) path: String,
    pub(crate) status: ResolutionStatus,
    pub(crate) builder_ref: BuilderRef,
    pub(crate) sibling: Option<SiblingRef>,
    pub(crate) data: BTreeMap<String, String>,
    pub(crate) parent: Option<ExtensionParent>,
    pub(crate) builder: Option<BuilderHandle>,
    pub(crate) sibling_link: Option<ExtensionHandle>,
}

impl ExtensionResolution {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn data(&self) -> &BTreeMap<String, String> {
        &self.data
    }

    pub fn parent(&self) -> Option<ExtensionParent> {
        self.parent
    }

    pub fn builder(&self) -> Option<BuilderHandle> {
        self.builder
    }

    /// The extension this one is ordered against, once linked.
    pub fn sibling(&self) -> Option<ExtensionHandle> {
        self.sibling_link
    }

    pub(crate) fn asset_label(&self) -> String {
        format!("extension '{}'", self.path)
    }
}

impl Resolvable for ExtensionHandle {
    fn status(self, ctx: &ResolutionContext) -> ResolutionStatus {
        ctx.extension(self).status
    }

    fn set_status(self, ctx: &mut ResolutionContext, status: ResolutionStatus) {
        ctx.extension_mut(self).status = status;
    }

    fn try_resolve(
        self,
        ctx: &mut ResolutionContext,
        env: &mut ResolveEnv<'_>,
    ) -> Result<ResolutionStatus> {
        let node = ctx.extension(self);
        let owner = node.owner;
        let asset = node.asset_label();
        let parent_path = node.parent_path.clone();
        let builder_ref = node.builder_ref.clone();
        let sibling = node.sibling.clone();

        // Parent first: an unresolved parent chain in another addin is a
        // retry, not a failure.
        let Some(parent) = ExtensionParent::find(ctx, &parent_path) else {
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
        ctx.extension_mut(self).parent = Some(parent);

        let Some(builder) = ctx.find_builder(&builder_ref) else {
            let message = match &builder_ref {
                BuilderRef::Path(path) => format!("builder '{path}' does not exist"),
                BuilderRef::Uid(uid) => format!("builder {uid} no longer exists"),
            };
            return Ok(env.fail(ctx, owner, asset, FailureKind::MissingBuilder, message));
        };
        let builder_owner = ctx.builder(builder).owner;
        match link_status(ctx, env, owner, builder_owner, builder)? {
            ResolutionStatus::Success => {}
            ResolutionStatus::Pending => return Ok(ResolutionStatus::Pending),
            ResolutionStatus::Failed => {
                let message = format!("{} failed", ctx.builder(builder).asset_label());
                return Ok(env.fail(ctx, owner, asset, FailureKind::DependencyFailed, message));
            }
        }
        ctx.extension_mut(self).builder = Some(builder);

        if let Some(sibling) = sibling {
            let sibling_path = join_path(&parent_path, &sibling.id);
            let Some(target) = ctx.extension_by_path(&sibling_path).filter(|&s| s != self) else {
                let message = format!("sibling '{sibling_path}' does not exist");
                return Ok(env.fail(ctx, owner, asset, FailureKind::MissingSibling, message));
            };
            let sibling_owner = ctx.extension(target).owner;
            ctx.depend_on_addin(owner, sibling_owner);
            ctx.extension_mut(self).sibling_link = Some(target);
        }

        let builder_node = ctx.builder(builder);
        let expected = parent.expected_builder_parents(ctx);
        if !expected.iter().any(|path| *path == builder_node.parent_path) {
            let message = format!(
                "{} is not a child builder of {}",
                builder_node.asset_label(),
                parent.label(ctx)
            );
            return Ok(env.fail(ctx, owner, asset, FailureKind::BuilderMismatch, message));
        }

        let Some(signature) = ctx.builder_signature(builder) else {
            let message = format!("{} has no resolved type", builder_node.asset_label());
            return Ok(env.fail(ctx, owner, asset, FailureKind::DependencyFailed, message));
        };
        let missing: Vec<&str> = signature.missing_required(&ctx.extension(self).data).collect();
        if !missing.is_empty() {
            let message = format!("no value for required properties: {}", missing.join(", "));
            return Ok(env.fail(ctx, owner, asset, FailureKind::MissingData, message));
        }

        let path = ctx.extension(self).path.clone();
        if let Some(point) = ctx.point_by_id(root_point_id(&path)) {
            ctx.depend_on_point(owner, point);
        }
        Ok(ResolutionStatus::Success)
    }
}
