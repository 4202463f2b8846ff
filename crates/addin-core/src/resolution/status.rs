//! Resolution status and the resolve-once contract

use serde::{Deserialize, Serialize};

use crate::config::ResolverConfig;
use crate::error::Result;
use crate::ports::TypeIntrospector;
use crate::report::{FailureKind, ResolutionFailure, ResolutionReport};

use super::context::ResolutionContext;
use super::handle::AddinHandle;

/// Progress of one resolvable.
///
/// Monotonic: `Pending` moves to `Success` or `Failed` and never back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    /// Waiting on something not yet resolved. A retry signal, not an error.
    #[default]
    Pending,
    Success,
    Failed,
}

impl ResolutionStatus {
    pub fn is_settled(self) -> bool {
        self != Self::Pending
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }

    pub fn is_failed(self) -> bool {
        self == Self::Failed
    }

    /// Status of a whole given the status of two of its parts.
    ///
    /// Failure wins over pending, pending wins over success.
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::Failed, _) | (_, Self::Failed) => Self::Failed,
            (Self::Pending, _) | (_, Self::Pending) => Self::Pending,
            _ => Self::Success,
        }
    }
}

/// Collaborators shared by every resolve call of one run.
pub(crate) struct ResolveEnv<'a> {
    pub introspector: &'a dyn TypeIntrospector,
    pub config: &'a ResolverConfig,
    pub report: &'a mut ResolutionReport,
}

impl ResolveEnv<'_> {
    /// Record a terminal failure of an asset owned by `owner` and return
    /// [`ResolutionStatus::Failed`].
    pub fn fail(
        &mut self,
        ctx: &ResolutionContext,
        owner: AddinHandle,
        asset: String,
        kind: FailureKind,
        message: impl Into<String>,
    ) -> ResolutionStatus {
        let addin = ctx.addin(owner);
        self.report.fail(ResolutionFailure {
            addin: Some(addin.header.id),
            manifest: addin.manifest.path.clone(),
            asset,
            kind,
            message: message.into(),
        });
        ResolutionStatus::Failed
    }
}

/// Something that resolves at most once.
///
/// [`resolve`](Resolvable::resolve) returns the cached status once settled,
/// which keeps recursion on cyclic graphs finite. Implementors provide the
/// actual work in [`try_resolve`](Resolvable::try_resolve).
pub(crate) trait Resolvable: Copy {
    fn status(self, ctx: &ResolutionContext) -> ResolutionStatus;

    fn set_status(self, ctx: &mut ResolutionContext, status: ResolutionStatus);

    fn try_resolve(
        self,
        ctx: &mut ResolutionContext,
        env: &mut ResolveEnv<'_>,
    ) -> Result<ResolutionStatus>;

    fn resolve(
        self,
        ctx: &mut ResolutionContext,
        env: &mut ResolveEnv<'_>,
    ) -> Result<ResolutionStatus> {
        let current = self.status(ctx);
        if current.is_settled() {
            return Ok(current);
        }
        let status = self.try_resolve(ctx, env)?;
        if status.is_settled() {
            self.set_status(ctx, status);
        }
        Ok(status)
    }
}

/// Status of `target`, owned by `target_owner`, as seen from an asset of
/// `owner`.
///
/// Targets of the same addin are resolved recursively. Targets of another
/// addin only add a dependency edge; their addin gets its own turn in the
/// fixed-point loop, so their current status is all that counts here.
pub(crate) fn link_status<R: Resolvable>(
    ctx: &mut ResolutionContext,
    env: &mut ResolveEnv<'_>,
    owner: AddinHandle,
    target_owner: AddinHandle,
    target: R,
) -> Result<ResolutionStatus> {
    if target_owner == owner {
        target.resolve(ctx, env)
    } else {
        ctx.depend_on_addin(owner, target_owner);
        Ok(target.status(ctx))
    }
}
