//! Fixed-point loop over pending addins

use crate::error::Result;
use crate::report::FailureKind;

use super::context::ResolutionContext;
use super::handle::AddinHandle;
use super::status::{Resolvable, ResolutionStatus, ResolveEnv};

/// Result of driving a working list to a fixed point.
#[derive(Debug, Default)]
pub(crate) struct DriverOutcome {
    /// Resolved addins, each after every addin it depends on.
    pub resolved: Vec<AddinHandle>,
    /// Addins that failed, directly or through a dependency.
    pub failed: Vec<AddinHandle>,
    /// Addins left pending when the loop stopped making progress.
    pub unresolvable: Vec<AddinHandle>,
}

/// Resolve `working` round-robin until nothing changes.
///
/// A success moves the addin to the result list. A failure removes the
/// addin and every working addin that cannot resolve without it. A pending
/// addin is retried later; once every remaining addin has been retried
/// without progress the loop stops.
pub(crate) fn resolve_all(
    ctx: &mut ResolutionContext,
    env: &mut ResolveEnv<'_>,
    mut working: Vec<AddinHandle>,
) -> Result<DriverOutcome> {
    let mut outcome = DriverOutcome::default();
    let mut index = 0;
    let mut retry = 0;
    let mut rounds = 0;

    while !working.is_empty() && retry <= working.len() {
        if env.config.max_rounds.is_some_and(|max| rounds >= max) {
            tracing::warn!(rounds, "Resolution stopped at the configured round limit");
            break;
        }
        rounds += 1;
        index %= working.len();
        let addin = working[index];

        match addin.resolve(ctx, env)? {
            ResolutionStatus::Success => {
                tracing::debug!(addin = %ctx.addin(addin).label(), "Resolved");
                working.remove(index);
                outcome.resolved.push(addin);
                retry = 0;
            }
            ResolutionStatus::Pending => {
                index += 1;
                retry += 1;
            }
            ResolutionStatus::Failed => {
                tracing::debug!(addin = %ctx.addin(addin).label(), "Failed");
                let removed = remove_with_dependents(ctx, env, &mut working, addin);
                outcome.failed.extend(removed);
                retry = 0;
            }
        }
    }

    for addin in working {
        let label = ctx.addin(addin).label();
        if env.config.report_unresolvable {
            let asset = ctx.addin(addin).asset_label();
            env.fail(
                ctx,
                addin,
                asset,
                FailureKind::Unresolvable,
                "dependencies never settled; likely a dependency cycle",
            );
        } else {
            tracing::warn!(addin = %label, "Dropping unresolvable addin");
        }
        ctx.addin_mut(addin).status = ResolutionStatus::Failed;
        outcome.unresolvable.push(addin);
    }

    tracing::debug!(
        rounds,
        resolved = outcome.resolved.len(),
        failed = outcome.failed.len(),
        unresolvable = outcome.unresolvable.len(),
        "Fixed-point loop finished"
    );
    Ok(outcome)
}

/// Fail `failed` and, transitively, every addin in `list` that cannot
/// resolve without it. Returns the removed addins, `failed` first.
///
/// Removal keeps the relative order of the survivors, so it is safe on the
/// ordered result list as well as on the working list.
pub(crate) fn remove_with_dependents(
    ctx: &mut ResolutionContext,
    env: &mut ResolveEnv<'_>,
    list: &mut Vec<AddinHandle>,
    failed: AddinHandle,
) -> Vec<AddinHandle> {
    let mut removed = Vec::new();
    let mut queue = vec![failed];
    ctx.addin_mut(failed).status = ResolutionStatus::Failed;
    list.retain(|&h| h != failed);

    while let Some(current) = queue.pop() {
        removed.push(current);
        let dependents: Vec<AddinHandle> = list
            .iter()
            .copied()
            .filter(|&h| !ctx.can_resolve_without(h, current))
            .collect();
        for dependent in dependents {
            list.retain(|&h| h != dependent);
            ctx.addin_mut(dependent).status = ResolutionStatus::Failed;
            let asset = ctx.addin(dependent).asset_label();
            let message = format!("depends on failed addin {}", ctx.addin(current).label());
            env.fail(ctx, dependent, asset, FailureKind::DependencyFailed, message);
            queue.push(dependent);
        }
    }
    removed
}
