//! Identity and path collisions between addins

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::CollisionPolicy;
use crate::model::AddinId;
use crate::report::FailureKind;

use super::addin::VariantKind;
use super::context::ResolutionContext;
use super::driver::remove_with_dependents;
use super::handle::AddinHandle;
use super::status::{ResolutionStatus, ResolveEnv};

/// What two or more addins competed for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum CollisionKey {
    Addin(AddinId),
    ExtensionPoint(String),
    ExtensionBuilder(String),
    Extension(String),
}

impl fmt::Display for CollisionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Addin(id) => write!(f, "addin id {id}"),
            Self::ExtensionPoint(id) => write!(f, "extension point '{id}'"),
            Self::ExtensionBuilder(path) => write!(f, "extension builder '{path}'"),
            Self::Extension(path) => write!(f, "extension '{path}'"),
        }
    }
}

/// One settled collision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionEntry {
    pub key: CollisionKey,
    /// Surviving competitors at trim time, in registration order.
    pub competitors: Vec<AddinId>,
    /// The competitor kept, or `None` when all were rejected.
    pub kept: Option<AddinId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionReport {
    pub entries: Vec<CollisionEntry>,
}

impl CollisionReport {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, key: &CollisionKey) -> Option<&CollisionEntry> {
        self.entries.iter().find(|e| &e.key == key)
    }
}

/// Competitors per collision key, gathered during registration.
#[derive(Debug, Clone, Default)]
pub struct AddinCollision {
    buckets: BTreeMap<CollisionKey, Vec<AddinHandle>>,
}

impl AddinCollision {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `incoming` lost registration of `key` to `existing`.
    pub(crate) fn add(&mut self, key: CollisionKey, existing: AddinHandle, incoming: AddinHandle) {
        let bucket = self.buckets.entry(key).or_default();
        for handle in [existing, incoming] {
            if !bucket.contains(&handle) {
                bucket.push(handle);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Settle every collision once the fixed-point loop is done.
    ///
    /// Failed competitors drop out first; a bucket left with one survivor
    /// is no longer a collision. Otherwise an already persisted competitor
    /// wins, preferring unaffected ones. Without one, `policy` decides.
    /// Losers are failed and removed from `resolved` together with
    /// everything that depends on them.
    pub(crate) fn trim(
        &mut self,
        ctx: &mut ResolutionContext,
        env: &mut ResolveEnv<'_>,
        resolved: &mut Vec<AddinHandle>,
        policy: CollisionPolicy,
    ) -> CollisionReport {
        self.buckets.retain(|_, competitors| {
            competitors.retain(|&h| !ctx.addin(h).status.is_failed());
            competitors.len() > 1
        });

        let mut report = CollisionReport::default();
        for (key, competitors) in &self.buckets {
            // An earlier bucket may have removed some of these already.
            let survivors: Vec<AddinHandle> = competitors
                .iter()
                .copied()
                .filter(|&h| !ctx.addin(h).status.is_failed())
                .collect();
            if survivors.len() <= 1 {
                continue;
            }

            let winner = pick_winner(ctx, &survivors, policy);
            let losers: Vec<AddinHandle> = survivors
                .iter()
                .copied()
                .filter(|&h| Some(h) != winner)
                .collect();
            // Every loser is reported as such before any removal cascades
            // into another loser.
            for &loser in &losers {
                let asset = ctx.addin(loser).asset_label();
                let message = match winner {
                    Some(w) => format!("{key} is already provided by {}", ctx.addin(w).label()),
                    None => format!("{key} is declared by more than one addin"),
                };
                tracing::warn!(addin = %ctx.addin(loser).label(), %key, "Rejecting colliding addin");
                env.fail(ctx, loser, asset, FailureKind::Collision, message);
                ctx.addin_mut(loser).status = ResolutionStatus::Failed;
            }
            for loser in losers {
                remove_with_dependents(ctx, env, resolved, loser);
            }

            report.entries.push(CollisionEntry {
                key: key.clone(),
                competitors: survivors.iter().map(|&h| ctx.addin(h).header.id).collect(),
                kept: winner.map(|w| ctx.addin(w).header.id),
            });
        }
        report
    }
}

fn pick_winner(
    ctx: &ResolutionContext,
    survivors: &[AddinHandle],
    policy: CollisionPolicy,
) -> Option<AddinHandle> {
    let kind = |h: AddinHandle| ctx.addin(h).variant.kind();
    survivors
        .iter()
        .copied()
        .find(|&h| kind(h) == VariantKind::Unaffected)
        .or_else(|| {
            survivors
                .iter()
                .copied()
                .find(|&h| ctx.addin(h).variant.is_persisted())
        })
        .or(match policy {
            CollisionPolicy::KeepFirst => survivors.first().copied(),
            CollisionPolicy::RejectAll => None,
        })
}
