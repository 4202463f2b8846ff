//! Entry points of a resolution run

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::config::ResolverConfig;
use crate::error::Result;
use crate::model::{AddinCategory, AddinDescription, AddinId, Uid};
use crate::ports::{AddinStore, FilePack, FileScanner, ManifestParser, ResolutionInput, TypeIntrospector};
use crate::record::{InvalidAddinRecord, StoreSnapshot};
use crate::report::{FailureKind, ResolutionFailure, ResolutionReport};
use crate::resolution::{
    AddinCollision, AddinHandle, AddinVariant, CachedRecords, CollisionReport, PersistedClass,
    Registrar, ResolutionContext, ResolveEnv, UidAllocator, VariantKind, build_snapshot,
    link_cached, propagate_enablement, reclassify, resolve_all,
};

/// An addin that made it through the run, in resolved order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAddin {
    pub id: AddinId,
    pub uid: Uid,
    pub name: String,
    pub version: Version,
    pub category: AddinCategory,
    /// Effective state after propagation, not the declared flag.
    pub enabled: bool,
    pub variant: VariantKind,
    pub manifest: PathBuf,
    /// Extended and referenced addins, all earlier in the resolved order.
    pub dependencies: Vec<AddinId>,
}

/// A pack rejected by this run, with every failure recorded against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidPack {
    pub manifest: PathBuf,
    pub addin: Option<AddinId>,
    pub failures: Vec<ResolutionFailure>,
}

impl InvalidPack {
    pub fn to_record(&self) -> InvalidAddinRecord {
        InvalidAddinRecord {
            manifest: self.manifest.clone(),
            addin: self.addin,
            reasons: self.failures.iter().map(ToString::to_string).collect(),
        }
    }

    pub fn has_failure(&self, kind: FailureKind) -> bool {
        self.failures.iter().any(|f| f.kind == kind)
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionOutcome {
    pub ordered: Vec<ResolvedAddin>,
    pub invalid: Vec<InvalidPack>,
    pub collisions: CollisionReport,
    pub report: ResolutionReport,
    /// Records to persist; already written when the run went through a
    /// store.
    pub snapshot: StoreSnapshot,
}

impl ResolutionOutcome {
    pub fn get(&self, id: AddinId) -> Option<&ResolvedAddin> {
        self.ordered.iter().find(|a| a.id == id)
    }

    /// Position of an addin in the resolved order.
    pub fn position(&self, id: AddinId) -> Option<usize> {
        self.ordered.iter().position(|a| a.id == id)
    }

    pub fn is_resolved(&self, id: AddinId) -> bool {
        self.position(id).is_some()
    }

    pub fn invalid_pack(&self, id: AddinId) -> Option<&InvalidPack> {
        self.invalid.iter().find(|p| p.addin == Some(id))
    }

    pub fn is_invalid(&self, id: AddinId) -> bool {
        self.invalid_pack(id).is_some()
    }
}

/// Resolves candidate packs against the persisted addin set.
///
/// Runs against the same store must not overlap; callers serialize them.
pub struct Resolver<'a> {
    parser: &'a dyn ManifestParser,
    introspector: &'a dyn TypeIntrospector,
    config: ResolverConfig,
}

impl<'a> Resolver<'a> {
    pub fn new(parser: &'a dyn ManifestParser, introspector: &'a dyn TypeIntrospector) -> Self {
        Self {
            parser,
            introspector,
            config: ResolverConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Scan for changes, resolve them and persist the result.
    pub fn run(
        &self,
        scanner: &dyn FileScanner,
        store: &mut dyn AddinStore,
    ) -> Result<ResolutionOutcome> {
        let snapshot = store.load()?;
        let input = scanner.scan(&snapshot)?;
        let outcome = self.resolve(&input, &snapshot)?;
        persist(store, &outcome.snapshot)?;
        Ok(outcome)
    }

    /// Resolve `input` against the store's snapshot and persist the result
    /// in one transaction. On a store error nothing is applied.
    pub fn resolve_and_persist(
        &self,
        input: &ResolutionInput,
        store: &mut dyn AddinStore,
    ) -> Result<ResolutionOutcome> {
        let snapshot = store.load()?;
        let outcome = self.resolve(input, &snapshot)?;
        persist(store, &outcome.snapshot)?;
        Ok(outcome)
    }

    /// Resolve `input` against `snapshot` without touching any store.
    ///
    /// Individual bad addins never make this fail; they end up in
    /// [`ResolutionOutcome::invalid`]. Only an ambiguous type name aborts
    /// the run.
    pub fn resolve(
        &self,
        input: &ResolutionInput,
        snapshot: &StoreSnapshot,
    ) -> Result<ResolutionOutcome> {
        tracing::info!(
            candidates = input.candidates.len(),
            removed = input.removed.len(),
            persisted = snapshot.index.len(),
            "Starting addin resolution"
        );
        let mut report = ResolutionReport::new();
        let mut rejected_manifests = Vec::new();

        let mut descriptions = Vec::with_capacity(input.candidates.len());
        for pack in &input.candidates {
            match self.parse(pack) {
                Ok(description) => descriptions.push(description),
                Err(failure) => {
                    rejected_manifests.push(pack.manifest.clone());
                    report.fail(failure);
                }
            }
        }

        let candidate_ids: Vec<AddinId> = descriptions.iter().map(|d| d.header.id).collect();
        let classes = reclassify(snapshot, &candidate_ids, &input.removed);

        let mut ctx = ResolutionContext::new(UidAllocator::new(snapshot.uids));
        let mut collisions = AddinCollision::new();
        let persisted = snapshot.addins();

        // Superseded addins are not registered, but extensions of other
        // addins may still point at their builders by UID.
        let mut previous: HashMap<AddinId, (Uid, Version)> = HashMap::new();
        for (index, body) in &persisted {
            if classes.class_of(index.id()) == Some(PersistedClass::Superseded) {
                previous.insert(index.id(), (index.uid, index.header.version.clone()));
                for builder in &body.extension_builders {
                    ctx.register_moved_builder(builder.uid, builder.path());
                }
            }
        }

        {
            let mut registrar = Registrar::new(&mut ctx, &mut collisions);
            for (index, body) in &persisted {
                let uid = index.uid;
                let cached = || {
                    Box::new(CachedRecords {
                        index: (*index).clone(),
                        body: body.clone(),
                    })
                };
                let variant = match classes.class_of(index.id()) {
                    Some(PersistedClass::Superseded) | None => continue,
                    Some(PersistedClass::DirectlyAffected) => AddinVariant::DirectlyAffected { uid },
                    Some(PersistedClass::IndirectlyAffected) => AddinVariant::IndirectlyAffected {
                        uid,
                        cached: cached(),
                    },
                    Some(PersistedClass::Unaffected) => AddinVariant::Unaffected {
                        uid,
                        cached: cached(),
                    },
                };
                registrar.register_persisted(index, body, variant);
            }

            for (position, description) in descriptions.into_iter().enumerate() {
                let variant = match previous.get(&description.header.id) {
                    Some((previous_uid, previous_version)) if classes.is_update(position) => {
                        tracing::info!(
                            addin = %description.header.label(),
                            from = %previous_version,
                            "Updating persisted addin"
                        );
                        AddinVariant::Updated {
                            previous_uid: *previous_uid,
                            previous_version: previous_version.clone(),
                        }
                    }
                    _ => AddinVariant::New,
                };
                registrar.register_description(description, variant);
            }
        }
        link_cached(&mut ctx);

        let (mut ordered, working): (Vec<AddinHandle>, Vec<AddinHandle>) = ctx
            .addin_handles()
            .into_iter()
            .partition(|&h| ctx.addin(h).variant().kind() == VariantKind::Unaffected);

        let (collision_report, unresolvable) = {
            let mut env = ResolveEnv {
                introspector: self.introspector,
                config: &self.config,
                report: &mut report,
            };
            let driven = resolve_all(&mut ctx, &mut env, working)?;
            ordered.extend(driven.resolved);
            let collision_report =
                collisions.trim(&mut ctx, &mut env, &mut ordered, self.config.collision_policy);
            (collision_report, driven.unresolvable)
        };
        propagate_enablement(&mut ctx, &ordered, &mut report);

        let mut invalid = self.invalid_packs(&ctx, &report, &rejected_manifests, &unresolvable);
        invalid.sort_by(|a, b| a.manifest.cmp(&b.manifest));
        let invalid_records = retained_invalid(snapshot, input, &ctx, &ordered, &invalid);

        let snapshot = build_snapshot(&mut ctx, &ordered, invalid_records)?;
        let resolved: Vec<ResolvedAddin> = ordered
            .iter()
            .zip(&snapshot.index)
            .map(|(&handle, record)| {
                let node = ctx.addin(handle);
                ResolvedAddin {
                    id: record.id(),
                    uid: record.uid,
                    name: record.header.name.clone(),
                    version: record.header.version.clone(),
                    category: record.header.category,
                    enabled: node.enabled(),
                    variant: node.variant().kind(),
                    manifest: record.manifest.path.clone(),
                    dependencies: record.dependencies().copied().collect(),
                }
            })
            .collect();

        let summary = format!(
            "{} addins resolved, {} invalid, {} collisions",
            resolved.len(),
            invalid.len(),
            collision_report.entries.len()
        );
        tracing::info!(
            resolved = resolved.len(),
            invalid = invalid.len(),
            collisions = collision_report.entries.len(),
            "Addin resolution finished"
        );
        report.message(summary);

        Ok(ResolutionOutcome {
            ordered: resolved,
            invalid,
            collisions: collision_report,
            report,
            snapshot,
        })
    }

    fn parse(&self, pack: &FilePack) -> std::result::Result<AddinDescription, ResolutionFailure> {
        let failure = |addin, message: String| ResolutionFailure {
            addin,
            manifest: pack.manifest.clone(),
            asset: "manifest".to_string(),
            kind: FailureKind::Parse,
            message,
        };
        let description = self
            .parser
            .try_parse(pack)
            .map_err(|err| failure(None, err.to_string()))?;
        description
            .validate()
            .map_err(|reason| failure(Some(description.header.id), reason))?;
        Ok(description)
    }

    /// One invalid pack per failed addin and per unparseable manifest.
    fn invalid_packs(
        &self,
        ctx: &ResolutionContext,
        report: &ResolutionReport,
        rejected_manifests: &[PathBuf],
        unresolvable: &[AddinHandle],
    ) -> Vec<InvalidPack> {
        let mut packs = Vec::new();
        for manifest in rejected_manifests {
            packs.push(InvalidPack {
                manifest: manifest.clone(),
                addin: report
                    .failures
                    .iter()
                    .find(|f| f.manifest == *manifest)
                    .and_then(|f| f.addin),
                failures: report
                    .failures
                    .iter()
                    .filter(|f| f.manifest == *manifest)
                    .cloned()
                    .collect(),
            });
        }

        for handle in ctx.addin_handles() {
            let node = ctx.addin(handle);
            if !node.status().is_failed() {
                continue;
            }
            if unresolvable.contains(&handle) && !self.config.report_unresolvable {
                continue;
            }
            let id = node.header().id;
            let manifest = node.manifest().path.clone();
            packs.push(InvalidPack {
                failures: report
                    .failures
                    .iter()
                    .filter(|f| f.addin == Some(id) && f.manifest == manifest)
                    .cloned()
                    .collect(),
                manifest,
                addin: Some(id),
            });
        }
        packs
    }
}

/// Quarantine records to persist: this run's invalid packs plus earlier
/// ones that were neither retried nor resolved since.
fn retained_invalid(
    previous: &StoreSnapshot,
    input: &ResolutionInput,
    ctx: &ResolutionContext,
    ordered: &[AddinHandle],
    invalid: &[InvalidPack],
) -> Vec<InvalidAddinRecord> {
    let retried: BTreeSet<&PathBuf> = input.candidates.iter().map(|p| &p.manifest).collect();
    let resolved: BTreeSet<AddinId> = ordered.iter().map(|&h| ctx.addin(h).header().id).collect();

    let mut records: Vec<InvalidAddinRecord> = previous
        .invalid
        .iter()
        .filter(|r| !retried.contains(&r.manifest))
        .filter(|r| r.addin.is_none_or(|id| !resolved.contains(&id)))
        .cloned()
        .collect();
    for pack in invalid {
        let record = pack.to_record();
        if let Some(existing) = records.iter_mut().find(|r| r.manifest == record.manifest) {
            *existing = record;
        } else {
            records.push(record);
        }
    }
    records
}

fn persist(store: &mut dyn AddinStore, snapshot: &StoreSnapshot) -> Result<()> {
    store.start_transaction()?;
    if let Err(err) = store.write(snapshot) {
        tracing::warn!(error = %err, "Writing resolution failed, rolling back");
        if let Err(rollback) = store.rollback() {
            tracing::warn!(error = %rollback, "Rollback failed");
        }
        return Err(err.into());
    }
    // A failed commit has already restored the store and closed the transaction.
    if let Err(err) = store.commit() {
        tracing::warn!(error = %err, "Committing resolution failed");
        return Err(err.into());
    }
    tracing::debug!(addins = snapshot.index.len(), "Resolution persisted");
    Ok(())
}
