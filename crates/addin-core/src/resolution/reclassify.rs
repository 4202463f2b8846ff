//! Classification of persisted addins against the changes of a run

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::model::AddinId;
use crate::record::StoreSnapshot;

/// What happens to a persisted addin in this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersistedClass {
    /// Replaced by a new version or removed; not registered at all.
    Superseded,
    DirectlyAffected,
    IndirectlyAffected,
    Unaffected,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reclassification {
    classes: BTreeMap<AddinId, PersistedClass>,
    /// Candidate positions that are new versions of a persisted addin.
    updates: BTreeSet<usize>,
}

impl Reclassification {
    pub fn class_of(&self, id: AddinId) -> Option<PersistedClass> {
        self.classes.get(&id).copied()
    }

    /// Whether the candidate at `position` updates a persisted addin.
    pub fn is_update(&self, position: usize) -> bool {
        self.updates.contains(&position)
    }

    pub fn superseded(&self) -> impl Iterator<Item = AddinId> + '_ {
        self.with_class(PersistedClass::Superseded)
    }

    pub fn with_class(&self, class: PersistedClass) -> impl Iterator<Item = AddinId> + '_ {
        self.classes
            .iter()
            .filter(move |(_, c)| **c == class)
            .map(|(id, _)| *id)
    }
}

/// Classify every persisted addin.
///
/// `candidates` are the ids of this run's parsed candidates, in input
/// order. Only the first candidate with a persisted id counts as its
/// update; later ones are plain new addins and will collide.
pub fn reclassify(
    snapshot: &StoreSnapshot,
    candidates: &[AddinId],
    removed: &[AddinId],
) -> Reclassification {
    let persisted: BTreeSet<AddinId> = snapshot.index.iter().map(|r| r.id()).collect();
    let mut changed = BTreeSet::new();
    let mut updates = BTreeSet::new();

    for (position, id) in candidates.iter().enumerate() {
        if persisted.contains(id) && changed.insert(*id) {
            updates.insert(position);
        }
    }
    for id in removed {
        if persisted.contains(id) {
            changed.insert(*id);
        } else {
            tracing::debug!(addin = %id, "Ignoring removal of an addin that was never persisted");
        }
    }

    let mut classes: BTreeMap<AddinId, PersistedClass> = changed
        .iter()
        .map(|id| (*id, PersistedClass::Superseded))
        .collect();

    let mut dependents: BTreeMap<AddinId, Vec<AddinId>> = BTreeMap::new();
    for record in &snapshot.index {
        for dep in record.dependencies() {
            dependents.entry(*dep).or_default().push(record.id());
        }
    }

    let mut queue = VecDeque::new();
    for record in &snapshot.index {
        let id = record.id();
        if !classes.contains_key(&id) && record.dependencies().any(|d| changed.contains(d)) {
            classes.insert(id, PersistedClass::DirectlyAffected);
            queue.push_back(id);
        }
    }
    while let Some(id) = queue.pop_front() {
        for &dependent in dependents.get(&id).into_iter().flatten() {
            if !classes.contains_key(&dependent) {
                classes.insert(dependent, PersistedClass::IndirectlyAffected);
                queue.push_back(dependent);
            }
        }
    }

    for id in persisted {
        classes.entry(id).or_insert(PersistedClass::Unaffected);
    }

    Reclassification { classes, updates }
}
