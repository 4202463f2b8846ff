//! Persisted addin records
//!
//! A [`StoreSnapshot`] is everything a store holds between runs: the index
//! records used to reclassify persisted addins, the body records holding
//! their assets, the quarantined packs and the last allocated UIDs.
//!
//! Records reference each other compactly: extensions name their builder by
//! [`Uid`], and type signatures name their assembly by [`Uid`]. A resolved
//! type signature is cached in the record so that unaffected addins can be
//! linked against without introspecting their assemblies again.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::model::{
    AddinHeader, AddinId, AssemblyFile, AssemblyIdentity, ManifestFile, PropertyMetadata,
    SiblingRef, Uid, join_path,
};

/// Last UID handed out for each kind of persisted asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UidSeed {
    pub addin: u32,
    pub assembly: u32,
    pub extension_point: u32,
    pub extension_builder: u32,
}

/// Dependency index entry for one persisted addin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddinIndexRecord {
    pub uid: Uid,
    pub header: AddinHeader,
    pub manifest: ManifestFile,
    /// Effective enablement computed by the run that wrote this record.
    pub enabled: bool,
    /// Addins this addin attaches builders or extensions to.
    #[serde(default)]
    pub extended_addins: Vec<AddinId>,
    /// Addins providing assemblies this addin references.
    #[serde(default)]
    pub referenced_addins: Vec<AddinId>,
    /// Assembly identities this addin requires from other addins.
    #[serde(default)]
    pub referenced_assemblies: Vec<AssemblyIdentity>,
    /// Ids of the extension points this addin extends.
    #[serde(default)]
    pub extended_extension_points: Vec<String>,
}

impl AddinIndexRecord {
    pub fn id(&self) -> AddinId {
        self.header.id
    }

    /// Every addin this one depends on directly.
    pub fn dependencies(&self) -> impl Iterator<Item = &AddinId> {
        self.extended_addins.iter().chain(&self.referenced_addins)
    }
}

/// A persisted assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyRecord {
    pub uid: Uid,
    #[serde(flatten)]
    pub file: AssemblyFile,
}

/// A resolved implementation type, cached in persisted records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSignature {
    pub type_name: String,
    /// Assembly defining the type, `None` when the host provides it.
    #[serde(default)]
    pub assembly: Option<Uid>,
    pub extension_type: String,
    #[serde(default)]
    pub settable_properties: Vec<PropertyMetadata>,
    /// Whether the type accepts child builders.
    #[serde(default)]
    pub composite: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionPointRecord {
    pub uid: Uid,
    pub id: String,
    pub signature: TypeSignature,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuilderRecordKind {
    Declared { signature: TypeSignature },
    Referenced { target: Uid },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionBuilderRecord {
    pub uid: Uid,
    pub id: String,
    pub parent_path: String,
    #[serde(flatten)]
    pub kind: BuilderRecordKind,
    #[serde(default)]
    pub description: Option<String>,
}

impl ExtensionBuilderRecord {
    pub fn path(&self) -> String {
        join_path(&self.parent_path, &self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionRecord {
    pub id: String,
    pub parent_path: String,
    pub builder: Uid,
    #[serde(default)]
    pub sibling: Option<SiblingRef>,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl ExtensionRecord {
    pub fn path(&self) -> String {
        join_path(&self.parent_path, &self.id)
    }
}

/// Assets of one persisted addin. Builders and extensions are listed
/// parents first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddinBodyRecord {
    pub addin: AddinId,
    #[serde(default)]
    pub assemblies: Vec<AssemblyRecord>,
    #[serde(default)]
    pub extension_points: Vec<ExtensionPointRecord>,
    #[serde(default)]
    pub extension_builders: Vec<ExtensionBuilderRecord>,
    #[serde(default)]
    pub extensions: Vec<ExtensionRecord>,
}

/// A pack that failed to resolve, kept so it can be retried once its files
/// change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidAddinRecord {
    pub manifest: PathBuf,
    #[serde(default)]
    pub addin: Option<AddinId>,
    pub reasons: Vec<String>,
}

/// Everything persisted between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub uids: UidSeed,
    #[serde(default)]
    pub index: Vec<AddinIndexRecord>,
    #[serde(default)]
    pub bodies: Vec<AddinBodyRecord>,
    #[serde(default)]
    pub invalid: Vec<InvalidAddinRecord>,
}

impl StoreSnapshot {
    pub fn is_empty(&self) -> bool {
        self.index.is_empty() && self.invalid.is_empty()
    }

    pub fn index_of(&self, id: AddinId) -> Option<&AddinIndexRecord> {
        self.index.iter().find(|r| r.id() == id)
    }

    pub fn body_of(&self, id: AddinId) -> Option<&AddinBodyRecord> {
        self.bodies.iter().find(|b| b.addin == id)
    }

    /// Persisted addins paired with their bodies, in index order.
    ///
    /// An index record without a body pairs with an empty body.
    pub fn addins(&self) -> Vec<(&AddinIndexRecord, AddinBodyRecord)> {
        let bodies: BTreeMap<AddinId, &AddinBodyRecord> =
            self.bodies.iter().map(|b| (b.addin, b)).collect();
        self.index
            .iter()
            .map(|record| {
                let body = bodies.get(&record.id()).map(|b| (*b).clone()).unwrap_or_else(|| {
                    AddinBodyRecord {
                        addin: record.id(),
                        assemblies: Vec::new(),
                        extension_points: Vec::new(),
                        extension_builders: Vec::new(),
                        extensions: Vec::new(),
                    }
                });
                (record, body)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RelativePosition;
    use pretty_assertions::assert_eq;

    #[test]
    fn builder_record_serializes_kind_inline() {
        let record = ExtensionBuilderRecord {
            uid: Uid::new(3),
            id: "menu".to_string(),
            parent_path: "ep1".to_string(),
            kind: BuilderRecordKind::Referenced { target: Uid::new(2) },
            description: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "referenced");
        assert_eq!(json["target"], 2);
        assert_eq!(record.path(), "ep1/menu");
    }

    #[test]
    fn extension_record_path() {
        let record = ExtensionRecord {
            id: "open".to_string(),
            parent_path: "ep1/file".to_string(),
            builder: Uid::new(1),
            sibling: Some(SiblingRef {
                id: "new".to_string(),
                position: RelativePosition::After,
            }),
            data: BTreeMap::new(),
        };
        assert_eq!(record.path(), "ep1/file/open");
    }

    #[test]
    fn empty_snapshot_deserializes_from_empty_object() {
        let snapshot: StoreSnapshot = serde_json::from_str("{}").unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.uids, UidSeed::default());
    }
}
