//! Addin identities and persisted UIDs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Globally unique identity of an addin.
///
/// Two packs declaring the same `AddinId` are either two versions of the
/// same addin (an update) or a collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddinId(Uuid);

impl AddinId {
    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Generate a fresh random identity.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Derive a stable identity from a name.
    ///
    /// The same name always yields the same identity, which keeps fixtures
    /// and generated manifests reproducible.
    pub fn from_name(name: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for AddinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for AddinId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Small integer identity assigned the first time an asset is persisted.
///
/// Persisted records reference each other by `Uid` instead of by GUID or
/// path. Zero is never allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(u32);

impl Uid {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_is_stable() {
        assert_eq!(AddinId::from_name("core"), AddinId::from_name("core"));
        assert_ne!(AddinId::from_name("core"), AddinId::from_name("ui"));
    }

    #[test]
    fn addin_id_round_trips_through_display() {
        let id = AddinId::random();
        let parsed: AddinId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn uid_serializes_as_plain_number() {
        let json = serde_json::to_string(&Uid::new(7)).unwrap();
        assert_eq!(json, "7");
    }
}
