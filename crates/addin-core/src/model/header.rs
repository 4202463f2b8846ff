//! Addin header: identity, version and category

use std::fmt;
use std::path::PathBuf;

use semver::Version;
use serde::{Deserialize, Serialize};

use super::ids::AddinId;

/// How privileged an addin is.
///
/// Ordered from most to least privileged. A dependency is only allowed on
/// an addin of the same or a more privileged category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddinCategory {
    /// Shipped with the host; cannot be disabled or uninstalled.
    Root,
    /// Shipped with the application; can be disabled but not uninstalled.
    App,
    /// Installed by the user; can be disabled and uninstalled.
    User,
}

impl AddinCategory {
    pub fn can_disable(self) -> bool {
        self != Self::Root
    }

    pub fn can_uninstall(self) -> bool {
        self == Self::User
    }

    /// Whether an addin of this category may depend on one of `other`.
    pub fn may_depend_on(self, other: AddinCategory) -> bool {
        other <= self
    }
}

impl fmt::Display for AddinCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Root => "root",
            Self::App => "app",
            Self::User => "user",
        };
        f.write_str(s)
    }
}

/// Identity and version information of one addin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddinHeader {
    pub id: AddinId,
    pub name: String,
    pub version: Version,
    /// Oldest version this release is backward compatible with.
    pub compatible_version: Version,
    pub category: AddinCategory,
    /// Declared enablement. The effective state is computed after resolution.
    pub enabled: bool,
    #[serde(default)]
    pub description: Option<String>,
}

impl AddinHeader {
    pub fn new(id: AddinId, name: impl Into<String>, version: Version) -> Self {
        Self {
            id,
            name: name.into(),
            compatible_version: version.clone(),
            version,
            category: AddinCategory::User,
            enabled: true,
            description: None,
        }
    }

    /// Check the header for internal consistency.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("addin name is empty".to_string());
        }
        if self.compatible_version > self.version {
            return Err(format!(
                "compatible version {} is newer than version {}",
                self.compatible_version, self.version
            ));
        }
        Ok(())
    }

    /// Whether this release can stand in for a previously installed `version`.
    pub fn is_compatible_with(&self, version: &Version) -> bool {
        &self.compatible_version <= version && version <= &self.version
    }

    /// Short human-readable label used in reports and logs.
    pub fn label(&self) -> String {
        format!("{} {} ({})", self.name, self.version, self.id)
    }
}

/// Reference to the manifest an addin was parsed from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManifestFile {
    pub path: PathBuf,
    /// Opaque change marker supplied by the file-scan port (a hash or mtime).
    #[serde(default)]
    pub fingerprint: Option<String>,
}

impl ManifestFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fingerprint: None,
        }
    }
}
