//! [`FakeParser`]: descriptions keyed by manifest path.
//!
//! Realism level: **FAKE**. Manifests are never read; the description
//! handed in is returned as-is (validation is the engine's job).

use std::collections::HashMap;
use std::path::PathBuf;

use addin_core::error::ParseError;
use addin_core::model::AddinDescription;
use addin_core::ports::{FilePack, ManifestParser};

/// In-memory [`ManifestParser`].
#[derive(Debug, Default, Clone)]
pub struct FakeParser {
    descriptions: HashMap<PathBuf, AddinDescription>,
    malformed: HashMap<PathBuf, String>,
}

impl FakeParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `description` for its own manifest path.
    pub fn with(mut self, description: AddinDescription) -> Self {
        self.add(description);
        self
    }

    /// Serve `description` for its own manifest path, replacing whatever
    /// was served there before.
    pub fn add(&mut self, description: AddinDescription) {
        let path = description.manifest.path.clone();
        self.malformed.remove(&path);
        self.descriptions.insert(path, description);
    }

    /// Fail to parse the manifest at `path`.
    pub fn with_malformed(mut self, path: impl Into<PathBuf>, reason: &str) -> Self {
        self.add_malformed(path, reason);
        self
    }

    pub fn add_malformed(&mut self, path: impl Into<PathBuf>, reason: &str) {
        let path = path.into();
        self.descriptions.remove(&path);
        self.malformed.insert(path, reason.to_string());
    }
}

impl ManifestParser for FakeParser {
    fn try_parse(&self, pack: &FilePack) -> Result<AddinDescription, ParseError> {
        if let Some(reason) = self.malformed.get(&pack.manifest) {
            return Err(ParseError::Malformed {
                manifest: pack.manifest.clone(),
                reason: reason.clone(),
            });
        }
        self.descriptions
            .get(&pack.manifest)
            .cloned()
            .ok_or_else(|| ParseError::Malformed {
                manifest: pack.manifest.clone(),
                reason: "file not found".to_string(),
            })
    }
}
