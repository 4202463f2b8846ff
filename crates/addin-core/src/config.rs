//! Resolver configuration
//!
//! Loaded from a TOML table such as:
//!
//! ```toml
//! collision_policy = "keep_first"
//! report_unresolvable = true
//! enforce_category_rules = true
//! max_rounds = 10000
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How a collision is settled when no competitor is already persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Quarantine every competitor.
    #[default]
    RejectAll,
    /// Keep the first competitor in registration order.
    KeepFirst,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub collision_policy: CollisionPolicy,
    /// Quarantine addins the fixed-point loop could not settle, with an
    /// `Unresolvable` failure. When false they are only logged.
    pub report_unresolvable: bool,
    /// Reject dependencies on less privileged addin categories.
    pub enforce_category_rules: bool,
    /// Upper bound on resolve attempts in the fixed-point loop.
    pub max_rounds: Option<usize>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            collision_policy: CollisionPolicy::RejectAll,
            report_unresolvable: true,
            enforce_category_rules: true,
            max_rounds: None,
        }
    }
}

impl ResolverConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_toml(&content)
    }

    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = ResolverConfig::from_toml("").unwrap();
        assert_eq!(config, ResolverConfig::default());
        assert_eq!(config.collision_policy, CollisionPolicy::RejectAll);
        assert!(config.report_unresolvable);
    }

    #[test]
    fn parses_all_keys() {
        let config = ResolverConfig::from_toml(
            r#"
collision_policy = "keep_first"
report_unresolvable = false
enforce_category_rules = false
max_rounds = 50
"#,
        )
        .unwrap();
        assert_eq!(config.collision_policy, CollisionPolicy::KeepFirst);
        assert!(!config.report_unresolvable);
        assert!(!config.enforce_category_rules);
        assert_eq!(config.max_rounds, Some(50));
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let err = ResolverConfig::from_toml(r#"collision_policy = "coin_flip""#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resolver.toml");
        fs::write(&path, "report_unresolvable = false\n").unwrap();

        let config = ResolverConfig::load(&path).unwrap();
        assert!(!config.report_unresolvable);
    }

    #[test]
    fn load_missing_file_reports_path() {
        let err = ResolverConfig::load(Path::new("/nonexistent/resolver.toml")).unwrap_err();
        assert!(err.to_string().contains("resolver.toml"));
    }
}
