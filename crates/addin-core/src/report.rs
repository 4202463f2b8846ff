//! Structured outcome of a resolution run

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::model::AddinId;

/// Why an asset or addin was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The manifest could not be parsed or declares invalid identifiers.
    Parse,
    /// A declared type was not found anywhere.
    MissingType,
    /// A type does not satisfy the rules for its role.
    RuleViolation,
    /// An extension lacks a value for a required property.
    MissingData,
    /// An assembly reference no registered addin can satisfy.
    MissingReference,
    /// The parent point, builder or extension does not exist.
    MissingParent,
    /// The builder an extension or referenced builder needs does not exist.
    MissingBuilder,
    /// The ordering sibling of an extension does not exist.
    MissingSibling,
    /// An extension's builder is not a child of its parent's builder.
    BuilderMismatch,
    /// Something this asset depends on failed.
    DependencyFailed,
    /// The addin depends on a less privileged addin category.
    CategoryViolation,
    /// The addin lost a collision on an identity or path.
    Collision,
    /// The fixed-point loop never settled the addin.
    Unresolvable,
    /// Metadata of an assembly could not be read.
    Introspection,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Parse => "parse",
            Self::MissingType => "missing type",
            Self::RuleViolation => "rule violation",
            Self::MissingData => "missing data",
            Self::MissingReference => "missing reference",
            Self::MissingParent => "missing parent",
            Self::MissingBuilder => "missing builder",
            Self::MissingSibling => "missing sibling",
            Self::BuilderMismatch => "builder mismatch",
            Self::DependencyFailed => "dependency failed",
            Self::CategoryViolation => "category violation",
            Self::Collision => "collision",
            Self::Unresolvable => "unresolvable",
            Self::Introspection => "introspection",
        };
        f.write_str(s)
    }
}

/// One terminal failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionFailure {
    /// Owning addin, if the pack got far enough to declare one.
    pub addin: Option<AddinId>,
    pub manifest: PathBuf,
    /// The failing asset, e.g. `extension point 'ep1'`.
    pub asset: String,
    pub kind: FailureKind,
    pub message: String,
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {}: {}",
            self.asset,
            self.manifest.display(),
            self.kind,
            self.message
        )
    }
}

/// Messages and failures collected during a run, surfaced to the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionReport {
    pub messages: Vec<String>,
    pub failures: Vec<ResolutionFailure>,
}

impl ResolutionReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn fail(&mut self, failure: ResolutionFailure) {
        tracing::debug!(
            asset = %failure.asset,
            kind = %failure.kind,
            "{}",
            failure.message
        );
        self.failures.push(failure);
    }

    /// True when nothing failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures_for(&self, addin: AddinId) -> Vec<&ResolutionFailure> {
        self.failures
            .iter()
            .filter(|f| f.addin == Some(addin))
            .collect()
    }

    pub fn has_failure(&self, addin: AddinId, kind: FailureKind) -> bool {
        self.failures
            .iter()
            .any(|f| f.addin == Some(addin) && f.kind == kind)
    }
}
