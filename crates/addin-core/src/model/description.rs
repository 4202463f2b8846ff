//! Parsed addin declarations produced by a manifest parser port
//!
//! These types describe what an addin *declares*. Nothing here is checked
//! against other addins; that happens during resolution.
//!
//! Paths are built by joining identifiers with `/`:
//!
//! ```text
//! extension point   ep1
//! builder           ep1/menu
//! nested builder    ep1/menu/item
//! extension         ep1/file
//! child extension   ep1/file/open
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::header::{AddinHeader, ManifestFile};
use super::metadata::AssemblyFile;

/// Separator between identifiers in point, builder and extension paths.
pub const PATH_SEPARATOR: char = '/';

/// Join a parent path and a local identifier.
pub fn join_path(parent: &str, id: &str) -> String {
    format!("{parent}{PATH_SEPARATOR}{id}")
}

/// Id of the extension point a path is rooted at.
pub fn root_point_id(path: &str) -> &str {
    path.split(PATH_SEPARATOR).next().unwrap_or(path)
}

/// Everything one addin declares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddinDescription {
    pub header: AddinHeader,
    pub manifest: ManifestFile,
    #[serde(default)]
    pub assemblies: Vec<AssemblyFile>,
    /// Extension points this addin owns, with the builders it declares
    /// under them.
    #[serde(default)]
    pub extension_points: Vec<ExtensionPointDescription>,
    /// Builders contributed under points or builders owned elsewhere.
    #[serde(default)]
    pub extension_builder_groups: Vec<ExtensionBuilderGroup>,
    /// Extensions contributed under points or extensions owned elsewhere.
    #[serde(default)]
    pub extension_groups: Vec<ExtensionGroup>,
}

impl AddinDescription {
    /// Check identifiers and the header for internal consistency.
    pub fn validate(&self) -> Result<(), String> {
        self.header.validate()?;
        for point in &self.extension_points {
            check_identifier("extension point", &point.id)?;
            for builder in &point.builders {
                builder.validate()?;
            }
        }
        for group in &self.extension_builder_groups {
            check_path("extension builder group", &group.parent_path)?;
            for builder in &group.builders {
                builder.validate()?;
            }
        }
        for group in &self.extension_groups {
            check_path("extension group", &group.parent_path)?;
            for extension in &group.extensions {
                extension.validate()?;
            }
        }
        Ok(())
    }
}

/// An extension point owned by the declaring addin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionPointDescription {
    pub id: String,
    pub type_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub builders: Vec<ExtensionBuilderDescription>,
}

/// How a builder obtains its implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuilderKind {
    /// Defines a concrete implementation type.
    Declared { type_name: String },
    /// Reuses a builder with the same id declared by an ancestor.
    Referenced,
}

/// A builder declaration, possibly with nested builders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionBuilderDescription {
    pub id: String,
    #[serde(flatten)]
    pub kind: BuilderKind,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub children: Vec<ExtensionBuilderDescription>,
}

impl ExtensionBuilderDescription {
    pub fn declared(id: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: BuilderKind::Declared {
                type_name: type_name.into(),
            },
            description: None,
            children: Vec::new(),
        }
    }

    pub fn referenced(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: BuilderKind::Referenced,
            description: None,
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: ExtensionBuilderDescription) -> Self {
        self.children.push(child);
        self
    }

    fn validate(&self) -> Result<(), String> {
        check_identifier("extension builder", &self.id)?;
        self.children.iter().try_for_each(|c| c.validate())
    }
}

/// Builders contributed under one parent (a point or builder path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionBuilderGroup {
    pub parent_path: String,
    pub builders: Vec<ExtensionBuilderDescription>,
}

/// Where an extension is ordered relative to its sibling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelativePosition {
    Before,
    After,
}

/// Ordering hint naming another extension under the same parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiblingRef {
    pub id: String,
    pub position: RelativePosition,
}

/// An extension declaration, possibly with child extensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionDescription {
    pub id: String,
    /// Full path of the builder that constructs this extension.
    pub builder_path: String,
    #[serde(default)]
    pub sibling: Option<SiblingRef>,
    /// Raw key/value data assigned to the builder's settable properties.
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    #[serde(default)]
    pub children: Vec<ExtensionDescription>,
}

impl ExtensionDescription {
    pub fn new(id: impl Into<String>, builder_path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            builder_path: builder_path.into(),
            sibling: None,
            data: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_sibling(mut self, id: impl Into<String>, position: RelativePosition) -> Self {
        self.sibling = Some(SiblingRef {
            id: id.into(),
            position,
        });
        self
    }

    pub fn with_child(mut self, child: ExtensionDescription) -> Self {
        self.children.push(child);
        self
    }

    fn validate(&self) -> Result<(), String> {
        check_identifier("extension", &self.id)?;
        check_path("extension builder reference", &self.builder_path)?;
        self.children.iter().try_for_each(|c| c.validate())
    }
}

/// Extensions contributed under one parent (a point or extension path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionGroup {
    pub parent_path: String,
    pub extensions: Vec<ExtensionDescription>,
}

fn check_identifier(what: &str, id: &str) -> Result<(), String> {
    if id.trim().is_empty() {
        return Err(format!("{what} has an empty id"));
    }
    if id.contains(PATH_SEPARATOR) {
        return Err(format!("{what} id '{id}' contains '{PATH_SEPARATOR}'"));
    }
    Ok(())
}

fn check_path(what: &str, path: &str) -> Result<(), String> {
    if path.split(PATH_SEPARATOR).any(|segment| segment.trim().is_empty()) {
        return Err(format!("{what} path '{path}' has an empty segment"));
    }
    Ok(())
}
