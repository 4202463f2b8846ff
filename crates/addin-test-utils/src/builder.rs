//! [`AddinBuilder`] for addin descriptions.
//!
//! Descriptions are what the manifest parser port hands the engine. The
//! builder fills in everything a test does not care about: the addin id is
//! derived from its name, the version defaults to `1.0.0` and the manifest
//! lives at `<name>/addin.toml`.

use std::path::PathBuf;

use addin_core::model::{
    AddinCategory, AddinDescription, AddinHeader, AddinId, AssemblyFile, AssemblyIdentity,
    ExtensionBuilderDescription, ExtensionBuilderGroup, ExtensionDescription, ExtensionGroup,
    ExtensionPointDescription, ManifestFile,
};
use addin_core::ports::FilePack;
use semver::Version;

/// Path of `assembly` as shipped by the addin called `addin`.
///
/// Matches the path [`AddinBuilder::assembly`] declares, so introspector
/// fixtures can be keyed the same way.
pub fn assembly_path(addin: &str, assembly: &str) -> PathBuf {
    PathBuf::from(format!("{addin}/{assembly}.dll"))
}

/// Fluent builder for an [`AddinDescription`].
///
/// # Example
///
/// ```rust
/// use addin_test_utils::AddinBuilder;
///
/// let host = AddinBuilder::new("host")
///     .assembly("Host")
///     .extension_point("menu", "Host.MenuPoint")
///     .builder("menu", "item", "Host.MenuItemBuilder")
///     .build();
/// assert_eq!(host.extension_points[0].builders.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct AddinBuilder {
    name: String,
    description: AddinDescription,
}

impl AddinBuilder {
    pub fn new(name: &str) -> Self {
        let header = AddinHeader::new(AddinId::from_name(name), name, Version::new(1, 0, 0));
        Self {
            name: name.to_string(),
            description: AddinDescription {
                header,
                manifest: ManifestFile::new(format!("{name}/addin.toml")),
                assemblies: Vec::new(),
                extension_points: Vec::new(),
                extension_builder_groups: Vec::new(),
                extension_groups: Vec::new(),
            },
        }
    }

    /// The id every description built from this builder carries.
    pub fn id(&self) -> AddinId {
        self.description.header.id
    }

    /// Set both the version and the compatible version.
    ///
    /// # Panics
    /// Panics if `version` is not valid semver.
    pub fn version(mut self, version: &str) -> Self {
        let version = Version::parse(version)
            .unwrap_or_else(|e| panic!("AddinBuilder::version: invalid version {version}: {e}"));
        self.description.header.compatible_version = version.clone();
        self.description.header.version = version;
        self
    }

    /// Set the oldest version this release can stand in for.
    ///
    /// # Panics
    /// Panics if `version` is not valid semver.
    pub fn compatible_with(mut self, version: &str) -> Self {
        self.description.header.compatible_version = Version::parse(version).unwrap_or_else(|e| {
            panic!("AddinBuilder::compatible_with: invalid version {version}: {e}")
        });
        self
    }

    pub fn category(mut self, category: AddinCategory) -> Self {
        self.description.header.category = category;
        self
    }

    /// Declare the addin disabled.
    pub fn disabled(mut self) -> Self {
        self.description.header.enabled = false;
        self
    }

    /// Ship the manifest from another path, e.g. a second copy of the same
    /// addin.
    pub fn manifest(mut self, path: impl Into<PathBuf>) -> Self {
        self.description.manifest = ManifestFile::new(path);
        self
    }

    pub fn fingerprint(mut self, fingerprint: &str) -> Self {
        self.description.manifest.fingerprint = Some(fingerprint.to_string());
        self
    }

    /// Ship assembly `name` version `1.0.0` at [`assembly_path`].
    pub fn assembly(self, name: &str) -> Self {
        self.assembly_version(name, "1.0.0")
    }

    /// Ship assembly `name` at the given version.
    ///
    /// # Panics
    /// Panics if `version` is not valid semver.
    pub fn assembly_version(mut self, name: &str, version: &str) -> Self {
        let version = Version::parse(version).unwrap_or_else(|e| {
            panic!("AddinBuilder::assembly_version: invalid version {version}: {e}")
        });
        let path = assembly_path(&self.name, name);
        self.description
            .assemblies
            .push(AssemblyFile::new(AssemblyIdentity::new(name, version), path));
        self
    }

    /// Declare an extension point owned by this addin.
    pub fn extension_point(mut self, id: &str, type_name: &str) -> Self {
        self.description.extension_points.push(ExtensionPointDescription {
            id: id.to_string(),
            type_name: type_name.to_string(),
            description: None,
            builders: Vec::new(),
        });
        self
    }

    /// Declare a builder under `parent_path`.
    ///
    /// A parent that is a point this addin owns gets the builder nested in
    /// its declaration; anything else becomes a builder group contributed
    /// under that path.
    pub fn builder(self, parent_path: &str, id: &str, type_name: &str) -> Self {
        self.builder_with(parent_path, ExtensionBuilderDescription::declared(id, type_name))
    }

    /// Declare a builder that reuses the nearest ancestor builder with the
    /// same id.
    pub fn referenced_builder(self, parent_path: &str, id: &str) -> Self {
        self.builder_with(parent_path, ExtensionBuilderDescription::referenced(id))
    }

    pub fn builder_with(mut self, parent_path: &str, builder: ExtensionBuilderDescription) -> Self {
        if let Some(point) = self
            .description
            .extension_points
            .iter_mut()
            .find(|p| p.id == parent_path)
        {
            point.builders.push(builder);
            return self;
        }
        let groups = &mut self.description.extension_builder_groups;
        match groups.iter_mut().find(|g| g.parent_path == parent_path) {
            Some(group) => group.builders.push(builder),
            None => groups.push(ExtensionBuilderGroup {
                parent_path: parent_path.to_string(),
                builders: vec![builder],
            }),
        }
        self
    }

    /// Contribute a plain extension under `parent_path`.
    pub fn extension(self, parent_path: &str, id: &str, builder_path: &str) -> Self {
        self.extension_with(parent_path, ExtensionDescription::new(id, builder_path))
    }

    pub fn extension_with(mut self, parent_path: &str, extension: ExtensionDescription) -> Self {
        let groups = &mut self.description.extension_groups;
        match groups.iter_mut().find(|g| g.parent_path == parent_path) {
            Some(group) => group.extensions.push(extension),
            None => groups.push(ExtensionGroup {
                parent_path: parent_path.to_string(),
                extensions: vec![extension],
            }),
        }
        self
    }

    /// The file pack a scanner would report for this addin.
    pub fn pack(&self) -> FilePack {
        let mut pack = FilePack::new(&self.description.manifest.path);
        pack.assemblies = self
            .description
            .assemblies
            .iter()
            .map(|a| a.path.clone())
            .collect();
        pack
    }

    pub fn build(self) -> AddinDescription {
        self.description
    }
}
