//! [`Fixture`]: parser and introspector wired together.

use addin_core::config::ResolverConfig;
use addin_core::error::Result;
use addin_core::model::{AddinDescription, AddinId, TypeMetadata};
use addin_core::ports::{FilePack, ResolutionInput};
use addin_core::record::StoreSnapshot;
use addin_core::resolver::{ResolutionOutcome, Resolver};

use crate::builder::{AddinBuilder, assembly_path};
use crate::introspector::FakeIntrospector;
use crate::parser::FakeParser;

/// One in-memory world of addins a test resolves against.
///
/// # Example
///
/// ```rust
/// use addin_core::model::TypeMetadata;
/// use addin_core::StoreSnapshot;
/// use addin_test_utils::{AddinBuilder, Fixture};
///
/// let mut world = Fixture::new();
/// let host = world.add(
///     AddinBuilder::new("host")
///         .assembly("Host")
///         .extension_point("menu", "Host.Menu"),
/// );
/// world.define("host", "Host", TypeMetadata::extension_point("Host.Menu", "Host.IItem"));
///
/// let outcome = world.resolve(&world.input(&[host]), &StoreSnapshot::default()).unwrap();
/// assert_eq!(outcome.ordered.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct Fixture {
    pub parser: FakeParser,
    pub introspector: FakeIntrospector,
    pub config: ResolverConfig,
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Serve the built addin from the parser and return its pack.
    pub fn add(&mut self, addin: AddinBuilder) -> FilePack {
        let pack = addin.pack();
        self.parser.add(addin.build());
        pack
    }

    pub fn add_description(&mut self, description: AddinDescription) -> FilePack {
        let pack = FilePack::new(&description.manifest.path);
        self.parser.add(description);
        pack
    }

    /// Define `metadata` in assembly `assembly` of the addin named `addin`.
    pub fn define(&mut self, addin: &str, assembly: &str, metadata: TypeMetadata) {
        self.introspector
            .add_type(assembly_path(addin, assembly), metadata);
    }

    /// Input made of `packs`, in order.
    pub fn input(&self, packs: &[FilePack]) -> ResolutionInput {
        ResolutionInput::new(packs.to_vec())
    }

    pub fn removal(&self, removed: &[AddinId]) -> ResolutionInput {
        ResolutionInput::default().with_removed(removed.to_vec())
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.parser, &self.introspector).with_config(self.config.clone())
    }

    pub fn resolve(
        &self,
        input: &ResolutionInput,
        snapshot: &StoreSnapshot,
    ) -> Result<ResolutionOutcome> {
        self.resolver().resolve(input, snapshot)
    }
}
