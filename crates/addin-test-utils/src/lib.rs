//! Shared test utilities for the Addin Manager workspace.
//!
//! In-memory stand-ins for the engine's ports plus a fluent builder for
//! addin declarations. It is a dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`builder`]: [`AddinBuilder`] for addin descriptions
//! - [`introspector`]: [`FakeIntrospector`], type metadata keyed by assembly path
//! - [`parser`]: [`FakeParser`], descriptions keyed by manifest path
//! - [`scanner`]: [`FakeScanner`], a canned file-scan result
//! - [`store`]: [`FailingStore`], a store wrapper that fails on demand
//! - [`fixture`]: [`Fixture`], parser and introspector wired together

pub mod builder;
pub mod fixture;
pub mod introspector;
pub mod parser;
pub mod scanner;
pub mod store;

pub use builder::{AddinBuilder, assembly_path};
pub use fixture::Fixture;
pub use introspector::FakeIntrospector;
pub use parser::FakeParser;
pub use scanner::FakeScanner;
pub use store::{FailingStore, FailurePoint};
