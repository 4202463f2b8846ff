//! End-to-end integration test for a scan, resolve and persist cycle
//!
//! These tests exercise the complete flow: config file -> scanner ->
//! resolver -> file store, across several runs against the same directory.

use addin_core::model::{ExtensionDescription, PropertyMetadata, TypeMetadata};
use addin_core::{
    AddinStore, CollisionPolicy, Error, FailureKind, FilePack, ResolverConfig, StoreSnapshot,
    VariantKind,
};
use addin_store::{FileStore, FileStoreConfig};
use addin_test_utils::{AddinBuilder, FakeScanner, Fixture};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

/// A host with point `menu` and builder `menu/item`, plus one plugin.
fn setup_world() -> (Fixture, FilePack, FilePack) {
    let mut world = Fixture::new();
    let host = world.add(
        AddinBuilder::new("host")
            .assembly("Host")
            .extension_point("menu", "Host.Menu")
            .builder("menu", "item", "Host.ItemBuilder"),
    );
    world.define("host", "Host", TypeMetadata::extension_point("Host.Menu", "Host.IItem"));
    world.define(
        "host",
        "Host",
        TypeMetadata::extension_builder("Host.ItemBuilder", "Host.IItem")
            .with_property(PropertyMetadata::required("label")),
    );
    let plugin = world.add(AddinBuilder::new("plugin").extension_with(
        "menu",
        ExtensionDescription::new("open", "menu/item").with_data("label", "Open"),
    ));
    (world, host, plugin)
}

#[test]
fn test_config_file_drives_resolver() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("resolver.toml");
    fs::write(
        &path,
        r#"
collision_policy = "keep_first"
report_unresolvable = false
"#,
    )
    .unwrap();

    let config = ResolverConfig::load(&path).unwrap();
    assert_eq!(config.collision_policy, CollisionPolicy::KeepFirst);
    assert!(!config.report_unresolvable);
    assert!(config.enforce_category_rules);

    let (world, host, _) = setup_world();
    let mut world = world.with_config(config);
    assert_eq!(world.resolver().config().collision_policy, CollisionPolicy::KeepFirst);
    let copy = world.add_description(
        AddinBuilder::new("host")
            .manifest("mirror/host/addin.toml")
            .build(),
    );
    let outcome = world
        .resolve(&world.input(&[host, copy]), &StoreSnapshot::default())
        .unwrap();
    assert_eq!(outcome.ordered.len(), 1);
    assert_eq!(outcome.ordered[0].manifest, std::path::PathBuf::from("host/addin.toml"));
}

#[test]
fn test_missing_config_file_is_an_io_error() {
    let temp = TempDir::new().unwrap();
    let result = ResolverConfig::load(&temp.path().join("absent.toml"));
    assert!(matches!(result, Err(Error::Io { .. })));
}

#[test]
fn test_scan_resolve_persist_cycle() {
    let temp = TempDir::new().unwrap();
    let (world, host, plugin) = setup_world();
    let resolver = world.resolver();
    let mut store = FileStore::in_dir(temp.path());

    // Run 1: fresh install
    let installed = resolver
        .run(&FakeScanner::new(vec![plugin, host]), &mut store)
        .unwrap();
    let names: Vec<&str> = installed.ordered.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["host", "plugin"]);
    let data_path = FileStoreConfig::new(temp.path()).data_path();
    let after_install = fs::read(&data_path).unwrap();

    // Run 2: nothing changed on disk
    let idle = resolver.run(&FakeScanner::default(), &mut store).unwrap();
    assert!(idle.ordered.iter().all(|a| a.variant == VariantKind::Unaffected));
    assert_eq!(fs::read(&data_path).unwrap(), after_install);

    // Run 3: the host is deleted
    let removed = resolver
        .run(
            &FakeScanner::default().with_removed(vec![AddinBuilder::new("host").id()]),
            &mut store,
        )
        .unwrap();
    assert!(removed.ordered.is_empty());
    let plugin = removed.invalid_pack(AddinBuilder::new("plugin").id()).unwrap();
    assert!(plugin.has_failure(FailureKind::MissingParent));

    let persisted = store.load().unwrap();
    assert!(persisted.index.is_empty());
    assert_eq!(persisted.invalid.len(), 1);
    assert_eq!(persisted.invalid[0].manifest, std::path::PathBuf::from("plugin/addin.toml"));
}

#[test]
fn test_failing_scanner_leaves_store_untouched() {
    let temp = TempDir::new().unwrap();
    let (world, _, _) = setup_world();
    let mut store = FileStore::in_dir(temp.path());

    let result = world
        .resolver()
        .run(&FakeScanner::failing("watch folder unreadable"), &mut store);

    assert!(matches!(result, Err(Error::Scan(_))));
    assert!(!store.in_transaction());
    assert!(!FileStoreConfig::new(temp.path()).data_path().exists());
}

#[test]
fn test_persisted_document_layout() {
    let temp = TempDir::new().unwrap();
    let (world, host, plugin) = setup_world();
    let mut store = FileStore::in_dir(temp.path());
    world
        .resolver()
        .run(&FakeScanner::new(vec![host, plugin]), &mut store)
        .unwrap();

    let content = fs::read_to_string(FileStoreConfig::new(temp.path()).data_path()).unwrap();
    let document: serde_json::Value = serde_json::from_str(&content).unwrap();

    assert_eq!(document["uids"]["addin"], 2);
    assert_eq!(document["index"].as_array().unwrap().len(), 2);
    assert_eq!(document["bodies"].as_array().unwrap().len(), 2);
    assert_eq!(document["index"][0]["header"]["name"], "host");
    let builder_uid = &document["bodies"][0]["extension_builders"][0]["uid"];
    assert_eq!(&document["bodies"][1]["extensions"][0]["builder"], builder_uid);
    assert!(content.ends_with('\n'));
}
