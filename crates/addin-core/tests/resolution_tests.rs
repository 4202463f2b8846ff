//! Tests for resolving a fresh batch of addins

use addin_core::model::{
    AddinCategory, ExtensionBuilderDescription, ExtensionDescription, PropertyMetadata,
    RelativePosition, TypeMetadata,
};
use addin_core::{AssemblyIdentity, Error, FailureKind, ResolverConfig, StoreSnapshot};
use addin_test_utils::{AddinBuilder, Fixture, assembly_path};
use pretty_assertions::assert_eq;
use rstest::rstest;
use semver::Version;

/// A host addin with point `menu` accepting `Host.IItem` extensions built
/// by `menu/item`, which requires a `label`.
fn with_host(world: &mut Fixture) -> addin_core::ports::FilePack {
    let pack = world.add(
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
            .with_property(PropertyMetadata::required("label"))
            .with_property(PropertyMetadata::optional("icon")),
    );
    pack
}

fn labelled(id: &str) -> ExtensionDescription {
    ExtensionDescription::new(id, "menu/item").with_data("label", id)
}

fn names(outcome: &addin_core::ResolutionOutcome) -> Vec<&str> {
    outcome.ordered.iter().map(|a| a.name.as_str()).collect()
}

#[test]
fn test_point_owner_resolves_before_extender() {
    let mut world = Fixture::new();
    let p = world.add(AddinBuilder::new("P").assembly("P").extension_point("ep1", "P.Point"));
    world.define("P", "P", TypeMetadata::extension_point("P.Point", "P.IExtension"));
    let c = world.add(
        AddinBuilder::new("C")
            .assembly("C")
            .builder("ep1", "widget", "C.WidgetBuilder")
            .extension("ep1", "w1", "ep1/widget"),
    );
    world.define("C", "C", TypeMetadata::extension_builder("C.WidgetBuilder", "P.IExtension"));

    let outcome = world.resolve(&world.input(&[c, p]), &StoreSnapshot::default()).unwrap();

    assert_eq!(names(&outcome), vec!["P", "C"]);
    assert!(outcome.invalid.is_empty());
    let c = outcome.ordered[1].clone();
    assert_eq!(c.dependencies, vec![outcome.ordered[0].id]);
}

#[test]
fn test_extension_with_data_resolves() {
    let mut world = Fixture::new();
    let host = with_host(&mut world);
    let plugin = world.add(AddinBuilder::new("plugin").extension_with("menu", labelled("open")));

    let outcome = world.resolve(&world.input(&[plugin, host]), &StoreSnapshot::default()).unwrap();

    assert_eq!(names(&outcome), vec!["host", "plugin"]);
    assert!(outcome.report.failures.is_empty());
    let body = &outcome.snapshot.bodies[1];
    assert_eq!(body.extensions.len(), 1);
    assert_eq!(body.extensions[0].path(), "menu/open");
    let builder_uid = outcome.snapshot.bodies[0].extension_builders[0].uid;
    assert_eq!(body.extensions[0].builder, builder_uid);
}

#[test]
fn test_missing_required_data_fails_extension() {
    let mut world = Fixture::new();
    let host = with_host(&mut world);
    let plugin = world.add(AddinBuilder::new("plugin").extension_with(
        "menu",
        ExtensionDescription::new("open", "menu/item").with_data("icon", "folder.png"),
    ));

    let outcome = world.resolve(&world.input(&[host, plugin]), &StoreSnapshot::default()).unwrap();

    assert_eq!(names(&outcome), vec!["host"]);
    let id = AddinBuilder::new("plugin").id();
    let pack = outcome.invalid_pack(id).unwrap();
    assert!(pack.has_failure(FailureKind::MissingData));
    assert!(pack.failures[0].message.contains("label"), "got: {}", pack.failures[0]);
}

#[rstest]
#[case::missing_type(TypeMetadata::class("Other.Type"), FailureKind::MissingType)]
#[case::abstract_type(
    TypeMetadata { is_abstract: true, ..TypeMetadata::extension_point("Host.Menu", "Host.IItem") },
    FailureKind::RuleViolation
)]
#[case::no_constructor(
    TypeMetadata { has_public_parameterless_ctor: false, ..TypeMetadata::extension_point("Host.Menu", "Host.IItem") },
    FailureKind::RuleViolation
)]
#[case::not_a_point(TypeMetadata::class("Host.Menu"), FailureKind::RuleViolation)]
fn test_point_type_rules(#[case] defined: TypeMetadata, #[case] expected: FailureKind) {
    let mut world = Fixture::new();
    let host = world.add(AddinBuilder::new("host").assembly("Host").extension_point("menu", "Host.Menu"));
    world.define("host", "Host", defined);

    let outcome = world.resolve(&world.input(&[host]), &StoreSnapshot::default()).unwrap();

    assert!(outcome.ordered.is_empty());
    let pack = outcome.invalid_pack(AddinBuilder::new("host").id()).unwrap();
    assert!(pack.has_failure(expected), "failures: {:?}", pack.failures);
}

#[test]
fn test_builder_for_wrong_extension_type_is_rejected() {
    let mut world = Fixture::new();
    let host = with_host(&mut world);
    let plugin = world.add(
        AddinBuilder::new("plugin")
            .assembly("Plugin")
            .builder("menu", "tool", "Plugin.ToolBuilder"),
    );
    world.define(
        "plugin",
        "Plugin",
        TypeMetadata::extension_builder("Plugin.ToolBuilder", "Plugin.ITool"),
    );

    let outcome = world.resolve(&world.input(&[host, plugin]), &StoreSnapshot::default()).unwrap();

    let pack = outcome.invalid_pack(AddinBuilder::new("plugin").id()).unwrap();
    assert!(pack.has_failure(FailureKind::RuleViolation));
    assert!(pack.failures[0].message.contains("Host.IItem"));
}

#[test]
fn test_child_builder_needs_composite_parent() {
    let mut world = Fixture::new();
    let host = with_host(&mut world);
    let plugin = world.add(
        AddinBuilder::new("plugin")
            .assembly("Plugin")
            .builder("menu/item", "sub", "Plugin.SubBuilder"),
    );
    world.define(
        "plugin",
        "Plugin",
        TypeMetadata::extension_builder("Plugin.SubBuilder", "Host.IItem"),
    );

    let outcome = world.resolve(&world.input(&[host, plugin]), &StoreSnapshot::default()).unwrap();

    let pack = outcome.invalid_pack(AddinBuilder::new("plugin").id()).unwrap();
    assert!(pack.has_failure(FailureKind::RuleViolation));
    assert!(pack.failures[0].message.contains("does not accept child builders"));
}

#[test]
fn test_unknown_builder_path_fails() {
    let mut world = Fixture::new();
    let host = with_host(&mut world);
    let plugin = world.add(
        AddinBuilder::new("plugin")
            .extension_with("menu", ExtensionDescription::new("open", "menu/button")),
    );

    let outcome = world.resolve(&world.input(&[host, plugin]), &StoreSnapshot::default()).unwrap();

    let pack = outcome.invalid_pack(AddinBuilder::new("plugin").id()).unwrap();
    assert!(pack.has_failure(FailureKind::MissingBuilder));
}

#[test]
fn test_unknown_parent_fails() {
    let mut world = Fixture::new();
    let host = with_host(&mut world);
    let plugin = world.add(AddinBuilder::new("plugin").extension_with("toolbar", labelled("open")));

    let outcome = world.resolve(&world.input(&[host, plugin]), &StoreSnapshot::default()).unwrap();

    let pack = outcome.invalid_pack(AddinBuilder::new("plugin").id()).unwrap();
    assert!(pack.has_failure(FailureKind::MissingParent));
}

#[test]
fn test_builder_of_another_point_is_a_mismatch() {
    let mut world = Fixture::new();
    let host = world.add(
        AddinBuilder::new("host")
            .assembly("Host")
            .extension_point("menu", "Host.Menu")
            .builder("menu", "item", "Host.ItemBuilder")
            .extension_point("toolbar", "Host.Toolbar"),
    );
    world.define("host", "Host", TypeMetadata::extension_point("Host.Menu", "Host.IItem"));
    world.define("host", "Host", TypeMetadata::extension_point("Host.Toolbar", "Host.IItem"));
    world.define("host", "Host", TypeMetadata::extension_builder("Host.ItemBuilder", "Host.IItem"));
    let plugin = world.add(
        AddinBuilder::new("plugin")
            .extension_with("toolbar", ExtensionDescription::new("open", "menu/item")),
    );

    let outcome = world.resolve(&world.input(&[host, plugin]), &StoreSnapshot::default()).unwrap();

    assert_eq!(names(&outcome), vec!["host"]);
    let pack = outcome.invalid_pack(AddinBuilder::new("plugin").id()).unwrap();
    assert!(pack.has_failure(FailureKind::BuilderMismatch));
}

#[test]
fn test_sibling_must_exist() {
    let mut world = Fixture::new();
    let host = with_host(&mut world);
    let base = world.add(AddinBuilder::new("base").extension_with("menu", labelled("open")));
    let after = world.add(AddinBuilder::new("after").extension_with(
        "menu",
        labelled("save").with_sibling("open", RelativePosition::After),
    ));
    let dangling = world.add(AddinBuilder::new("dangling").extension_with(
        "menu",
        labelled("quit").with_sibling("close", RelativePosition::Before),
    ));

    let outcome = world
        .resolve(&world.input(&[after, dangling, base, host]), &StoreSnapshot::default())
        .unwrap();

    assert_eq!(names(&outcome), vec!["host", "base", "after"]);
    let after = outcome.get(AddinBuilder::new("after").id()).unwrap();
    assert!(after.dependencies.contains(&AddinBuilder::new("base").id()));
    let pack = outcome.invalid_pack(AddinBuilder::new("dangling").id()).unwrap();
    assert!(pack.has_failure(FailureKind::MissingSibling));
}

/// A host whose `menu/submenu` builder nests `item` and a reference back
/// to itself, so submenus can go arbitrarily deep.
fn with_recursive_menu(world: &mut Fixture) -> addin_core::ports::FilePack {
    let pack = world.add(
        AddinBuilder::new("host")
            .assembly("Host")
            .extension_point("menu", "Host.Menu")
            .builder_with(
                "menu",
                ExtensionBuilderDescription::declared("submenu", "Host.SubmenuBuilder")
                    .with_child(ExtensionBuilderDescription::declared("item", "Host.ItemBuilder"))
                    .with_child(ExtensionBuilderDescription::referenced("submenu")),
            ),
    );
    world.define("host", "Host", TypeMetadata::extension_point("Host.Menu", "Host.IItem"));
    world.define(
        "host",
        "Host",
        TypeMetadata::composite_builder("Host.SubmenuBuilder", "Host.IItem"),
    );
    world.define("host", "Host", TypeMetadata::extension_builder("Host.ItemBuilder", "Host.IItem"));
    pack
}

#[test]
fn test_referenced_builder_reuses_nearest_ancestor() {
    let mut world = Fixture::new();
    let host = with_recursive_menu(&mut world);
    let plugin = world.add(
        AddinBuilder::new("plugin").extension_with(
            "menu",
            ExtensionDescription::new("file", "menu/submenu")
                .with_child(ExtensionDescription::new("recent", "menu/submenu/submenu"))
                .with_child(ExtensionDescription::new("open", "menu/submenu/item")),
        ),
    );

    let outcome = world.resolve(&world.input(&[host, plugin]), &StoreSnapshot::default()).unwrap();

    assert_eq!(names(&outcome), vec!["host", "plugin"]);
    let builders = &outcome.snapshot.bodies[0].extension_builders;
    let submenu = builders.iter().find(|b| b.path() == "menu/submenu").unwrap();
    let nested = builders.iter().find(|b| b.path() == "menu/submenu/submenu").unwrap();
    assert_eq!(
        nested.kind,
        addin_core::record::BuilderRecordKind::Referenced { target: submenu.uid }
    );
}

#[test]
fn test_extensions_nest_below_referenced_builder() {
    let mut world = Fixture::new();
    let host = with_recursive_menu(&mut world);
    let plugin = world.add(
        AddinBuilder::new("plugin").extension_with(
            "menu",
            ExtensionDescription::new("file", "menu/submenu").with_child(
                ExtensionDescription::new("recent", "menu/submenu/submenu")
                    .with_child(ExtensionDescription::new("doc", "menu/submenu/item"))
                    .with_child(ExtensionDescription::new("older", "menu/submenu/submenu")),
            ),
        ),
    );

    let outcome = world.resolve(&world.input(&[host, plugin]), &StoreSnapshot::default()).unwrap();

    assert_eq!(names(&outcome), vec!["host", "plugin"]);
    assert!(outcome.invalid.is_empty());
    let paths: Vec<String> = outcome.snapshot.bodies[1]
        .extensions
        .iter()
        .map(|e| e.path())
        .collect();
    assert!(paths.contains(&"menu/file/recent/doc".to_string()), "got: {paths:?}");
    assert!(paths.contains(&"menu/file/recent/older".to_string()), "got: {paths:?}");
}

#[test]
fn test_builder_of_unrelated_branch_is_rejected_below_alias() {
    let mut world = Fixture::new();
    let host = with_recursive_menu(&mut world);
    let plugin = world.add(
        AddinBuilder::new("plugin").extension_with(
            "menu",
            ExtensionDescription::new("file", "menu/submenu").with_child(
                ExtensionDescription::new("recent", "menu/submenu/submenu")
                    .with_child(ExtensionDescription::new("top", "menu/submenu")),
            ),
        ),
    );

    let outcome = world.resolve(&world.input(&[host, plugin]), &StoreSnapshot::default()).unwrap();

    let pack = outcome.invalid_pack(AddinBuilder::new("plugin").id()).unwrap();
    assert!(pack.has_failure(FailureKind::BuilderMismatch));
}

#[test]
fn test_referenced_builder_without_ancestor_fails() {
    let mut world = Fixture::new();
    let host = world.add(
        AddinBuilder::new("host")
            .assembly("Host")
            .extension_point("menu", "Host.Menu")
            .referenced_builder("menu", "item"),
    );
    world.define("host", "Host", TypeMetadata::extension_point("Host.Menu", "Host.IItem"));

    let outcome = world.resolve(&world.input(&[host]), &StoreSnapshot::default()).unwrap();

    let pack = outcome.invalid_pack(AddinBuilder::new("host").id()).unwrap();
    assert!(pack.has_failure(FailureKind::MissingBuilder));
}

#[rstest]
#[case(AddinCategory::User, AddinCategory::User, true)]
#[case(AddinCategory::User, AddinCategory::App, true)]
#[case(AddinCategory::App, AddinCategory::Root, true)]
#[case(AddinCategory::App, AddinCategory::User, false)]
#[case(AddinCategory::Root, AddinCategory::App, false)]
fn test_category_rules(
    #[case] plugin_category: AddinCategory,
    #[case] host_category: AddinCategory,
    #[case] allowed: bool,
) {
    let mut world = Fixture::new();
    let host = world.add(
        AddinBuilder::new("host")
            .category(host_category)
            .assembly("Host")
            .extension_point("menu", "Host.Menu")
            .builder("menu", "item", "Host.ItemBuilder"),
    );
    world.define("host", "Host", TypeMetadata::extension_point("Host.Menu", "Host.IItem"));
    world.define("host", "Host", TypeMetadata::extension_builder("Host.ItemBuilder", "Host.IItem"));
    let plugin = world.add(
        AddinBuilder::new("plugin")
            .category(plugin_category)
            .extension("menu", "open", "menu/item"),
    );

    let outcome = world.resolve(&world.input(&[host, plugin]), &StoreSnapshot::default()).unwrap();

    let plugin = AddinBuilder::new("plugin").id();
    assert_eq!(outcome.is_resolved(plugin), allowed);
    if !allowed {
        assert!(outcome.invalid_pack(plugin).unwrap().has_failure(FailureKind::CategoryViolation));
    }
}

#[test]
fn test_category_rules_can_be_switched_off() {
    let mut world = Fixture::new().with_config(ResolverConfig {
        enforce_category_rules: false,
        ..ResolverConfig::default()
    });
    let host = world.add(
        AddinBuilder::new("host")
            .assembly("Host")
            .extension_point("menu", "Host.Menu")
            .builder("menu", "item", "Host.ItemBuilder"),
    );
    world.define("host", "Host", TypeMetadata::extension_point("Host.Menu", "Host.IItem"));
    world.define("host", "Host", TypeMetadata::extension_builder("Host.ItemBuilder", "Host.IItem"));
    let plugin = world.add(
        AddinBuilder::new("plugin")
            .category(AddinCategory::Root)
            .extension("menu", "open", "menu/item"),
    );

    let outcome = world.resolve(&world.input(&[host, plugin]), &StoreSnapshot::default()).unwrap();

    assert_eq!(names(&outcome), vec!["host", "plugin"]);
}

#[test]
fn test_failed_assembly_provider_cascades() {
    let mut world = Fixture::new();
    let b = world.add(
        AddinBuilder::new("B")
            .assembly("B.Lib")
            .extension_point("ep", "B.Missing"),
    );
    let a = world.add(AddinBuilder::new("A").assembly("A"));
    world.introspector.add_reference(
        assembly_path("A", "A"),
        AssemblyIdentity::new("B.Lib", Version::new(1, 0, 0)),
    );

    let outcome = world.resolve(&world.input(&[a, b]), &StoreSnapshot::default()).unwrap();

    assert!(outcome.ordered.is_empty());
    let b = outcome.invalid_pack(AddinBuilder::new("B").id()).unwrap();
    assert!(b.has_failure(FailureKind::MissingType));
    let a = outcome.invalid_pack(AddinBuilder::new("A").id()).unwrap();
    assert!(a.has_failure(FailureKind::DependencyFailed));
    assert!(!a.has_failure(FailureKind::MissingType));
}

#[test]
fn test_assembly_reference_orders_provider_first() {
    let mut world = Fixture::new();
    let lib = world.add(AddinBuilder::new("lib").assembly("Lib"));
    let app = world.add(AddinBuilder::new("app").assembly("App"));
    world.introspector.add_reference(
        assembly_path("app", "App"),
        AssemblyIdentity::new("Lib", Version::new(1, 0, 0)),
    );

    let outcome = world.resolve(&world.input(&[app, lib]), &StoreSnapshot::default()).unwrap();

    assert_eq!(names(&outcome), vec!["lib", "app"]);
    assert_eq!(outcome.ordered[1].dependencies, vec![outcome.ordered[0].id]);
    assert_eq!(
        outcome.snapshot.index[1].referenced_assemblies,
        vec![AssemblyIdentity::new("Lib", Version::new(1, 0, 0))]
    );
}

#[test]
fn test_unsatisfied_assembly_reference_fails() {
    let mut world = Fixture::new();
    let app = world.add(AddinBuilder::new("app").assembly("App"));
    world.introspector.add_reference(
        assembly_path("app", "App"),
        AssemblyIdentity::new("Lib", Version::new(2, 0, 0)),
    );

    let outcome = world.resolve(&world.input(&[app]), &StoreSnapshot::default()).unwrap();

    let pack = outcome.invalid_pack(AddinBuilder::new("app").id()).unwrap();
    assert!(pack.has_failure(FailureKind::MissingReference));
}

#[test]
fn test_unreadable_assembly_fails_its_addin() {
    let mut world = Fixture::new();
    let app = world.add(AddinBuilder::new("app").assembly("App"));
    world.introspector = std::mem::take(&mut world.introspector)
        .with_unreadable(assembly_path("app", "App"));

    let outcome = world.resolve(&world.input(&[app]), &StoreSnapshot::default()).unwrap();

    let pack = outcome.invalid_pack(AddinBuilder::new("app").id()).unwrap();
    assert!(pack.has_failure(FailureKind::Introspection));
}

#[test]
fn test_interchangeable_assemblies_are_not_ambiguous() {
    let mut world = Fixture::new();
    let a = world.add(AddinBuilder::new("lib-a").assembly("Shared"));
    let b = world.add(AddinBuilder::new("lib-b").assembly("Shared"));
    world.define("lib-a", "Shared", TypeMetadata::extension_point("Shared.Point", "Shared.IItem"));
    world.define("lib-b", "Shared", TypeMetadata::extension_point("Shared.Point", "Shared.IItem"));
    let app = world.add(AddinBuilder::new("app").extension_point("shared", "Shared.Point"));

    let outcome = world.resolve(&world.input(&[app, a, b]), &StoreSnapshot::default()).unwrap();

    assert_eq!(names(&outcome), vec!["lib-a", "lib-b", "app"]);
    let app = outcome.get(AddinBuilder::new("app").id()).unwrap();
    assert_eq!(app.dependencies.len(), 2);
}

#[test]
fn test_same_type_in_unrelated_addins_aborts_run() {
    let mut world = Fixture::new();
    let a = world.add(AddinBuilder::new("lib-a").assembly("LibA"));
    let b = world.add(AddinBuilder::new("lib-b").assembly("LibB"));
    world.define("lib-a", "LibA", TypeMetadata::extension_point("Shared.Point", "Shared.IItem"));
    world.define("lib-b", "LibB", TypeMetadata::extension_point("Shared.Point", "Shared.IItem"));
    let app = world.add(AddinBuilder::new("app").extension_point("shared", "Shared.Point"));

    let result = world.resolve(&world.input(&[a, b, app]), &StoreSnapshot::default());

    match result {
        Err(Error::AmbiguousType { type_name, owners, .. }) => {
            assert_eq!(type_name, "Shared.Point");
            assert_eq!(owners.len(), 2);
        }
        other => panic!("expected an ambiguous type error, got {other:?}"),
    }
}

#[rstest]
#[case::failed_provider_first(&[0, 1, 2])]
#[case::requester_first(&[2, 0, 1])]
fn test_failed_provider_still_counts_toward_ambiguity(#[case] order: &[usize]) {
    let mut world = Fixture::new();
    let broken = world.add(
        AddinBuilder::new("broken")
            .assembly("Broken")
            .extension_point("broken", "Broken.Missing"),
    );
    let healthy = world.add(AddinBuilder::new("healthy").assembly("Healthy"));
    world.define("broken", "Broken", TypeMetadata::extension_point("Shared.Point", "Shared.IItem"));
    world.define("healthy", "Healthy", TypeMetadata::extension_point("Shared.Point", "Shared.IItem"));
    let app = world.add(AddinBuilder::new("app").extension_point("shared", "Shared.Point"));
    let packs = [broken, healthy, app];
    let ordered: Vec<_> = order.iter().map(|&i| packs[i].clone()).collect();

    let result = world.resolve(&world.input(&ordered), &StoreSnapshot::default());

    match result {
        Err(Error::AmbiguousType { type_name, owners, .. }) => {
            assert_eq!(type_name, "Shared.Point");
            assert_eq!(owners.len(), 2);
        }
        other => panic!("expected an ambiguous type error, got {other:?}"),
    }
}

#[test]
fn test_host_type_wins_over_addin_types() {
    let mut world = Fixture::new();
    world.introspector = std::mem::take(&mut world.introspector)
        .with_host_type(TypeMetadata::extension_point("Runtime.Point", "Runtime.IItem"));
    let lib = world.add(AddinBuilder::new("lib").assembly("Lib"));
    world.define("lib", "Lib", TypeMetadata::extension_point("Runtime.Point", "Runtime.IItem"));
    let app = world.add(AddinBuilder::new("app").extension_point("runtime", "Runtime.Point"));

    let outcome = world.resolve(&world.input(&[lib, app]), &StoreSnapshot::default()).unwrap();

    let app = outcome.get(AddinBuilder::new("app").id()).unwrap();
    assert!(app.dependencies.is_empty());
    assert_eq!(outcome.snapshot.bodies[1].extension_points[0].signature.assembly, None);
}

#[test]
fn test_parse_failures_are_quarantined() {
    let mut world = Fixture::new();
    world.parser = std::mem::take(&mut world.parser)
        .with_malformed("broken/addin.toml", "unexpected end of file");
    let broken = addin_core::ports::FilePack::new("broken/addin.toml");
    let backwards = world.add(
        AddinBuilder::new("backwards")
            .version("1.0.0")
            .compatible_with("2.0.0"),
    );

    let outcome = world.resolve(&world.input(&[broken, backwards]), &StoreSnapshot::default()).unwrap();

    assert!(outcome.ordered.is_empty());
    assert_eq!(outcome.invalid.len(), 2);
    assert!(outcome.invalid.iter().all(|p| p.has_failure(FailureKind::Parse)));
    assert_eq!(outcome.invalid[1].manifest.to_str(), Some("broken/addin.toml"));
    assert_eq!(outcome.invalid[1].addin, None);
    assert_eq!(outcome.invalid[0].addin, Some(AddinBuilder::new("backwards").id()));
    assert_eq!(outcome.snapshot.invalid.len(), 2);
}

#[test]
fn test_duplicate_point_in_one_addin_is_its_own_error() {
    let mut world = Fixture::new();
    let host = world.add(
        AddinBuilder::new("host")
            .assembly("Host")
            .extension_point("menu", "Host.Menu")
            .extension_point("menu", "Host.Menu"),
    );
    world.define("host", "Host", TypeMetadata::extension_point("Host.Menu", "Host.IItem"));

    let outcome = world.resolve(&world.input(&[host]), &StoreSnapshot::default()).unwrap();

    assert!(outcome.collisions.is_empty());
    let pack = outcome.invalid_pack(AddinBuilder::new("host").id()).unwrap();
    assert!(pack.has_failure(FailureKind::RuleViolation));
}

#[test]
fn test_mutual_dependency_is_unresolvable() {
    let mut world = Fixture::new();
    let a = world.add(
        AddinBuilder::new("a")
            .assembly("A")
            .extension_point("a-ep", "A.Point")
            .builder("a-ep", "item", "A.Item")
            .extension("b-ep", "from-a", "b-ep/item"),
    );
    let b = world.add(
        AddinBuilder::new("b")
            .assembly("B")
            .extension_point("b-ep", "B.Point")
            .builder("b-ep", "item", "B.Item")
            .extension("a-ep", "from-b", "a-ep/item"),
    );
    world.define("a", "A", TypeMetadata::extension_point("A.Point", "A.IItem"));
    world.define("a", "A", TypeMetadata::extension_builder("A.Item", "A.IItem"));
    world.define("b", "B", TypeMetadata::extension_point("B.Point", "B.IItem"));
    world.define("b", "B", TypeMetadata::extension_builder("B.Item", "B.IItem"));

    let outcome = world.resolve(&world.input(&[a.clone(), b.clone()]), &StoreSnapshot::default()).unwrap();
    assert!(outcome.ordered.is_empty());
    assert_eq!(outcome.invalid.len(), 2);
    assert!(outcome.invalid.iter().all(|p| p.has_failure(FailureKind::Unresolvable)));

    let quiet = Fixture {
        config: ResolverConfig {
            report_unresolvable: false,
            ..ResolverConfig::default()
        },
        ..world
    };
    let outcome = quiet.resolve(&quiet.input(&[a, b]), &StoreSnapshot::default()).unwrap();
    assert!(outcome.ordered.is_empty());
    assert!(outcome.invalid.is_empty());
}

#[test]
fn test_round_limit_leaves_rest_unresolvable() {
    let mut world = Fixture::new().with_config(ResolverConfig {
        max_rounds: Some(1),
        ..ResolverConfig::default()
    });
    let host = with_host(&mut world);
    let plugin = world.add(AddinBuilder::new("plugin").extension_with("menu", labelled("open")));

    let outcome = world.resolve(&world.input(&[plugin, host]), &StoreSnapshot::default()).unwrap();

    assert!(outcome.ordered.is_empty());
    assert!(outcome.invalid.iter().all(|p| p.has_failure(FailureKind::Unresolvable)));
}

#[test]
fn test_disabled_dependency_disables_dependent() {
    let mut world = Fixture::new();
    let host = world.add(
        AddinBuilder::new("host")
            .disabled()
            .assembly("Host")
            .extension_point("menu", "Host.Menu")
            .builder("menu", "item", "Host.ItemBuilder"),
    );
    world.define("host", "Host", TypeMetadata::extension_point("Host.Menu", "Host.IItem"));
    world.define("host", "Host", TypeMetadata::extension_builder("Host.ItemBuilder", "Host.IItem"));
    let plugin = world.add(AddinBuilder::new("plugin").extension("menu", "open", "menu/item"));

    let outcome = world.resolve(&world.input(&[host, plugin]), &StoreSnapshot::default()).unwrap();

    assert_eq!(names(&outcome), vec!["host", "plugin"]);
    assert!(outcome.ordered.iter().all(|a| !a.enabled));
    assert!(outcome.snapshot.index.iter().all(|r| !r.enabled));
}

#[test]
fn test_root_addin_stays_enabled() {
    let mut world = Fixture::new();
    let core = world.add(AddinBuilder::new("core").category(AddinCategory::Root).disabled());

    let outcome = world.resolve(&world.input(&[core]), &StoreSnapshot::default()).unwrap();

    assert!(outcome.ordered[0].enabled);
    assert!(outcome.report.messages.iter().any(|m| m.contains("stays enabled")));
}
