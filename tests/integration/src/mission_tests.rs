//! Mission-based Integration Tests
//!
//! Each mission drives the resolver through a file-backed store the way a
//! host application would: install, update, remove and recover.

use addin_core::model::{AssemblyIdentity, TypeMetadata};
use addin_core::{AddinStore, CollisionKey, FailureKind, FilePack, StoreSnapshot, VariantKind};
use addin_store::{FileStore, FileStoreConfig};
use addin_test_utils::{AddinBuilder, FailingStore, FailurePoint, FakeScanner, Fixture, assembly_path};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

// =============================================================================
// Test Infrastructure
// =============================================================================

/// A store directory plus the world of addins the missions install.
struct Installation {
    dir: TempDir,
    world: Fixture,
}

impl Installation {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            world: Fixture::new(),
        }
    }

    fn store(&self) -> FileStore {
        FileStore::in_dir(self.dir.path())
    }

    fn install(&self, packs: Vec<FilePack>) -> addin_core::ResolutionOutcome {
        self.world
            .resolver()
            .run(&FakeScanner::new(packs), &mut self.store())
            .unwrap()
    }

    fn remove(&self, names: &[&str]) -> addin_core::ResolutionOutcome {
        let removed = names.iter().map(|n| AddinBuilder::new(n).id()).collect();
        self.world
            .resolver()
            .run(&FakeScanner::default().with_removed(removed), &mut self.store())
            .unwrap()
    }

    fn snapshot(&self) -> StoreSnapshot {
        self.store().load().unwrap()
    }

    fn document(&self) -> Vec<u8> {
        fs::read(FileStoreConfig::new(self.dir.path()).data_path()).unwrap()
    }

    /// Addin `name` owning point `point` with builder `{point}/item`.
    fn point_owner(&mut self, name: &str, point: &str, version: &str) -> FilePack {
        let pack = self.world.add(
            AddinBuilder::new(name)
                .version(version)
                .assembly(name)
                .extension_point(point, &format!("{name}.Point"))
                .builder(point, "item", &format!("{name}.Item")),
        );
        self.world.define(name, name, TypeMetadata::extension_point(format!("{name}.Point"), format!("{name}.IItem")));
        self.world.define(name, name, TypeMetadata::extension_builder(format!("{name}.Item"), format!("{name}.IItem")));
        pack
    }

    fn extender(&mut self, name: &str, point: &str) -> FilePack {
        self.world.add(AddinBuilder::new(name).extension(point, name, &format!("{point}/item")))
    }
}

fn names(outcome: &addin_core::ResolutionOutcome) -> Vec<&str> {
    outcome.ordered.iter().map(|a| a.name.as_str()).collect()
}

// =============================================================================
// Mission 1: Ordering
// =============================================================================

mod m1_ordering {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn m1_point_owner_loads_before_extender() {
        let mut install = Installation::new();
        let p = install.point_owner("P", "ep1", "1.0.0");
        let c = install.extender("C", "ep1");

        let outcome = install.install(vec![c, p]);

        assert_eq!(names(&outcome), vec!["P", "C"]);
        assert_eq!(outcome.ordered[1].dependencies, vec![outcome.ordered[0].id]);
        let persisted = install.snapshot();
        assert_eq!(persisted.index.len(), 2);
    }
}

// =============================================================================
// Mission 2: Collisions
// =============================================================================

mod m2_collisions {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn m2_competing_points_are_quarantined() {
        let mut install = Installation::new();
        let p1 = install.point_owner("P1", "ep1", "1.0.0");
        let p2 = install.point_owner("P2", "ep1", "1.0.0");

        let outcome = install.install(vec![p1, p2]);

        assert!(outcome.ordered.is_empty());
        assert!(
            outcome
                .collisions
                .entry(&CollisionKey::ExtensionPoint("ep1".to_string()))
                .is_some()
        );
        let persisted = install.snapshot();
        assert!(persisted.index.is_empty());
        assert_eq!(persisted.invalid.len(), 2);
    }

    #[test]
    fn m2_installed_point_owner_keeps_its_point() {
        let mut install = Installation::new();
        let p1 = install.point_owner("P1", "ep1", "1.0.0");
        install.install(vec![p1]);

        let p2 = install.point_owner("P2", "ep1", "1.0.0");
        let outcome = install.install(vec![p2]);

        assert_eq!(names(&outcome), vec!["P1"]);
        assert_eq!(outcome.ordered[0].variant, VariantKind::Unaffected);
        assert!(outcome.is_invalid(AddinBuilder::new("P2").id()));
    }
}

// =============================================================================
// Mission 3: Failure cascades
// =============================================================================

mod m3_cascades {
    use super::*;

    #[test]
    fn m3_failed_assembly_provider_fails_consumer() {
        let mut install = Installation::new();
        let b = install.world.add(
            AddinBuilder::new("B")
                .assembly("B.Lib")
                .extension_point("ep", "B.Missing"),
        );
        let a = install.world.add(AddinBuilder::new("A").assembly("A"));
        install.world.introspector.add_reference(
            assembly_path("A", "A"),
            AssemblyIdentity::new("B.Lib", semver::Version::new(1, 0, 0)),
        );

        let outcome = install.install(vec![a, b]);

        assert!(outcome.ordered.is_empty());
        let a = outcome.invalid_pack(AddinBuilder::new("A").id()).unwrap();
        assert!(a.has_failure(FailureKind::DependencyFailed));
        let b = outcome.invalid_pack(AddinBuilder::new("B").id()).unwrap();
        assert!(b.has_failure(FailureKind::MissingType));
    }

    #[test]
    fn m3_removed_host_quarantines_its_extenders() {
        let mut install = Installation::new();
        let host = install.point_owner("host", "menu", "1.0.0");
        let plugin = install.extender("plugin", "menu");
        install.install(vec![host, plugin]);

        let outcome = install.remove(&["host"]);

        assert!(outcome.ordered.is_empty());
        let plugin = outcome.invalid_pack(AddinBuilder::new("plugin").id()).unwrap();
        assert!(plugin.has_failure(FailureKind::MissingParent));
    }
}

// =============================================================================
// Mission 4: Incremental updates
// =============================================================================

mod m4_updates {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn m4_update_reresolves_extender_and_keeps_uids() {
        let mut install = Installation::new();
        let y = install.point_owner("Y", "ep", "1.0.0");
        let x = install.extender("X", "ep");
        let first = install.install(vec![y, x]);

        let y2 = install.point_owner("Y", "ep", "2.0.0");
        install.world.introspector.reset_calls();
        let second = install.install(vec![y2]);

        assert_eq!(names(&second), vec!["Y", "X"]);
        assert_eq!(second.ordered[0].variant, VariantKind::Updated);
        assert_eq!(second.ordered[1].variant, VariantKind::DirectlyAffected);
        assert_eq!(second.ordered[0].uid, first.ordered[0].uid);
        assert_eq!(second.ordered[1].uid, first.ordered[1].uid);
        assert!(install.world.introspector.calls() > 0);

        let persisted = install.snapshot();
        let builder = persisted.bodies[0].extension_builders[0].uid;
        assert_eq!(persisted.bodies[1].extensions[0].builder, builder);
    }

    #[test]
    fn m4_idle_run_rewrites_identical_document() {
        let mut install = Installation::new();
        let y = install.point_owner("Y", "ep", "1.0.0");
        let x = install.extender("X", "ep");
        install.install(vec![y, x]);
        let before = install.document();

        install.world.introspector.reset_calls();
        let outcome = install.install(Vec::new());

        assert_eq!(install.world.introspector.calls(), 0);
        assert!(outcome.ordered.iter().all(|a| a.variant == VariantKind::Unaffected));
        assert_eq!(install.document(), before);
    }
}

// =============================================================================
// Mission 5: Recovery
// =============================================================================

mod m5_recovery {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn m5_failed_commit_restores_previous_document() {
        let mut install = Installation::new();
        let host = install.point_owner("host", "menu", "1.0.0");
        install.install(vec![host]);
        let before = install.document();

        let plugin = install.extender("plugin", "menu");
        let mut store = FailingStore::new(install.store(), FailurePoint::Commit);
        let result = install
            .world
            .resolver()
            .run(&FakeScanner::new(vec![plugin.clone()]), &mut store);

        assert!(result.is_err());
        assert_eq!(store.rollbacks(), 0);
        assert!(!store.into_inner().in_transaction());
        assert_eq!(install.document(), before);

        // The next healthy run picks the plugin up again.
        let outcome = install.install(vec![plugin]);
        assert_eq!(names(&outcome), vec!["host", "plugin"]);
    }

    #[test]
    fn m5_quarantined_pack_resolves_once_fixed() {
        let mut install = Installation::new();
        let host = install.point_owner("host", "menu", "1.0.0");
        let broken = install
            .world
            .add(AddinBuilder::new("plugin").extension("menu", "open", "menu/missing"));
        let first = install.install(vec![host, broken]);
        assert!(first.is_invalid(AddinBuilder::new("plugin").id()));
        assert_eq!(install.snapshot().invalid.len(), 1);

        let fixed = install.extender("plugin", "menu");
        let second = install.install(vec![fixed]);

        assert!(second.is_resolved(AddinBuilder::new("plugin").id()));
        assert!(install.snapshot().invalid.is_empty());
    }
}
