//! End-to-end flows through the public API: edit, release, depend, build.

use std::collections::BTreeMap;
use std::time::Duration;

use flightdeck_lib::build::{BuildEnvironment, Builder, WorkspaceRegistry, artifact};
use flightdeck_lib::error::{Categorized, ErrorKind};
use flightdeck_lib::package::{PackageKind, UserId};
use flightdeck_lib::revision::{LibraryPin, RevisionGraph, RevisionKey};
use tempfile::TempDir;

fn setup() -> (RevisionGraph, WorkspaceRegistry, TempDir) {
  let temp = TempDir::new().unwrap();
  let graph = RevisionGraph::open(&temp.path().join("store"));
  let registry = WorkspaceRegistry::new(temp.path().join("workspaces"));
  (graph, registry, temp)
}

#[test]
fn edit_release_edit_keeps_history_intact() {
  let (graph, _registry, _temp) = setup();
  let alice = UserId::from("alice");

  let (foo, _) = graph.create_package(&alice, PackageKind::Addon, "Foo", "").unwrap();
  let working = graph.working_revision(foo.id, &alice).unwrap();
  let (saved, changed) = graph
    .update_modules(
      working.key(),
      &alice,
      &BTreeMap::from([("main".to_string(), "v1".to_string())]),
    )
    .unwrap();
  assert_eq!(changed, vec!["main"]);
  graph.set_version(saved.key(), &alice, "1.0").unwrap();

  let next = graph.working_revision(foo.id, &alice).unwrap();
  assert_eq!(next.key(), RevisionKey::new(foo.id, 2));
  graph
    .update_modules(
      next.key(),
      &alice,
      &BTreeMap::from([("main".to_string(), "v2".to_string())]),
    )
    .unwrap();

  let released = graph.by_version(foo.id, "1.0").unwrap().unwrap();
  assert_eq!(graph.module_source(released.key(), "main").unwrap(), "v1");
  assert_eq!(graph.module_source(next.key(), "main").unwrap(), "v2");
  assert_eq!(graph.newest_released(foo.id).unwrap().unwrap().number, 1);
}

#[test]
fn libraries_pin_exact_revisions() {
  let (graph, _registry, _temp) = setup();
  let alice = UserId::from("alice");

  let (_, addon) = graph.create_package(&alice, PackageKind::Addon, "Foo", "").unwrap();
  let (lib, lib1) = graph.create_package(&alice, PackageKind::Library, "Widgets", "").unwrap();
  let lib1 = graph.add_module(lib1.key(), &alice, "widgets", Some("w")).unwrap();
  let addon = graph.add_library(addon.key(), &alice, lib.id, LibraryPin::Newest).unwrap();

  // Later library edits do not move the pin.
  let lib2 = graph.branch(lib1.key(), &alice).unwrap();
  graph.add_module(lib2.key(), &alice, "extra", Some("x")).unwrap();

  let owners: Vec<_> = graph
    .resolve_transitive_modules(addon.key())
    .unwrap()
    .into_iter()
    .map(|m| m.owner)
    .collect();
  assert_eq!(owners, vec![addon.key(), lib1.key()]);
}

#[cfg(unix)]
mod builds {
  use std::os::unix::fs::PermissionsExt;
  use std::path::{Path, PathBuf};

  use super::*;

  fn script(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("cfx");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
  }

  #[tokio::test]
  async fn built_artifact_is_downloadable_until_purged() {
    let (graph, registry, temp) = setup();
    let alice = UserId::from("alice");
    let (_, r1) = graph.create_package(&alice, PackageKind::Addon, "Foo", "").unwrap();

    let toolchain = script(temp.path(), "printf 'PK' > foo.xpi");
    let builder = Builder::new(registry.clone(), BuildEnvironment::new(toolchain));
    let result = builder.build(&graph, r1.key(), &BTreeMap::new()).await.unwrap();
    assert!(result.success);
    assert!(result.artifact_present);

    let workspace = result.workspace.to_string();
    let download = artifact::download(&registry, &workspace, "foo").await.unwrap();
    assert_eq!(download.bytes, b"PK");

    artifact::purge(&registry, &workspace).await.unwrap();
    let err = artifact::download(&registry, &workspace, "foo").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
  }

  #[tokio::test]
  async fn failed_and_timed_out_builds_leave_nothing() {
    let (graph, registry, temp) = setup();
    let alice = UserId::from("alice");
    let (_, r1) = graph.create_package(&alice, PackageKind::Addon, "Foo", "").unwrap();

    let failing = script(temp.path(), "echo 'error: bad module' >&2\nexit 2");
    let err = Builder::new(registry.clone(), BuildEnvironment::new(&failing))
      .build(&graph, r1.key(), &BTreeMap::new())
      .await
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BuildFailed);
    assert!(registry.list().unwrap().is_empty());

    let slow = script(temp.path(), "sleep 5");
    let environment = BuildEnvironment::new(&slow)
      .inherit_path()
      .with_timeout(Duration::from_millis(300));
    let err = Builder::new(registry.clone(), environment)
      .build(&graph, r1.key(), &BTreeMap::new())
      .await
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BuildTimeout);
    assert!(registry.list().unwrap().is_empty());
  }
}
