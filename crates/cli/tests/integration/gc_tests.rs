use predicates::prelude::*;

use super::common::TestEnv;

const STRAY_WORKSPACE: &str = "0123456789abcdef0123456789abcdef";

#[test]
fn gc_with_empty_store_succeeds() {
  let env = TestEnv::new();

  env
    .cmd()
    .arg("gc")
    .assert()
    .success()
    .stdout(predicate::str::contains("Garbage collection complete"));
}

#[test]
fn gc_dry_run_keeps_everything() {
  let env = TestEnv::new();
  std::fs::create_dir_all(env.workspaces_path().join(STRAY_WORKSPACE)).unwrap();

  env
    .cmd()
    .args(["gc", "--dry-run", "--max-age", "0s"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Dry run"))
    .stdout(predicate::str::contains("Workspaces removed: 1"));

  assert_eq!(env.workspaces().len(), 1);
}

#[test]
fn gc_removes_stray_workspaces_past_max_age() {
  let env = TestEnv::new();
  std::fs::create_dir_all(env.workspaces_path().join(STRAY_WORKSPACE)).unwrap();
  std::fs::create_dir_all(env.workspaces_path().join("not-a-workspace")).unwrap();

  env
    .cmd()
    .arg("gc")
    .assert()
    .success()
    .stdout(predicate::str::contains("Workspaces removed: 0"));

  env
    .cmd()
    .args(["gc", "--max-age", "0s"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Workspaces removed: 1"));

  let left = env.workspaces();
  assert_eq!(left.len(), 1);
  assert!(left[0].ends_with("not-a-workspace"));
}

#[test]
fn gc_json_output_is_valid() {
  let env = TestEnv::new();

  env
    .cmd()
    .args(["gc", "-o", "json"])
    .assert()
    .success()
    .stdout(predicate::str::contains("workspaces_deleted"))
    .stdout(predicate::str::contains("blobs_deleted"))
    .stdout(predicate::str::contains("deleted_paths"));
}
