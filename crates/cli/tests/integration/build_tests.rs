//! Builds against a stand-in toolchain script.

#![cfg(unix)]

use predicates::prelude::*;

use super::common::{FIRST_ID, TestEnv, json_stdout, read};

/// Copies the entry module into the artifact so tests can see what was built.
const COPYING_TOOLCHAIN: &str = "echo \"built $*\"\ncat lib/main.js > foo.xpi";

#[test]
fn build_download_purge() {
  let env = TestEnv::new();
  let toolchain = env.toolchain(COPYING_TOOLCHAIN);
  env.create_package("Foo", "addon");

  let output = env
    .cmd()
    .env("FLIGHTDECK_TOOLCHAIN", &toolchain)
    .args(["build", FIRST_ID, "-o", "json"])
    .output()
    .unwrap();
  let result = json_stdout(&output);
  assert_eq!(result["success"], true);
  assert_eq!(result["package_name"], "foo");
  assert_eq!(result["addon_name"], "Foo (1.0)");
  assert!(result["stdout"].as_str().unwrap().contains("built xpi"));
  let workspace = result["workspace"].as_str().unwrap().to_string();

  env
    .cmd()
    .args(["download", &workspace, "foo", "--out", "foo.xpi"])
    .assert()
    .success()
    .stdout(predicate::str::contains("application/octet-stream"))
    .stdout(predicate::str::contains("attachment; filename=\"foo.xpi\""));
  let artifact = String::from_utf8(read(&env.path("foo.xpi"))).unwrap();
  assert!(artifact.contains("main.js - Foo's module"));

  env
    .cmd()
    .args(["download", &workspace, "foo", "--out", "test.xpi", "--test"])
    .assert()
    .success()
    .stdout(predicate::str::contains("text/plain; charset=x-user-defined"));

  env
    .cmd()
    .args(["purge", &workspace])
    .assert()
    .success()
    .stdout(predicate::str::contains("Purged"));

  env
    .cmd()
    .args(["download", &workspace, "foo"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("no artifact foo.xpi"));

  // Purging again is fine.
  env.cmd().args(["purge", &workspace]).assert().success();
}

#[test]
fn live_sources_are_built_but_not_saved() {
  let env = TestEnv::new();
  let toolchain = env.toolchain(COPYING_TOOLCHAIN);
  env.create_package("Foo", "addon");
  let live = env.write_file("draft.js", "// unsaved draft\n");

  let output = env
    .cmd()
    .args(["build", FIRST_ID, "-o", "json", "--toolchain"])
    .arg(&toolchain)
    .arg("--live")
    .arg(format!("main={}", live.display()))
    .output()
    .unwrap();
  let result = json_stdout(&output);
  assert_eq!(read(result["artifact_path"].as_str().unwrap().as_ref()), b"// unsaved draft\n");

  env
    .cmd()
    .args(["module", "cat", FIRST_ID, "main"])
    .assert()
    .success()
    .stdout(predicate::str::contains("unsaved draft").not());
}

#[test]
fn failed_build_leaves_no_workspace() {
  let env = TestEnv::new();
  let toolchain = env.toolchain("echo 'SyntaxError: missing ; before statement' >&2\nexit 1");
  env.create_package("Foo", "addon");

  env
    .cmd()
    .env("FLIGHTDECK_TOOLCHAIN", &toolchain)
    .args(["build", FIRST_ID])
    .assert()
    .failure()
    .stderr(predicate::str::contains("SyntaxError"));

  assert!(env.workspaces().is_empty());
}

#[test]
fn debug_build_keeps_failed_workspace() {
  let env = TestEnv::new();
  let toolchain = env.toolchain("echo 'warning: deprecated api' >&2");
  env.create_package("Foo", "addon");

  env
    .cmd()
    .env("FLIGHTDECK_TOOLCHAIN", &toolchain)
    .args(["build", FIRST_ID, "--debug"])
    .assert()
    .success()
    .stderr(predicate::str::contains("workspace kept"))
    .stdout(predicate::str::contains("produced no artifact"));

  assert_eq!(env.workspaces().len(), 1);
}

#[test]
fn slow_build_times_out() {
  let env = TestEnv::new();
  let toolchain = env.toolchain("sleep 10");
  env.create_package("Foo", "addon");

  env
    .cmd()
    .env("FLIGHTDECK_TOOLCHAIN", &toolchain)
    .args(["build", FIRST_ID, "--timeout", "500ms"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("timed out"));

  assert!(env.workspaces().is_empty());
}

#[test]
fn missing_toolchain_and_libraries_are_rejected() {
  let env = TestEnv::new();
  env.create_package("Foo", "addon");
  env.create_package("Widgets", "library");

  env
    .cmd()
    .env("FLIGHTDECK_TOOLCHAIN", env.path("no-such-cfx"))
    .args(["build", FIRST_ID])
    .assert()
    .failure()
    .stderr(predicate::str::contains("not found"));

  let toolchain = env.toolchain(COPYING_TOOLCHAIN);
  env
    .cmd()
    .env("FLIGHTDECK_TOOLCHAIN", &toolchain)
    .args(["build", "1000001"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("cannot be built"));

  assert!(env.workspaces().is_empty());
}
