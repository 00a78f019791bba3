use predicates::prelude::*;

use super::common::{FIRST_ID, TestEnv, json_stdout};

const LIB_ID: &str = "1000001";

#[test]
fn add_resolve_and_remove_a_library() {
  let env = TestEnv::new();
  env.create_package("Foo", "addon");
  env.create_package("Widgets", "library");
  env.cmd().args(["module", "add", LIB_ID, "widgets"]).assert().success();

  env
    .cmd()
    .args(["dep", "add", FIRST_ID, LIB_ID])
    .assert()
    .success()
    .stdout(predicate::str::contains("depends on widgets"))
    .stdout(predicate::str::contains("1000001@1"));

  let output = env
    .cmd()
    .args(["module", "list", FIRST_ID, "--resolved", "-o", "json"])
    .output()
    .unwrap();
  let resolved = json_stdout(&output);
  let owners: Vec<String> = resolved
    .as_array()
    .unwrap()
    .iter()
    .map(|m| format!("{}@{}", m["owner"]["package"], m["owner"]["number"]))
    .collect();
  assert_eq!(owners, vec!["1000000@1", "1000001@1"]);

  env
    .cmd()
    .args(["dep", "add", FIRST_ID, LIB_ID])
    .assert()
    .failure()
    .stderr(predicate::str::contains("already depends on package 1000001"));

  env
    .cmd()
    .args(["dep", "remove", FIRST_ID, LIB_ID])
    .assert()
    .success();

  env
    .cmd()
    .args(["revision", "show", FIRST_ID])
    .assert()
    .success()
    .stdout(predicate::str::contains("No dependencies"));
}

#[test]
fn only_libraries_can_be_dependencies() {
  let env = TestEnv::new();
  env.create_package("Foo", "addon");
  env.create_package("Other", "addon");

  env
    .cmd()
    .args(["dep", "add", FIRST_ID, LIB_ID])
    .assert()
    .failure()
    .stderr(predicate::str::contains("not a library"));
}

#[test]
fn released_pin_needs_a_release() {
  let env = TestEnv::new();
  env.create_package("Foo", "addon");
  env.create_package("Widgets", "library");

  env
    .cmd()
    .args(["dep", "add", FIRST_ID, LIB_ID, "--released"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("no released revision"));

  env
    .cmd()
    .args(["revision", "release", LIB_ID, "0.1"])
    .assert()
    .success();
  env.cmd().args(["revision", "branch", LIB_ID]).assert().success();

  env
    .cmd()
    .args(["dep", "add", FIRST_ID, LIB_ID, "--released"])
    .assert()
    .success()
    .stdout(predicate::str::contains("1000001@1"));
}

#[test]
fn core_library_is_injected_into_addons() {
  let env = TestEnv::new();
  env.create_package("Core", "library");
  env.cmd().args(["module", "add", FIRST_ID, "api"]).assert().success();
  env.create_package("Foo", "addon");

  env
    .cmd()
    .env("FLIGHTDECK_CORE_LIBRARY", FIRST_ID)
    .args(["module", "list", "1000001", "--resolved"])
    .assert()
    .success()
    .stdout(predicate::str::contains("1000000@1"));
}
