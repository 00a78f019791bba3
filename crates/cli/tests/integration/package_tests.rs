//! Package lifecycle through the CLI.

use predicates::prelude::*;

use super::common::{FIRST_ID, TestEnv, json_stdout};

#[test]
fn create_list_and_show() {
  let env = TestEnv::new();

  env
    .cmd()
    .args(["package", "create", "Foo Bar", "-d", "first addon"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Created addon 'Foo Bar'"))
    .stdout(predicate::str::contains(FIRST_ID))
    .stdout(predicate::str::contains("foo-bar"));

  env
    .cmd()
    .args(["package", "list"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Foo Bar (foo-bar) by alice"));

  env
    .cmd()
    .args(["package", "show", FIRST_ID])
    .assert()
    .success()
    .stdout(predicate::str::contains("1000000@1"))
    .stdout(predicate::str::contains("first addon"))
    .stdout(predicate::str::contains("never"));
}

#[test]
fn ids_count_up() {
  let env = TestEnv::new();

  assert_eq!(env.create_package("One", "addon"), "1000000");
  assert_eq!(env.create_package("Two", "library"), "1000001");

  let output = env
    .cmd()
    .args(["package", "list", "--kind", "library", "-o", "json"])
    .output()
    .unwrap();
  let listed = json_stdout(&output);
  assert_eq!(listed.as_array().unwrap().len(), 1);
  assert_eq!(listed[0]["full_name"], "Two");
}

#[test]
fn duplicate_name_is_rejected_per_author() {
  let env = TestEnv::new();
  env.create_package("Foo", "addon");

  env
    .cmd()
    .args(["package", "create", "Foo"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("already have an active addon"));

  env
    .cmd()
    .args(["--user", "bob", "package", "create", "Foo"])
    .assert()
    .success();

  // Same name, other kind.
  env
    .cmd()
    .args(["package", "create", "Foo", "--kind", "library"])
    .assert()
    .success();
}

#[test]
fn mutations_need_a_user() {
  let env = TestEnv::new();

  env
    .cmd()
    .env_remove("FLIGHTDECK_USER")
    .args(["package", "create", "Foo"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("No acting user"));
}

#[test]
fn only_the_author_renames() {
  let env = TestEnv::new();
  env.create_package("Foo", "addon");

  env
    .cmd()
    .args(["--user", "bob", "package", "rename", FIRST_ID, "Bar"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("not the author"));

  env
    .cmd()
    .args(["package", "rename", FIRST_ID, "Bar"])
    .assert()
    .success()
    .stdout(predicate::str::contains("'Bar' (bar)"));
}

#[test]
fn copy_belongs_to_the_copier() {
  let env = TestEnv::new();
  env.create_package("Foo", "addon");

  env
    .cmd()
    .args(["--user", "bob", "package", "copy", FIRST_ID])
    .assert()
    .success()
    .stdout(predicate::str::contains("'Foo (copy)'"))
    .stdout(predicate::str::contains("1000001@1"));

  env
    .cmd()
    .args(["package", "list", "--author", "bob"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Foo (copy)"))
    .stdout(predicate::str::contains("by alice").not());
}

#[test]
fn disable_needs_force_when_not_interactive() {
  let env = TestEnv::new();
  env.create_package("Foo", "addon");

  env
    .cmd()
    .args(["package", "disable", FIRST_ID])
    .assert()
    .failure()
    .stderr(predicate::str::contains("--force"));

  env
    .cmd()
    .args(["package", "disable", FIRST_ID, "--force"])
    .assert()
    .success();

  env
    .cmd()
    .args(["package", "list"])
    .assert()
    .success()
    .stdout(predicate::str::contains("No packages found"));

  env
    .cmd()
    .args(["package", "list", "--all"])
    .assert()
    .success()
    .stdout(predicate::str::contains("[disabled]"));

  env.cmd().args(["package", "activate", FIRST_ID]).assert().success();
}
