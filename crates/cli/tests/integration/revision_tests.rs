//! Revisions, modules and attachments through the CLI.

use predicates::prelude::*;

use super::common::{FIRST_ID, TestEnv, read};

#[test]
fn editing_a_released_revision_branches() {
  let env = TestEnv::new();
  env.create_package("Foo", "addon");

  env
    .cmd()
    .args(["revision", "release", FIRST_ID, "1.0"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Released 1000000@1 as 1.0"));

  env
    .cmd()
    .args(["module", "add", FIRST_ID, "util"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Added module util to 1000000@2"));

  // Further edits land on the same unreleased head.
  env
    .cmd()
    .args(["module", "add", FIRST_ID, "helpers.js"])
    .assert()
    .success()
    .stdout(predicate::str::contains("1000000@2"));

  env
    .cmd()
    .args(["revision", "list", FIRST_ID])
    .assert()
    .success()
    .stdout(predicate::str::contains("1000000@1 [1.0]"))
    .stdout(predicate::str::contains("1000000@2 by alice"));

  env
    .cmd()
    .args(["module", "list", FIRST_ID, "-r", "1"])
    .assert()
    .success()
    .stdout(predicate::str::contains("main"))
    .stdout(predicate::str::contains("util").not());
}

#[test]
fn version_names_are_unique_and_immutable() {
  let env = TestEnv::new();
  env.create_package("Foo", "addon");

  env
    .cmd()
    .args(["revision", "release", FIRST_ID, "1.0"])
    .assert()
    .success();

  env
    .cmd()
    .args(["revision", "release", FIRST_ID, "1.1"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("already released"));

  env.cmd().args(["revision", "branch", FIRST_ID]).assert().success();

  env
    .cmd()
    .args(["revision", "release", FIRST_ID, "1.0"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("already used by revision 1000000@1"));

  env
    .cmd()
    .args(["revision", "find", FIRST_ID, "1.0"])
    .assert()
    .success()
    .stdout(predicate::str::contains("1000000@1 [1.0]"));
}

#[test]
fn editing_an_older_revision_is_stale() {
  let env = TestEnv::new();
  env.create_package("Foo", "addon");
  env.cmd().args(["revision", "branch", FIRST_ID]).assert().success();

  env
    .cmd()
    .args(["module", "add", FIRST_ID, "util", "-r", "1"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("stale"));
}

#[test]
fn save_and_cat_module_source() {
  let env = TestEnv::new();
  env.create_package("Foo", "addon");
  let source = env.write_file("main.js", "exports.main = function() {};\n");

  env
    .cmd()
    .args(["module", "save", FIRST_ID])
    .arg(format!("main={}", source.display()))
    .assert()
    .success()
    .stdout(predicate::str::contains("Saved main in 1000000@1"));

  env
    .cmd()
    .args(["module", "cat", FIRST_ID, "main"])
    .assert()
    .success()
    .stdout("exports.main = function() {};\n");

  // Saving identical source is a no-op.
  env
    .cmd()
    .args(["module", "save", FIRST_ID])
    .arg(format!("main={}", source.display()))
    .assert()
    .success()
    .stdout(predicate::str::contains("No changes"));

  env
    .cmd()
    .args(["module", "save", FIRST_ID])
    .arg(format!("missing={}", source.display()))
    .assert()
    .failure()
    .stderr(predicate::str::contains("no module named"));
}

#[test]
fn attachments_round_trip_through_the_store() {
  let env = TestEnv::new();
  env.create_package("Foo", "addon");
  env.write_file("Icon File.PNG", b"\x89PNG-bytes");

  env
    .cmd()
    .args(["attachment", "add", FIRST_ID, "Icon File.PNG"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Attached icon-file.png"));

  env
    .cmd()
    .args(["attachment", "get", FIRST_ID, "icon-file.png", "--out", "copy.png"])
    .assert()
    .success();
  assert_eq!(read(&env.path("copy.png")), b"\x89PNG-bytes");

  env
    .cmd()
    .args(["revision", "show", FIRST_ID])
    .assert()
    .success()
    .stdout(predicate::str::contains("icon-file.png"));

  env
    .cmd()
    .args(["attachment", "remove", FIRST_ID, "icon-file.png"])
    .assert()
    .success();

  env
    .cmd()
    .args(["attachment", "get", FIRST_ID, "icon-file.png"])
    .assert()
    .failure();
}
