use predicates::prelude::*;

use super::common::{FIRST_ID, TestEnv};

#[test]
fn new_addons_use_the_newest_sdk() {
  let env = TestEnv::new();

  env
    .cmd()
    .args(["sdk", "add", "addon-sdk", "1.0b1"])
    .assert()
    .success()
    .stdout(predicate::str::contains("as sdk 1"));
  env.cmd().args(["sdk", "add", "addon-sdk", "1.0b2"]).assert().success();

  env
    .cmd()
    .args(["sdk", "list"])
    .assert()
    .success()
    .stdout(predicate::str::contains("addon-sdk 1.0b1"))
    .stdout(predicate::str::contains("addon-sdk 1.0b2"));

  env
    .cmd()
    .args(["package", "create", "Foo"])
    .assert()
    .success()
    .stdout(predicate::str::contains("SDK: 2"));

  env
    .cmd()
    .args(["sdk", "switch", FIRST_ID, "1"])
    .assert()
    .success()
    .stdout(predicate::str::contains("now builds with sdk 1"));

  env
    .cmd()
    .args(["revision", "show", FIRST_ID])
    .assert()
    .success()
    .stdout(predicate::str::contains("addon-sdk 1.0b1"));
}

#[test]
fn sdk_registration_is_validated() {
  let env = TestEnv::new();

  env
    .cmd()
    .args(["sdk", "add", "addon sdk", "1.0"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("invalid sdk"));

  env.cmd().args(["sdk", "add", "addon-sdk", "1.0"]).assert().success();
  env
    .cmd()
    .args(["sdk", "add", "addon-sdk", "1.0"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("already registered"));
}

#[test]
fn libraries_have_no_sdk() {
  let env = TestEnv::new();
  env.cmd().args(["sdk", "add", "addon-sdk", "1.0"]).assert().success();
  env.create_package("Widgets", "library");

  env
    .cmd()
    .args(["sdk", "switch", FIRST_ID, "1"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("libraries have no sdk"));
}
