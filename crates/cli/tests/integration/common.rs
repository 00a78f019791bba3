//! Shared test helpers for CLI integration tests.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Id the first package created in a fresh store receives.
pub const FIRST_ID: &str = "1000000";

/// Isolated test environment.
///
/// Each test gets its own temporary directory holding the data root, the
/// workspace root and any input files.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  /// Write a file relative to the temp directory and return its path.
  pub fn write_file(&self, relative_path: &str, content: impl AsRef<[u8]>) -> PathBuf {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
  }

  pub fn path(&self, relative_path: &str) -> PathBuf {
    self.temp.path().join(relative_path)
  }

  /// Data root (isolated per test).
  pub fn root_path(&self) -> PathBuf {
    let p = self.temp.path().join("flightdeck");
    std::fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  /// Build workspace root (isolated per test).
  pub fn workspaces_path(&self) -> PathBuf {
    let p = self.temp.path().join("workspaces");
    std::fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  /// Workspace directories currently on disk.
  pub fn workspaces(&self) -> Vec<PathBuf> {
    std::fs::read_dir(self.workspaces_path())
      .unwrap()
      .flatten()
      .map(|e| e.path())
      .collect()
  }

  /// A `flightdeck` command isolated to this environment, acting as alice.
  ///
  /// Sets:
  /// - `FLIGHTDECK_ROOT` / `FLIGHTDECK_WORKSPACES`: isolated paths
  /// - `FLIGHTDECK_USER`: `alice`
  /// - clears the remaining `FLIGHTDECK_*` variables
  pub fn cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("flightdeck");
    cmd.current_dir(self.temp.path());
    cmd.env("FLIGHTDECK_ROOT", self.root_path());
    cmd.env("FLIGHTDECK_WORKSPACES", self.workspaces_path());
    cmd.env("FLIGHTDECK_USER", "alice");
    for var in [
      "FLIGHTDECK_TOOLCHAIN",
      "FLIGHTDECK_BUILD_TIMEOUT",
      "FLIGHTDECK_DEBUG",
      "FLIGHTDECK_CORE_LIBRARY",
    ] {
      cmd.env_remove(var);
    }
    cmd
  }

  /// Runs `package create` and returns the new package id.
  pub fn create_package(&self, full_name: &str, kind: &str) -> String {
    let output = self
      .cmd()
      .args(["package", "create", full_name, "--kind", kind, "-o", "json"])
      .output()
      .unwrap();
    assert!(
      output.status.success(),
      "package create failed: {}",
      String::from_utf8_lossy(&output.stderr)
    );
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    json["package"]["id"].to_string()
  }

  /// Writes an executable shell script standing in for the toolchain.
  #[cfg(unix)]
  pub fn toolchain(&self, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = self.write_file("fake-cfx", format!("#!/bin/sh\n{}\n", body));
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
  }
}

/// Parses stdout of a `-o json` invocation.
pub fn json_stdout(output: &std::process::Output) -> serde_json::Value {
  assert!(
    output.status.success(),
    "command failed: {}",
    String::from_utf8_lossy(&output.stderr)
  );
  serde_json::from_slice(&output.stdout).unwrap()
}

pub fn read(path: &Path) -> Vec<u8> {
  std::fs::read(path).unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
}
