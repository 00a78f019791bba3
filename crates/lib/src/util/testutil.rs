//! Test helpers: throwaway stores and fake toolchains.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::package::UserId;
use crate::revision::RevisionGraph;

pub fn alice() -> UserId {
  UserId::from("alice")
}

pub fn bob() -> UserId {
  UserId::from("bob")
}

/// A graph over a fresh temporary store. Keep the `TempDir` alive for the
/// duration of the test.
pub fn graph() -> (RevisionGraph, TempDir) {
  let temp = TempDir::new().unwrap();
  let graph = RevisionGraph::open(&temp.path().join("store"));
  (graph, temp)
}

/// Writes an executable `/bin/sh` script standing in for the compiler.
///
/// The script runs with the workspace as its working directory, so it can
/// inspect `package.json` and `lib/` and write the artifact next to them.
#[cfg(unix)]
pub fn fake_toolchain(dir: &Path, body: &str) -> PathBuf {
  use std::os::unix::fs::PermissionsExt;

  let path = dir.join("fake-cfx");
  std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
  let mut perms = std::fs::metadata(&path).unwrap().permissions();
  perms.set_mode(0o755);
  std::fs::set_permissions(&path, perms).unwrap();
  path
}

/// A toolchain that writes `<name>.xpi` containing its arguments.
#[cfg(unix)]
pub fn succeeding_toolchain(dir: &Path, artifact_name: &str) -> PathBuf {
  fake_toolchain(dir, &format!("echo \"built $*\"\necho \"$*\" > {}.xpi", artifact_name))
}

/// A toolchain that reports a diagnostic on stderr and exits non-zero.
#[cfg(unix)]
pub fn failing_toolchain(dir: &Path) -> PathBuf {
  fake_toolchain(dir, "echo 'SyntaxError: lib/main.js:1' >&2\nexit 1")
}
