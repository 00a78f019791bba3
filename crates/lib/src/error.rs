//! Error categories shared by every module.
//!
//! Each module defines its own `thiserror` enum; all of them map onto
//! [`ErrorKind`] so callers (the CLI, an HTTP layer) can decide how to surface
//! a failure without matching on every variant.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  /// Bad identifier charset, malformed input. Never retried.
  Validation,
  /// The acting user is not the author of the entity being changed.
  Permission,
  /// Duplicate dependency edge, duplicate filename, name already taken, stale
  /// or released revision.
  Conflict,
  /// Missing package, revision, module, attachment, dependency or artifact.
  NotFound,
  /// Filesystem or toolchain unavailable.
  Resource,
  /// The toolchain ran and reported diagnostics.
  BuildFailed,
  /// The toolchain exceeded its wall-clock limit.
  BuildTimeout,
  /// Persisted state could not be read or decoded.
  Storage,
}

impl ErrorKind {
  pub fn as_str(self) -> &'static str {
    match self {
      ErrorKind::Validation => "validation",
      ErrorKind::Permission => "permission",
      ErrorKind::Conflict => "conflict",
      ErrorKind::NotFound => "not_found",
      ErrorKind::Resource => "resource",
      ErrorKind::BuildFailed => "build_failed",
      ErrorKind::BuildTimeout => "build_timeout",
      ErrorKind::Storage => "storage",
    }
  }
}

impl fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Implemented by every error enum in the crate.
pub trait Categorized {
  fn kind(&self) -> ErrorKind;
}
