use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use super::workspace::WorkspaceId;
use crate::consts::DEFAULT_BUILD_TIMEOUT_SECS;
use crate::error::{Categorized, ErrorKind};
use crate::package::PackageId;
use crate::revision::{RevisionError, RevisionKey};
use crate::util::fsio::PersistError;

/// Everything the invoker needs to know about the compiler. Passed in
/// explicitly; nothing here is read from or written to process-wide state
/// at build time.
#[derive(Debug, Clone)]
pub struct BuildEnvironment {
  /// Compiler binary: a path, or a bare name looked up in `env["PATH"]`.
  pub toolchain: PathBuf,
  /// Arguments placed between the toolchain and `--binary`.
  pub args: Vec<String>,
  pub timeout: Duration,
  /// Keep workspaces of failed builds for inspection.
  pub debug: bool,
  /// The child's complete environment.
  pub env: BTreeMap<String, String>,
}

impl BuildEnvironment {
  pub fn new(toolchain: impl Into<PathBuf>) -> Self {
    BuildEnvironment {
      toolchain: toolchain.into(),
      args: vec!["xpi".to_string()],
      timeout: Duration::from_secs(DEFAULT_BUILD_TIMEOUT_SECS),
      debug: false,
      env: BTreeMap::new(),
    }
  }

  /// Carries the caller's `PATH` into the child environment so bare
  /// toolchain names resolve.
  pub fn inherit_path(mut self) -> Self {
    if let Ok(path) = std::env::var("PATH") {
      self.env.insert("PATH".to_string(), path);
    }
    self
  }

  pub fn with_args(mut self, args: Vec<String>) -> Self {
    self.args = args;
    self
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn with_debug(mut self, debug: bool) -> Self {
    self.debug = debug;
    self
  }

  pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.insert(key.into(), value.into());
    self
  }
}

/// A finished toolchain run whose workspace was kept.
#[derive(Debug, Clone, Serialize)]
pub struct BuildResult {
  pub workspace: WorkspaceId,
  pub revision: RevisionKey,
  /// `"<full name> (<version>)"`, for display.
  pub addon_name: String,
  /// Name under which the artifact can be downloaded.
  pub package_name: String,
  pub artifact_path: PathBuf,
  pub artifact_present: bool,
  pub stdout: String,
  pub stderr: String,
  /// Exit status of the toolchain; informational, it does not decide success.
  pub code: Option<i32>,
  /// False only for a debug-mode build that wrote to stderr.
  pub success: bool,
}

#[derive(Debug, Error)]
pub enum BuildError {
  #[error(transparent)]
  Revision(#[from] RevisionError),

  #[error("package {0} is a library; libraries cannot be built")]
  NotBuildable(PackageId),

  #[error("revision {0} has no main module")]
  MissingEntryPoint(RevisionKey),

  #[error("toolchain {path} not found")]
  ToolchainNotFound { path: PathBuf },

  #[error("toolchain {path} is not executable")]
  ToolchainNotExecutable { path: PathBuf },

  #[error("failed to start toolchain {path}: {source}")]
  Spawn {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("could not allocate a workspace after {attempts} attempts")]
  WorkspaceCollision { attempts: usize },

  #[error("failed to prepare workspace {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("build of {revision} failed in workspace {workspace}:\n{stderr}")]
  Failed {
    workspace: WorkspaceId,
    revision: RevisionKey,
    code: Option<i32>,
    stdout: String,
    stderr: String,
  },

  #[error("build of {revision} timed out after {}", humantime::format_duration(*after))]
  Timeout { revision: RevisionKey, after: Duration },

  #[error("build task ended without reporting a result")]
  Abandoned,

  #[error("invalid workspace id {0:?}")]
  InvalidWorkspaceId(String),

  #[error("invalid artifact name {0:?}")]
  InvalidArtifactName(String),

  #[error("no artifact {name}.xpi in workspace {workspace}")]
  ArtifactNotFound { workspace: WorkspaceId, name: String },

  #[error(transparent)]
  Persist(#[from] PersistError),
}

impl Categorized for BuildError {
  fn kind(&self) -> ErrorKind {
    match self {
      BuildError::Revision(e) => e.kind(),
      BuildError::Persist(e) => e.kind(),
      BuildError::NotBuildable(_)
      | BuildError::MissingEntryPoint(_)
      | BuildError::InvalidWorkspaceId(_)
      | BuildError::InvalidArtifactName(_) => ErrorKind::Validation,
      BuildError::ToolchainNotFound { .. }
      | BuildError::ToolchainNotExecutable { .. }
      | BuildError::Spawn { .. }
      | BuildError::WorkspaceCollision { .. }
      | BuildError::Io { .. }
      | BuildError::Abandoned => ErrorKind::Resource,
      BuildError::Failed { .. } => ErrorKind::BuildFailed,
      BuildError::Timeout { .. } => ErrorKind::BuildTimeout,
      BuildError::ArtifactNotFound { .. } => ErrorKind::NotFound,
    }
  }
}

/// Bytes of a built artifact plus the headers to serve them with.
#[derive(Debug, Clone)]
pub struct Artifact {
  pub filename: String,
  pub bytes: Vec<u8>,
  pub content_type: &'static str,
  pub content_disposition: Option<String>,
}
