//! Runtime configuration, read from `FLIGHTDECK_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::build::{BuildEnvironment, WorkspaceRegistry};
use crate::consts::{DEFAULT_BUILD_TIMEOUT_SECS, env};
use crate::error::{Categorized, ErrorKind};
use crate::package::PackageId;
use crate::platform::paths::{store_dir, workspaces_dir};
use crate::revision::RevisionGraph;

pub const DEFAULT_TOOLCHAIN: &str = "cfx";

#[derive(Debug, Error)]
#[error("invalid {var}={value:?}: {reason}")]
pub struct ConfigError {
  pub var: &'static str,
  pub value: String,
  pub reason: String,
}

impl Categorized for ConfigError {
  fn kind(&self) -> ErrorKind {
    ErrorKind::Validation
  }
}

#[derive(Debug, Clone)]
pub struct Config {
  pub store_root: PathBuf,
  pub workspaces: PathBuf,
  pub toolchain: PathBuf,
  pub build_timeout: Duration,
  pub debug: bool,
  pub core_library: Option<PackageId>,
}

impl Config {
  pub fn from_env() -> Result<Self, ConfigError> {
    let toolchain = std::env::var(env::TOOLCHAIN)
      .ok()
      .filter(|v| !v.is_empty())
      .unwrap_or_else(|| DEFAULT_TOOLCHAIN.to_string());

    let build_timeout = match std::env::var(env::BUILD_TIMEOUT) {
      Ok(value) if !value.is_empty() => parse_timeout(&value).ok_or_else(|| ConfigError {
        var: env::BUILD_TIMEOUT,
        value,
        reason: "expected seconds or a duration like \"2m\"".to_string(),
      })?,
      _ => Duration::from_secs(DEFAULT_BUILD_TIMEOUT_SECS),
    };

    let debug = match std::env::var(env::DEBUG) {
      Ok(value) => parse_bool(&value).ok_or_else(|| ConfigError {
        var: env::DEBUG,
        value,
        reason: "expected a boolean".to_string(),
      })?,
      Err(_) => false,
    };

    let core_library = match std::env::var(env::CORE_LIBRARY) {
      Ok(value) if !value.is_empty() => Some(value.parse().map_err(|e: std::num::ParseIntError| ConfigError {
        var: env::CORE_LIBRARY,
        value,
        reason: e.to_string(),
      })?),
      _ => None,
    };

    Ok(Config {
      store_root: store_dir(),
      workspaces: workspaces_dir(),
      toolchain: PathBuf::from(toolchain),
      build_timeout,
      debug,
      core_library,
    })
  }

  pub fn graph(&self) -> RevisionGraph {
    RevisionGraph::open(&self.store_root).with_core_library(self.core_library)
  }

  pub fn registry(&self) -> WorkspaceRegistry {
    WorkspaceRegistry::new(&self.workspaces)
  }

  pub fn build_environment(&self) -> BuildEnvironment {
    BuildEnvironment::new(&self.toolchain)
      .inherit_path()
      .with_timeout(self.build_timeout)
      .with_debug(self.debug)
  }
}

fn parse_timeout(value: &str) -> Option<Duration> {
  let value = value.trim();
  value
    .parse::<u64>()
    .ok()
    .map(Duration::from_secs)
    .or_else(|| humantime::parse_duration(value).ok())
    .filter(|d| !d.is_zero())
}

fn parse_bool(value: &str) -> Option<bool> {
  match value.trim().to_ascii_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Some(true),
    "" | "0" | "false" | "no" | "off" => Some(false),
    _ => None,
  }
}
