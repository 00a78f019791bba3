//! Per-invocation state shared by every command: configuration, the acting
//! user and revision selection.

use anyhow::{Context, Result, anyhow};
use clap::Args;

use flightdeck_lib::config::Config;
use flightdeck_lib::consts::env;
use flightdeck_lib::package::{PackageId, UserId};
use flightdeck_lib::revision::{RevisionGraph, RevisionKey};

pub struct Session {
  pub config: Config,
  user: Option<UserId>,
}

impl Session {
  pub fn load(user: Option<String>) -> Result<Self> {
    let config = Config::from_env().context("Invalid configuration")?;
    let user = user.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());
    Ok(Session {
      config,
      user: user.map(UserId::from),
    })
  }

  pub fn graph(&self) -> RevisionGraph {
    self.config.graph()
  }

  /// The user commands that change state act as.
  pub fn actor(&self) -> Result<&UserId> {
    self
      .user
      .as_ref()
      .ok_or_else(|| anyhow!("No acting user: pass --user or set {}", env::USER))
  }
}

/// A package plus an optional revision number.
#[derive(Args, Debug, Clone, Copy)]
pub struct Target {
  /// Package id
  pub package: PackageId,

  /// Revision number (defaults to the newest; edits default to the working revision)
  #[arg(short, long)]
  pub revision: Option<u32>,
}

impl Target {
  /// Revision to read: the one asked for, else the newest.
  pub fn read_key(&self, graph: &RevisionGraph) -> Result<RevisionKey> {
    match self.revision {
      Some(number) => Ok(RevisionKey::new(self.package, number)),
      None => Ok(graph.newest(self.package)?.key()),
    }
  }

  /// Revision to edit: the one asked for, else the working revision, which
  /// branches a fresh one when the newest is released.
  pub fn edit_key(&self, graph: &RevisionGraph, actor: &UserId) -> Result<RevisionKey> {
    match self.revision {
      Some(number) => Ok(RevisionKey::new(self.package, number)),
      None => Ok(graph.working_revision(self.package, actor)?.key()),
    }
  }
}
