use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{Categorized, ErrorKind};
use crate::store_lock::StoreLockError;
use crate::util::fsio::PersistError;

/// Numeric package identity, allocated monotonically by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageId(pub u64);

impl fmt::Display for PackageId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl FromStr for PackageId {
  type Err = std::num::ParseIntError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    s.parse().map(PackageId)
  }
}

/// An author reference. Authentication happens elsewhere; this crate only
/// compares identities.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl From<String> for UserId {
  fn from(s: String) -> Self {
    UserId(s)
  }
}

impl From<&str> for UserId {
  fn from(s: &str) -> Self {
    UserId(s.to_string())
  }
}

impl AsRef<str> for UserId {
  fn as_ref(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// What a package is. Per-kind behaviour lives here instead of being
/// re-derived at each call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
  Addon,
  Library,
}

impl PackageKind {
  pub fn as_str(self) -> &'static str {
    match self {
      PackageKind::Addon => "addon",
      PackageKind::Library => "library",
    }
  }

  pub fn plural(self) -> &'static str {
    match self {
      PackageKind::Addon => "addons",
      PackageKind::Library => "libraries",
    }
  }

  /// Only addons compile to an installable artifact.
  pub fn is_buildable(self) -> bool {
    matches!(self, PackageKind::Addon)
  }

  /// Addons select exactly one SDK per revision; libraries never do.
  pub fn requires_sdk(self) -> bool {
    matches!(self, PackageKind::Addon)
  }

  /// Addon builds pull in the core library implicitly.
  pub fn injects_core_library(self) -> bool {
    matches!(self, PackageKind::Addon)
  }

  /// Only libraries may be the target of a dependency edge.
  pub fn can_be_dependency(self) -> bool {
    matches!(self, PackageKind::Library)
  }
}

impl fmt::Display for PackageKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for PackageKind {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "addon" | "add-on" | "a" => Ok(PackageKind::Addon),
      "library" | "lib" | "l" => Ok(PackageKind::Library),
      other => Err(format!("unknown package kind '{}' (expected addon or library)", other)),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
  pub id: PackageId,
  pub kind: PackageKind,
  /// Human-readable name, unique per (author, kind) among active packages.
  pub full_name: String,
  /// Slug of `full_name`; names the artifact and the manifest entry.
  pub name: String,
  #[serde(default)]
  pub description: String,
  pub author: UserId,
  pub active: bool,
  pub created_at: u64,
}

impl Package {
  pub fn is_authored_by(&self, user: &UserId) -> bool {
    &self.author == user
  }

  /// Name given to a copy of this package.
  pub fn copied_full_name(&self) -> String {
    format!("{} (copy)", self.full_name)
  }
}

/// Query parameters for [`crate::package::Catalog::list`].
#[derive(Debug, Clone, Default)]
pub struct PackageFilter {
  pub kind: Option<PackageKind>,
  pub author: Option<UserId>,
  pub include_disabled: bool,
}

impl PackageFilter {
  pub fn matches(&self, package: &Package) -> bool {
    if !self.include_disabled && !package.active {
      return false;
    }
    if let Some(kind) = self.kind
      && package.kind != kind
    {
      return false;
    }
    if let Some(author) = &self.author
      && &package.author != author
    {
      return false;
    }
    true
  }
}

#[derive(Debug, Error)]
pub enum PackageError {
  #[error("package {0} not found")]
  NotFound(PackageId),

  #[error("invalid package name {name:?}: {reason}")]
  InvalidName { name: String, reason: String },

  #[error("you already have an active {kind} named {full_name:?} (package {existing})")]
  NameTaken {
    kind: PackageKind,
    full_name: String,
    existing: PackageId,
  },

  #[error("{user} is not the author of package {id}")]
  NotAuthor { user: UserId, id: PackageId },

  #[error(transparent)]
  Persist(#[from] PersistError),

  #[error(transparent)]
  Lock(#[from] StoreLockError),
}

impl Categorized for PackageError {
  fn kind(&self) -> ErrorKind {
    match self {
      PackageError::NotFound(_) => ErrorKind::NotFound,
      PackageError::InvalidName { .. } => ErrorKind::Validation,
      PackageError::NameTaken { .. } => ErrorKind::Conflict,
      PackageError::NotAuthor { .. } => ErrorKind::Permission,
      PackageError::Persist(e) => e.kind(),
      PackageError::Lock(e) => e.kind(),
    }
  }
}
