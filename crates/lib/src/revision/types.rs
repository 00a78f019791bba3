use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::content::ContentError;
use crate::error::{Categorized, ErrorKind};
use crate::package::{PackageError, PackageId, UserId};
use crate::sdk::{SdkError, SdkId};
use crate::store_lock::StoreLockError;
use crate::util::fsio::PersistError;
use crate::util::hash::ContentHash;
use crate::util::validate::ALPHANUM_PLUS_SPACE_MESSAGE;

/// Identity of a revision: `(package id, revision number)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RevisionKey {
  pub package: PackageId,
  pub number: u32,
}

impl RevisionKey {
  pub fn new(package: PackageId, number: u32) -> Self {
    RevisionKey { package, number }
  }
}

impl fmt::Display for RevisionKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}@{}", self.package, self.number)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRef {
  pub filename: String,
  pub author: UserId,
  pub content: ContentHash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
  pub filename: String,
  #[serde(default)]
  pub ext: String,
  /// Stored name inside the upload directory.
  pub path: String,
  pub author: UserId,
  pub digest: ContentHash,
  #[serde(default)]
  pub size: u64,
}

impl AttachmentRef {
  /// `<filename>.<ext>`, or just the filename when there is no extension.
  pub fn display_name(&self) -> String {
    if self.ext.is_empty() {
      self.filename.clone()
    } else {
      format!("{}.{}", self.filename, self.ext)
    }
  }
}

/// An edge from the owning revision to a pinned library revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
  pub package: PackageId,
  pub revision: u32,
  /// The library's name when the edge was added; written to the manifest.
  pub name: String,
}

impl DependencyEdge {
  pub fn target(&self) -> RevisionKey {
    RevisionKey::new(self.package, self.revision)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
  pub package: PackageId,
  pub number: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub version_name: Option<String>,
  #[serde(default)]
  pub message: String,
  pub author: UserId,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sdk: Option<SdkId>,
  #[serde(default)]
  pub modules: Vec<ModuleRef>,
  #[serde(default)]
  pub attachments: Vec<AttachmentRef>,
  #[serde(default)]
  pub dependencies: Vec<DependencyEdge>,
  pub created_at: u64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub origin: Option<RevisionKey>,
}

impl Revision {
  pub fn key(&self) -> RevisionKey {
    RevisionKey::new(self.package, self.number)
  }

  /// A revision with a version name is immutable for structural edits.
  pub fn is_released(&self) -> bool {
    self.version_name.is_some()
  }

  pub fn module(&self, filename: &str) -> Option<&ModuleRef> {
    self.modules.iter().find(|m| m.filename == filename)
  }

  pub fn attachment(&self, name: &str) -> Option<&AttachmentRef> {
    self.attachments.iter().find(|a| a.display_name() == name)
  }

  pub fn dependency(&self, package: PackageId) -> Option<&DependencyEdge> {
    self.dependencies.iter().find(|d| d.package == package)
  }
}

/// Which revision of a library a new dependency edge should point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LibraryPin {
  #[default]
  Newest,
  NewestReleased,
  Exact(u32),
}

#[derive(Debug, Error)]
pub enum RevisionError {
  #[error(transparent)]
  Package(#[from] PackageError),

  #[error("revision {0} not found")]
  NotFound(RevisionKey),

  #[error("package {0} has no revisions")]
  Empty(PackageId),

  #[error("package {package} has no revision named {version:?}")]
  VersionNotFound { package: PackageId, version: String },

  #[error("package {0} has no released revision")]
  NoRelease(PackageId),

  #[error("invalid version name {name:?}: {}", ALPHANUM_PLUS_SPACE_MESSAGE)]
  InvalidVersionName { name: String },

  #[error("version {version:?} is already used by revision {existing}")]
  VersionTaken { version: String, existing: RevisionKey },

  #[error("revision {key} is already released as {current:?}")]
  AlreadyReleased { key: RevisionKey, current: String },

  #[error("revision {key} is released as {version:?}; branch it before editing")]
  Released { key: RevisionKey, version: String },

  #[error("revision {key} is stale; the newest revision is {newest}")]
  Stale { key: RevisionKey, newest: u32 },

  #[error("{user} is not the author of revision {key}")]
  NotAuthor { user: UserId, key: RevisionKey },

  #[error("revision {0} already exists")]
  Exists(RevisionKey),

  #[error("invalid filename {0:?}: must contain at least one letter or digit")]
  InvalidFilename(String),

  #[error("revision {key} already has a module named {filename:?}")]
  DuplicateModule { key: RevisionKey, filename: String },

  #[error("revision {key} has no module named {filename:?}")]
  ModuleNotFound { key: RevisionKey, filename: String },

  #[error("revision {key} already has an attachment named {name:?}")]
  DuplicateAttachment { key: RevisionKey, name: String },

  #[error("revision {key} has no attachment named {name:?}")]
  AttachmentNotFound { key: RevisionKey, name: String },

  #[error("revision {key} already depends on package {package}")]
  DuplicateDependency { key: RevisionKey, package: PackageId },

  #[error("revision {key} does not depend on package {package}")]
  DependencyNotFound { key: RevisionKey, package: PackageId },

  #[error("package {0} cannot depend on itself")]
  SelfDependency(PackageId),

  #[error("package {0} is disabled")]
  Disabled(PackageId),

  #[error("package {0} is not a library")]
  NotALibrary(PackageId),

  #[error("package {0} is a library; libraries have no sdk")]
  SdkNotAllowed(PackageId),

  #[error("package {0} is a library; libraries cannot be built")]
  NotBuildable(PackageId),

  #[error(transparent)]
  Sdk(#[from] SdkError),

  #[error(transparent)]
  Content(#[from] ContentError),

  #[error(transparent)]
  Persist(#[from] PersistError),

  #[error(transparent)]
  Lock(#[from] StoreLockError),
}

impl Categorized for RevisionError {
  fn kind(&self) -> ErrorKind {
    use RevisionError::*;

    match self {
      Package(e) => e.kind(),
      Sdk(e) => e.kind(),
      Content(e) => e.kind(),
      Persist(e) => e.kind(),
      Lock(e) => e.kind(),
      NotFound(_)
      | Empty(_)
      | VersionNotFound { .. }
      | NoRelease(_)
      | ModuleNotFound { .. }
      | AttachmentNotFound { .. }
      | DependencyNotFound { .. } => ErrorKind::NotFound,
      InvalidVersionName { .. }
      | InvalidFilename(_)
      | SelfDependency(_)
      | Disabled(_)
      | NotALibrary(_)
      | SdkNotAllowed(_)
      | NotBuildable(_) => ErrorKind::Validation,
      VersionTaken { .. }
      | AlreadyReleased { .. }
      | Released { .. }
      | Stale { .. }
      | Exists(_)
      | DuplicateModule { .. }
      | DuplicateAttachment { .. }
      | DuplicateDependency { .. } => ErrorKind::Conflict,
      NotAuthor { .. } => ErrorKind::Permission,
    }
  }
}
