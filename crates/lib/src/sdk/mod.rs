//! SDK registry.
//!
//! An SDK selects which toolchain runtime an addon is built against. The
//! registry is a single `sdks.json` list; ids count up from 1 and the
//! highest id is the newest SDK.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::error::{Categorized, ErrorKind};
use crate::store_lock::{LockMode, StoreLock, StoreLockError};
use crate::util::fsio::{PersistError, read_json, write_json};
use crate::util::validate::{ALPHANUM_PLUS_MESSAGE, is_alphanum_plus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SdkId(pub u32);

impl fmt::Display for SdkId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl FromStr for SdkId {
  type Err = std::num::ParseIntError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    s.parse().map(SdkId)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sdk {
  pub id: SdkId,
  pub name: String,
  pub version: String,
  /// Runtime binary handed to the toolchain as `--binary`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub interpreter: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum SdkError {
  #[error("sdk {0} not found")]
  NotFound(SdkId),

  #[error("sdk {name} {version} is already registered as {existing}")]
  Duplicate {
    name: String,
    version: String,
    existing: SdkId,
  },

  #[error("invalid sdk {field} {value:?}: {}", ALPHANUM_PLUS_MESSAGE)]
  Invalid { field: &'static str, value: String },

  #[error(transparent)]
  Persist(#[from] PersistError),

  #[error(transparent)]
  Lock(#[from] StoreLockError),
}

impl Categorized for SdkError {
  fn kind(&self) -> ErrorKind {
    match self {
      SdkError::NotFound(_) => ErrorKind::NotFound,
      SdkError::Duplicate { .. } => ErrorKind::Conflict,
      SdkError::Invalid { .. } => ErrorKind::Validation,
      SdkError::Persist(e) => e.kind(),
      SdkError::Lock(e) => e.kind(),
    }
  }
}

#[derive(Debug, Clone)]
pub struct SdkRegistry {
  path: PathBuf,
}

impl SdkRegistry {
  pub fn new(root: &Path) -> Self {
    SdkRegistry {
      path: root.join("sdks.json"),
    }
  }

  pub fn list(&self) -> Result<Vec<Sdk>, SdkError> {
    let mut sdks: Vec<Sdk> = read_json(&self.path)?.unwrap_or_default();
    sdks.sort_by_key(|s| s.id);
    Ok(sdks)
  }

  pub fn get(&self, id: SdkId) -> Result<Option<Sdk>, SdkError> {
    Ok(self.list()?.into_iter().find(|s| s.id == id))
  }

  pub fn require(&self, id: SdkId) -> Result<Sdk, SdkError> {
    self.get(id)?.ok_or(SdkError::NotFound(id))
  }

  pub fn newest(&self) -> Result<Option<Sdk>, SdkError> {
    Ok(self.list()?.pop())
  }

  pub fn register(&self, name: &str, version: &str, interpreter: Option<PathBuf>) -> Result<Sdk, SdkError> {
    for (field, value) in [("name", name), ("version", version)] {
      if !is_alphanum_plus(value) {
        return Err(SdkError::Invalid {
          field,
          value: value.to_string(),
        });
      }
    }

    let lock_path = self.path.with_file_name(".sdks.lock");
    let _lock = StoreLock::acquire(&lock_path, LockMode::Exclusive, "sdk register")?;

    let mut sdks = self.list()?;
    if let Some(existing) = sdks.iter().find(|s| s.name == name && s.version == version) {
      return Err(SdkError::Duplicate {
        name: name.to_string(),
        version: version.to_string(),
        existing: existing.id,
      });
    }

    let sdk = Sdk {
      id: SdkId(sdks.last().map(|s| s.id.0 + 1).unwrap_or(1)),
      name: name.to_string(),
      version: version.to_string(),
      interpreter,
    };
    sdks.push(sdk.clone());
    write_json(&self.path, &sdks)?;

    info!(sdk = %sdk.id, name = %sdk.name, version = %sdk.version, "sdk registered");
    Ok(sdk)
  }
}
