//! JSON records on disk.
//!
//! Writes go to a sibling temp file that is renamed over the target, so a
//! reader never observes a half-written record.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use crate::error::{Categorized, ErrorKind};

#[derive(Debug, Error)]
pub enum PersistError {
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to serialize record: {0}")]
  Serialize(#[source] serde_json::Error),
}

impl Categorized for PersistError {
  fn kind(&self) -> ErrorKind {
    match self {
      PersistError::Write { .. } => ErrorKind::Resource,
      _ => ErrorKind::Storage,
    }
  }
}

/// Loads a JSON record. A missing file is `Ok(None)`, not an error.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, PersistError> {
  let content = match fs::read_to_string(path) {
    Ok(content) => content,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
    Err(source) => {
      return Err(PersistError::Read {
        path: path.to_path_buf(),
        source,
      });
    }
  };

  serde_json::from_str(&content).map(Some).map_err(|source| PersistError::Parse {
    path: path.to_path_buf(),
    source,
  })
}

/// Writes a JSON record atomically, creating parent directories as needed.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistError> {
  let content = serde_json::to_string_pretty(value).map_err(PersistError::Serialize)?;
  write_atomic(path, content.as_bytes())
}

pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
  let write_err = |source| PersistError::Write {
    path: path.to_path_buf(),
    source,
  };

  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).map_err(write_err)?;
  }

  let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("record");
  let temp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

  fs::write(&temp_path, bytes).map_err(write_err)?;
  if let Err(e) = fs::rename(&temp_path, path) {
    let _ = fs::remove_file(&temp_path);
    return Err(write_err(e));
  }

  Ok(())
}
