//! Module sources and uploaded attachment bytes.
//!
//! Sources are content-addressed: `content/<sha256>`, written once and never
//! modified, so any number of revisions can point at the same blob and a
//! branch copies only hashes. Uploads live in a flat `uploads/` directory
//! under collision-proof names:
//! `<package-id>_<timestamp>_<token>_<filename>.<ext>`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Categorized, ErrorKind};
use crate::package::PackageId;
use crate::store_lock::{LockMode, StoreLock, StoreLockError};
use crate::util::fsio::{PersistError, write_atomic};
use crate::util::hash::{ContentHash, hash_bytes};
use crate::util::unix_now;
use crate::util::validate::slugify;

#[derive(Debug, Error)]
pub enum ContentError {
  #[error("content {0} is missing from the store")]
  MissingSource(ContentHash),

  #[error("content {hash} is not valid UTF-8")]
  NotUtf8 { hash: ContentHash },

  #[error("upload {0:?} not found")]
  MissingUpload(String),

  #[error("invalid upload name {name:?}: {reason}")]
  InvalidName { name: String, reason: &'static str },

  #[error("failed to access {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error(transparent)]
  Persist(#[from] PersistError),
}

impl Categorized for ContentError {
  fn kind(&self) -> ErrorKind {
    match self {
      ContentError::MissingSource(_) | ContentError::NotUtf8 { .. } => ErrorKind::Storage,
      ContentError::MissingUpload(_) => ErrorKind::NotFound,
      ContentError::InvalidName { .. } => ErrorKind::Validation,
      ContentError::Io { .. } => ErrorKind::Resource,
      ContentError::Persist(e) => e.kind(),
    }
  }
}

/// The result of storing an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
  /// Slugified stem of the uploaded name.
  pub filename: String,
  /// Lowercased extension, empty when the upload had none.
  pub ext: String,
  /// Name of the stored file inside the upload directory.
  pub path: String,
  pub digest: ContentHash,
  pub size: u64,
}

/// A blob found on disk, as seen by the janitor.
#[derive(Debug, Clone)]
pub struct StoredBlob {
  pub path: PathBuf,
  pub hash: Option<ContentHash>,
  pub upload_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ContentStore {
  sources: PathBuf,
  uploads: PathBuf,
}

impl ContentStore {
  pub fn new(root: &Path) -> Self {
    ContentStore {
      sources: root.join("content"),
      uploads: root.join("uploads"),
    }
  }

  pub fn uploads_dir(&self) -> &Path {
    &self.uploads
  }

  pub fn source_path(&self, hash: &ContentHash) -> PathBuf {
    self.sources.join(hash.as_str())
  }

  /// Store-wide lock over blob liveness. Writers that store content and
  /// then save a revision referring to it hold it shared across both
  /// steps; the janitor holds it exclusively while it sweeps.
  pub fn lock(&self, mode: LockMode, command: &str) -> Result<StoreLock, StoreLockError> {
    StoreLock::acquire(&self.sources.with_extension("lock"), mode, command)
  }

  /// Stores a module source and returns its hash. Storing a source that is
  /// already present only refreshes its modification time.
  pub fn put_source(&self, source: &str) -> Result<ContentHash, ContentError> {
    let hash = hash_bytes(source.as_bytes());
    let path = self.source_path(&hash);

    match fs::File::options().append(true).open(&path) {
      Ok(file) => {
        file
          .set_modified(std::time::SystemTime::now())
          .map_err(|source| ContentError::Io { path, source })?;
      }
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        write_atomic(&path, source.as_bytes())?;
        debug!(hash = %hash, bytes = source.len(), "stored module source");
      }
      Err(source) => return Err(ContentError::Io { path, source }),
    }
    Ok(hash)
  }

  pub fn get_source(&self, hash: &ContentHash) -> Result<String, ContentError> {
    let path = self.source_path(hash);
    let bytes = match fs::read(&path) {
      Ok(bytes) => bytes,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ContentError::MissingSource(hash.clone())),
      Err(source) => return Err(ContentError::Io { path, source }),
    };
    String::from_utf8(bytes).map_err(|_| ContentError::NotUtf8 { hash: hash.clone() })
  }

  /// Copies uploaded bytes into the upload directory.
  pub fn store_upload(&self, package: PackageId, original: &str, bytes: &[u8]) -> Result<StoredUpload, ContentError> {
    let (filename, ext) = split_upload_name(original)?;
    let token = Uuid::new_v4().simple().to_string();

    let path = if ext.is_empty() {
      format!("{}_{}_{}_{}", package, unix_now(), token, filename)
    } else {
      format!("{}_{}_{}_{}.{}", package, unix_now(), token, filename, ext)
    };

    write_atomic(&self.uploads.join(&path), bytes)?;
    debug!(package = %package, path = %path, bytes = bytes.len(), "stored upload");

    Ok(StoredUpload {
      filename,
      ext,
      path,
      digest: hash_bytes(bytes),
      size: bytes.len() as u64,
    })
  }

  /// Resolves a stored upload name to its path, rejecting anything that could
  /// escape the upload directory.
  pub fn upload_path(&self, stored: &str) -> Result<PathBuf, ContentError> {
    let invalid = |reason| ContentError::InvalidName {
      name: stored.to_string(),
      reason,
    };
    if stored.is_empty() || stored.starts_with('.') {
      return Err(invalid("name must not be empty or hidden"));
    }
    if stored.contains(['/', '\\', '\0']) {
      return Err(invalid("name must not contain path separators"));
    }
    Ok(self.uploads.join(stored))
  }

  pub fn read_upload(&self, stored: &str) -> Result<Vec<u8>, ContentError> {
    let path = self.upload_path(stored)?;
    match fs::read(&path) {
      Ok(bytes) => Ok(bytes),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ContentError::MissingUpload(stored.to_string())),
      Err(source) => Err(ContentError::Io { path, source }),
    }
  }

  /// Every stored source and upload, for reference sweeps.
  pub fn blobs(&self) -> Result<Vec<StoredBlob>, ContentError> {
    let mut blobs = Vec::new();

    for entry in read_dir_or_empty(&self.sources)? {
      let name = entry.file_name().to_string_lossy().to_string();
      if name.starts_with('.') {
        continue;
      }
      blobs.push(StoredBlob {
        path: entry.path(),
        hash: ContentHash::parse(&name),
        upload_name: None,
      });
    }

    for entry in read_dir_or_empty(&self.uploads)? {
      let name = entry.file_name().to_string_lossy().to_string();
      if name.starts_with('.') {
        continue;
      }
      blobs.push(StoredBlob {
        path: entry.path(),
        hash: None,
        upload_name: Some(name),
      });
    }

    Ok(blobs)
  }
}

fn read_dir_or_empty(dir: &Path) -> Result<Vec<fs::DirEntry>, ContentError> {
  match fs::read_dir(dir) {
    Ok(entries) => Ok(entries.flatten().collect()),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
    Err(source) => Err(ContentError::Io {
      path: dir.to_path_buf(),
      source,
    }),
  }
}

/// Splits an uploaded name into a slugified stem and a lowercase extension.
pub fn split_upload_name(original: &str) -> Result<(String, String), ContentError> {
  let base = original.rsplit(['/', '\\']).next().unwrap_or(original);

  let (stem, ext) = match base.rsplit_once('.') {
    Some((stem, ext)) if !stem.is_empty() => (stem, ext),
    _ => (base, ""),
  };

  let filename = slugify(stem);
  if filename.is_empty() {
    return Err(ContentError::InvalidName {
      name: original.to_string(),
      reason: "name must contain at least one letter or digit",
    });
  }

  let ext = ext.to_ascii_lowercase();
  if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
    return Err(ContentError::InvalidName {
      name: original.to_string(),
      reason: "extension may only contain letters and digits",
    });
  }

  Ok((filename, ext))
}
