//! On-disk revision records: `revisions/<package>/<number>.json`.
//!
//! The store itself does no locking. Callers that read-modify-write hold the
//! package lock from [`RevisionStore::lock`] across the whole sequence.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

use super::types::{Revision, RevisionError, RevisionKey};
use crate::package::PackageId;
use crate::store_lock::{LockMode, StoreLock};
use crate::util::fsio::{PersistError, read_json, write_json};

#[derive(Debug, Clone)]
pub struct RevisionStore {
  dir: PathBuf,
}

impl RevisionStore {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    RevisionStore { dir: dir.into() }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  fn package_dir(&self, package: PackageId) -> PathBuf {
    self.dir.join(package.to_string())
  }

  fn record_path(&self, key: RevisionKey) -> PathBuf {
    self.package_dir(key.package).join(format!("{}.json", key.number))
  }

  /// Exclusive lock serializing every mutation of one package's history.
  pub fn lock(&self, package: PackageId, command: &str) -> Result<StoreLock, RevisionError> {
    let path = self.package_dir(package).join(".lock");
    Ok(StoreLock::acquire(&path, LockMode::Exclusive, command)?)
  }

  pub fn get(&self, key: RevisionKey) -> Result<Option<Revision>, RevisionError> {
    Ok(read_json(&self.record_path(key))?)
  }

  pub fn require(&self, key: RevisionKey) -> Result<Revision, RevisionError> {
    self.get(key)?.ok_or(RevisionError::NotFound(key))
  }

  /// Revision numbers of `package`, ascending.
  pub fn numbers(&self, package: PackageId) -> Result<Vec<u32>, RevisionError> {
    let dir = self.package_dir(package);
    let entries = match fs::read_dir(&dir) {
      Ok(entries) => entries,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
      Err(source) => return Err(PersistError::Read { path: dir, source }.into()),
    };

    let mut numbers: Vec<u32> = entries
      .flatten()
      .filter_map(|entry| {
        let name = entry.file_name();
        name.to_str()?.strip_suffix(".json")?.parse().ok()
      })
      .collect();
    numbers.sort_unstable();
    Ok(numbers)
  }

  pub fn newest_number(&self, package: PackageId) -> Result<Option<u32>, RevisionError> {
    Ok(self.numbers(package)?.last().copied())
  }

  pub fn newest(&self, package: PackageId) -> Result<Revision, RevisionError> {
    let number = self.newest_number(package)?.ok_or(RevisionError::Empty(package))?;
    self.require(RevisionKey::new(package, number))
  }

  /// Every revision of `package`, oldest first.
  pub fn list(&self, package: PackageId) -> Result<Vec<Revision>, RevisionError> {
    self
      .numbers(package)?
      .into_iter()
      .map(|n| self.require(RevisionKey::new(package, n)))
      .collect()
  }

  /// Writes a revision that must not exist yet.
  pub fn insert(&self, revision: &Revision) -> Result<(), RevisionError> {
    let path = self.record_path(revision.key());
    if path.exists() {
      return Err(RevisionError::Exists(revision.key()));
    }
    write_json(&path, revision)?;
    Ok(())
  }

  /// Overwrites an existing revision.
  pub fn save(&self, revision: &Revision) -> Result<(), RevisionError> {
    write_json(&self.record_path(revision.key()), revision)?;
    Ok(())
  }

  /// Deletes every revision of `package`. Only used to undo a package whose
  /// record never got written.
  pub fn discard(&self, package: PackageId) {
    let dir = self.package_dir(package);
    match fs::remove_dir_all(&dir) {
      Ok(()) => {}
      Err(e) if e.kind() == io::ErrorKind::NotFound => {}
      Err(e) => warn!(path = %dir.display(), error = %e, "failed to discard revisions"),
    }
  }

  /// Ids of every package that has a revision directory.
  pub fn packages(&self) -> Result<Vec<PackageId>, RevisionError> {
    let entries = match fs::read_dir(&self.dir) {
      Ok(entries) => entries,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
      Err(source) => {
        return Err(
          PersistError::Read {
            path: self.dir.clone(),
            source,
          }
          .into(),
        );
      }
    };

    let mut ids: Vec<PackageId> = entries
      .flatten()
      .filter_map(|entry| entry.file_name().to_str()?.parse().ok())
      .collect();
    ids.sort();
    Ok(ids)
  }
}
