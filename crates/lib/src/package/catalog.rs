//! Package records and identity.
//!
//! Each package is one JSON file, `<dir>/<id>.json`. Id allocation, name
//! uniqueness and activation changes all happen under the catalog lock
//! (`<dir>/.lock`) so two concurrent creators never pick the same id or name.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::types::{Package, PackageError, PackageFilter, PackageId, PackageKind, UserId};
use crate::consts::FIRST_PACKAGE_ID;
use crate::store_lock::{LockMode, StoreLock};
use crate::util::fsio::{PersistError, read_json, write_json};
use crate::util::unix_now;
use crate::util::validate::slugify;

const MAX_FULL_NAME_LEN: usize = 255;

#[derive(Debug, Clone)]
pub struct Catalog {
  dir: PathBuf,
}

impl Catalog {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Catalog { dir: dir.into() }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  fn record_path(&self, id: PackageId) -> PathBuf {
    self.dir.join(format!("{}.json", id))
  }

  fn lock(&self, command: &str) -> Result<StoreLock, PackageError> {
    Ok(StoreLock::acquire(&self.dir.join(".lock"), LockMode::Exclusive, command)?)
  }

  pub fn get(&self, id: PackageId) -> Result<Option<Package>, PackageError> {
    Ok(read_json(&self.record_path(id))?)
  }

  pub fn require(&self, id: PackageId) -> Result<Package, PackageError> {
    self.get(id)?.ok_or(PackageError::NotFound(id))
  }

  /// All packages matching `filter`, ordered by id.
  pub fn list(&self, filter: &PackageFilter) -> Result<Vec<Package>, PackageError> {
    let mut packages = Vec::new();
    for id in self.ids()? {
      if let Some(package) = self.get(id)?
        && filter.matches(&package)
      {
        packages.push(package);
      }
    }
    Ok(packages)
  }

  fn ids(&self) -> Result<Vec<PackageId>, PackageError> {
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
      .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
      .filter_map(|entry| {
        let name = entry.file_name();
        let stem = name.to_str()?.strip_suffix(".json")?;
        stem.parse().ok()
      })
      .collect();
    ids.sort();
    Ok(ids)
  }

  /// Allocates an id, runs `init` with the new package, then saves the
  /// package record. The record is written last, so a package becomes visible
  /// only once `init` (which creates its first revision) has succeeded. If
  /// the record cannot be written, `rollback` undoes `init` while the id is
  /// still reserved.
  pub fn create<E>(
    &self,
    author: &UserId,
    kind: PackageKind,
    full_name: &str,
    description: &str,
    init: impl FnOnce(&Package) -> Result<(), E>,
    rollback: impl FnOnce(&Package),
  ) -> Result<Package, E>
  where
    E: From<PackageError>,
  {
    let full_name = validate_full_name(full_name)?;
    let _lock = self.lock("package create")?;

    if let Some(existing) = self.find_active_named(author, kind, &full_name, None)? {
      return Err(
        PackageError::NameTaken {
          kind,
          full_name,
          existing,
        }
        .into(),
      );
    }

    let id = self
      .ids()?
      .last()
      .map(|last| PackageId(last.0 + 1))
      .unwrap_or(PackageId(FIRST_PACKAGE_ID));

    let package = Package {
      id,
      kind,
      name: slugify(&full_name),
      full_name,
      description: description.trim().to_string(),
      author: author.clone(),
      active: true,
      created_at: unix_now(),
    };

    init(&package)?;
    if let Err(e) = write_json(&self.record_path(id), &package) {
      warn!(package = %id, error = %e, "package record not written, rolling back");
      rollback(&package);
      return Err(PackageError::from(e).into());
    }

    info!(package = %id, kind = %kind, name = %package.full_name, author = %author, "package created");
    Ok(package)
  }

  pub fn rename(&self, id: PackageId, actor: &UserId, full_name: &str) -> Result<Package, PackageError> {
    let full_name = validate_full_name(full_name)?;
    let _lock = self.lock("package rename")?;
    let mut package = self.require_owned(id, actor)?;

    if package.full_name == full_name {
      return Ok(package);
    }
    if package.active
      && let Some(existing) = self.find_active_named(actor, package.kind, &full_name, Some(id))?
    {
      return Err(PackageError::NameTaken {
        kind: package.kind,
        full_name,
        existing,
      });
    }

    debug!(package = %id, from = %package.full_name, to = %full_name, "renaming package");
    package.name = slugify(&full_name);
    package.full_name = full_name;
    write_json(&self.record_path(id), &package)?;
    Ok(package)
  }

  pub fn set_description(&self, id: PackageId, actor: &UserId, description: &str) -> Result<Package, PackageError> {
    let _lock = self.lock("package describe")?;
    let mut package = self.require_owned(id, actor)?;
    package.description = description.trim().to_string();
    write_json(&self.record_path(id), &package)?;
    Ok(package)
  }

  /// Hides a package from listings and from use as a new dependency.
  /// Existing dependency edges on it are left alone.
  pub fn disable(&self, id: PackageId, actor: &UserId) -> Result<Package, PackageError> {
    let _lock = self.lock("package disable")?;
    let mut package = self.require_owned(id, actor)?;

    if package.active {
      package.active = false;
      write_json(&self.record_path(id), &package)?;
      info!(package = %id, "package disabled");
    }
    Ok(package)
  }

  /// Re-activates a package. Fails if the author has since created another
  /// active package of the same kind with the same name.
  pub fn activate(&self, id: PackageId, actor: &UserId) -> Result<Package, PackageError> {
    let _lock = self.lock("package activate")?;
    let mut package = self.require_owned(id, actor)?;

    if package.active {
      return Ok(package);
    }
    if let Some(existing) = self.find_active_named(actor, package.kind, &package.full_name, Some(id))? {
      return Err(PackageError::NameTaken {
        kind: package.kind,
        full_name: package.full_name,
        existing,
      });
    }

    package.active = true;
    write_json(&self.record_path(id), &package)?;
    info!(package = %id, "package activated");
    Ok(package)
  }

  fn require_owned(&self, id: PackageId, actor: &UserId) -> Result<Package, PackageError> {
    let package = self.require(id)?;
    if !package.is_authored_by(actor) {
      return Err(PackageError::NotAuthor {
        user: actor.clone(),
        id,
      });
    }
    Ok(package)
  }

  fn find_active_named(
    &self,
    author: &UserId,
    kind: PackageKind,
    full_name: &str,
    except: Option<PackageId>,
  ) -> Result<Option<PackageId>, PackageError> {
    let filter = PackageFilter {
      kind: Some(kind),
      author: Some(author.clone()),
      include_disabled: false,
    };
    Ok(
      self
        .list(&filter)?
        .into_iter()
        .find(|p| p.full_name == full_name && Some(p.id) != except)
        .map(|p| p.id),
    )
  }
}

fn validate_full_name(full_name: &str) -> Result<String, PackageError> {
  let trimmed = full_name.trim();
  let invalid = |reason: &str| PackageError::InvalidName {
    name: full_name.to_string(),
    reason: reason.to_string(),
  };

  if trimmed.is_empty() {
    return Err(invalid("name must not be empty"));
  }
  if trimmed.chars().count() > MAX_FULL_NAME_LEN {
    return Err(invalid("name is too long"));
  }
  if trimmed.chars().any(char::is_control) {
    return Err(invalid("name must not contain control characters"));
  }
  if slugify(trimmed).is_empty() {
    return Err(invalid("name must contain at least one letter or digit"));
  }
  Ok(trimmed.to_string())
}
