//! Revision history operations.
//!
//! Every mutation takes the package's exclusive lock (structural edits hold
//! the content lock shared first), re-reads the revision
//! it targets and only then checks authorship, staleness and release state.
//! A mutation touches exactly one revision record; history is never
//! rewritten.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info};

use super::store::RevisionStore;
use super::types::{AttachmentRef, ModuleRef, Revision, RevisionError, RevisionKey};
use crate::consts::{MAIN_MODULE, MODULE_EXT};
use crate::content::ContentStore;
use crate::package::{Catalog, Package, PackageId, PackageKind, UserId};
use crate::sdk::{SdkId, SdkRegistry};
use crate::store_lock::LockMode;
use crate::util::unix_now;
use crate::util::validate::{is_alphanum_plus_space, slugify};

#[derive(Debug, Clone)]
pub struct RevisionGraph {
  pub(super) catalog: Catalog,
  pub(super) revisions: RevisionStore,
  pub(super) content: ContentStore,
  pub(super) sdks: SdkRegistry,
  pub(super) core_library: Option<PackageId>,
}

impl RevisionGraph {
  /// Opens the store rooted at `root`. Nothing is created until the first
  /// write.
  pub fn open(root: &Path) -> Self {
    RevisionGraph {
      catalog: Catalog::new(root.join("packages")),
      revisions: RevisionStore::new(root.join("revisions")),
      content: ContentStore::new(root),
      sdks: SdkRegistry::new(root),
      core_library: None,
    }
  }

  /// Library injected into every addon build.
  pub fn with_core_library(mut self, core: Option<PackageId>) -> Self {
    self.core_library = core;
    self
  }

  pub fn catalog(&self) -> &Catalog {
    &self.catalog
  }

  pub fn revisions(&self) -> &RevisionStore {
    &self.revisions
  }

  pub fn content(&self) -> &ContentStore {
    &self.content
  }

  pub fn sdks(&self) -> &SdkRegistry {
    &self.sdks
  }

  pub fn core_library(&self) -> Option<PackageId> {
    self.core_library
  }

  // Lookups

  pub fn package(&self, id: PackageId) -> Result<Package, RevisionError> {
    Ok(self.catalog.require(id)?)
  }

  pub fn revision(&self, key: RevisionKey) -> Result<Revision, RevisionError> {
    self.revisions.require(key)
  }

  pub fn newest(&self, package: PackageId) -> Result<Revision, RevisionError> {
    self.revisions.newest(package)
  }

  pub fn history(&self, package: PackageId) -> Result<Vec<Revision>, RevisionError> {
    self.catalog.require(package)?;
    self.revisions.list(package)
  }

  pub fn newest_released(&self, package: PackageId) -> Result<Option<Revision>, RevisionError> {
    Ok(self.history(package)?.into_iter().rev().find(Revision::is_released))
  }

  pub fn by_version(&self, package: PackageId, version: &str) -> Result<Option<Revision>, RevisionError> {
    let version = version.trim();
    Ok(
      self
        .history(package)?
        .into_iter()
        .find(|r| r.version_name.as_deref() == Some(version)),
    )
  }

  pub fn module_source(&self, key: RevisionKey, filename: &str) -> Result<String, RevisionError> {
    let revision = self.revisions.require(key)?;
    let module = revision.module(filename).ok_or_else(|| RevisionError::ModuleNotFound {
      key,
      filename: filename.to_string(),
    })?;
    Ok(self.content.get_source(&module.content)?)
  }

  /// Bytes of an attachment, looked up by `<filename>.<ext>`.
  pub fn attachment_bytes(&self, key: RevisionKey, name: &str) -> Result<(AttachmentRef, Vec<u8>), RevisionError> {
    let revision = self.revisions.require(key)?;
    let attachment = revision
      .attachment(name)
      .cloned()
      .ok_or_else(|| RevisionError::AttachmentNotFound {
        key,
        name: name.to_string(),
      })?;
    let bytes = self.content.read_upload(&attachment.path)?;
    Ok((attachment, bytes))
  }

  // Packages

  /// Creates a package and its first revision. An addon's revision 1 carries
  /// a default `main` module so it is buildable straight away; libraries
  /// start empty.
  pub fn create_package(
    &self,
    author: &UserId,
    kind: PackageKind,
    full_name: &str,
    description: &str,
  ) -> Result<(Package, Revision), RevisionError> {
    let _content = self.content.lock(LockMode::Shared, "package create")?;
    let mut first = None;
    let package = self.catalog.create(
      author,
      kind,
      full_name,
      description,
      |package| {
        let mut revision = self.initial_revision(package)?;
        if package.kind.is_buildable() {
          let source = default_module_source(MAIN_MODULE, package);
          revision.modules.push(ModuleRef {
            filename: MAIN_MODULE.to_string(),
            author: author.clone(),
            content: self.content.put_source(&source)?,
          });
        }

        let _lock = self.revisions.lock(package.id, "package create")?;
        self.revisions.insert(&revision)?;
        first = Some(revision);
        Ok::<(), RevisionError>(())
      },
      |package| self.revisions.discard(package.id),
    )?;

    let revision = first.ok_or(RevisionError::Empty(package.id))?;
    Ok((package, revision))
  }

  /// Creates a new package owned by `actor` whose first revision is a value
  /// copy of `source`.
  pub fn copy_package(&self, source: RevisionKey, actor: &UserId) -> Result<(Package, Revision), RevisionError> {
    let _content = self.content.lock(LockMode::Shared, "package copy")?;
    let original = self.catalog.require(source.package)?;
    let from = self.revisions.require(source)?;

    let mut first = None;
    let package = self.catalog.create(
      actor,
      original.kind,
      &original.copied_full_name(),
      &original.description,
      |package| {
        let revision = Revision {
          package: package.id,
          number: 1,
          version_name: None,
          message: format!("copied from {}", source),
          author: actor.clone(),
          created_at: unix_now(),
          origin: Some(source),
          ..from.clone()
        };

        let _lock = self.revisions.lock(package.id, "package copy")?;
        self.revisions.insert(&revision)?;
        first = Some(revision);
        Ok::<(), RevisionError>(())
      },
      |package| self.revisions.discard(package.id),
    )?;

    info!(source = %source, copy = %package.id, actor = %actor, "package copied");
    let revision = first.ok_or(RevisionError::Empty(package.id))?;
    Ok((package, revision))
  }

  // History

  fn initial_revision(&self, package: &Package) -> Result<Revision, RevisionError> {
    let sdk = if package.kind.requires_sdk() {
      self.sdks.newest()?.map(|s| s.id)
    } else {
      None
    };

    Ok(Revision {
      package: package.id,
      number: 1,
      version_name: None,
      message: String::new(),
      author: package.author.clone(),
      sdk,
      modules: Vec::new(),
      attachments: Vec::new(),
      dependencies: Vec::new(),
      created_at: unix_now(),
      origin: None,
    })
  }

  /// Revision 1 of `package` with no modules, attachments or dependencies.
  pub fn create_initial(&self, package: PackageId) -> Result<Revision, RevisionError> {
    let package = self.catalog.require(package)?;
    let _lock = self.revisions.lock(package.id, "revision create")?;

    let revision = self.initial_revision(&package)?;
    self.revisions.insert(&revision)?;
    Ok(revision)
  }

  /// Value-copies `from` into a new revision numbered one past the newest.
  pub fn branch(&self, from: RevisionKey, actor: &UserId) -> Result<Revision, RevisionError> {
    let _lock = self.revisions.lock(from.package, "revision branch")?;
    self.branch_locked(from, actor)
  }

  fn branch_locked(&self, from: RevisionKey, actor: &UserId) -> Result<Revision, RevisionError> {
    let source = self.revisions.require(from)?;
    check_author(&source, actor)?;

    let newest = self.revisions.newest_number(from.package)?.unwrap_or(from.number);
    let revision = Revision {
      number: newest + 1,
      version_name: None,
      message: String::new(),
      author: actor.clone(),
      created_at: unix_now(),
      origin: Some(from),
      ..source
    };
    self.revisions.insert(&revision)?;

    info!(from = %from, to = %revision.key(), "revision branched");
    Ok(revision)
  }

  /// The revision edits should land on: the newest one if it is still
  /// unreleased, otherwise a fresh branch of it authored by `actor`.
  pub fn working_revision(&self, package: PackageId, actor: &UserId) -> Result<Revision, RevisionError> {
    self.catalog.require(package)?;
    let _lock = self.revisions.lock(package, "revision checkout")?;

    let newest = self.revisions.newest(package)?;
    if !newest.is_released() {
      check_author(&newest, actor)?;
      return Ok(newest);
    }
    self.branch_locked(newest.key(), actor)
  }

  /// Releases a revision under `name`.
  pub fn set_version(&self, key: RevisionKey, actor: &UserId, name: &str) -> Result<Revision, RevisionError> {
    if !is_alphanum_plus_space(name) {
      return Err(RevisionError::InvalidVersionName { name: name.to_string() });
    }
    let name = name.trim();

    let _lock = self.revisions.lock(key.package, "revision release")?;
    let mut revision = self.revisions.require(key)?;
    check_author(&revision, actor)?;

    match &revision.version_name {
      Some(current) if current == name => return Ok(revision),
      Some(current) => {
        return Err(RevisionError::AlreadyReleased {
          key,
          current: current.clone(),
        });
      }
      None => {}
    }

    if let Some(existing) = self
      .revisions
      .list(key.package)?
      .into_iter()
      .find(|r| r.version_name.as_deref() == Some(name))
    {
      return Err(RevisionError::VersionTaken {
        version: name.to_string(),
        existing: existing.key(),
      });
    }

    revision.version_name = Some(name.to_string());
    self.revisions.save(&revision)?;
    info!(revision = %key, version = name, "revision released");
    Ok(revision)
  }

  /// Metadata edit; allowed on released and older revisions.
  pub fn set_message(&self, key: RevisionKey, actor: &UserId, message: &str) -> Result<Revision, RevisionError> {
    let _lock = self.revisions.lock(key.package, "revision message")?;
    let mut revision = self.revisions.require(key)?;
    check_author(&revision, actor)?;

    revision.message = message.trim().to_string();
    self.revisions.save(&revision)?;
    Ok(revision)
  }

  // Structural edits

  /// Loads `key` under its package lock, checks it may be edited by `actor`,
  /// applies `apply` and saves the result.
  pub(super) fn edit(
    &self,
    key: RevisionKey,
    actor: &UserId,
    command: &str,
    apply: impl FnOnce(&mut Revision) -> Result<(), RevisionError>,
  ) -> Result<Revision, RevisionError> {
    let _content = self.content.lock(LockMode::Shared, command)?;
    let _lock = self.revisions.lock(key.package, command)?;

    let mut revision = self.revisions.require(key)?;
    check_author(&revision, actor)?;

    let newest = self.revisions.newest_number(key.package)?.unwrap_or(key.number);
    if newest != key.number {
      return Err(RevisionError::Stale { key, newest });
    }
    if let Some(version) = &revision.version_name {
      return Err(RevisionError::Released {
        key,
        version: version.clone(),
      });
    }

    apply(&mut revision)?;
    self.revisions.save(&revision)?;
    debug!(revision = %key, command, "revision updated");
    Ok(revision)
  }

  /// Adds a module. Without `source`, the module gets a short header comment.
  pub fn add_module(
    &self,
    key: RevisionKey,
    actor: &UserId,
    filename: &str,
    source: Option<&str>,
  ) -> Result<Revision, RevisionError> {
    let filename = module_filename(filename)?;
    let package = self.catalog.require(key.package)?;

    self.edit(key, actor, "module add", |revision| {
      if revision.module(&filename).is_some() {
        return Err(RevisionError::DuplicateModule {
          key,
          filename: filename.clone(),
        });
      }

      let source = match source {
        Some(source) => source.to_string(),
        None => default_module_source(&filename, &package),
      };
      revision.modules.push(ModuleRef {
        filename: filename.clone(),
        author: actor.clone(),
        content: self.content.put_source(&source)?,
      });
      Ok(())
    })
  }

  pub fn remove_module(&self, key: RevisionKey, actor: &UserId, filename: &str) -> Result<Revision, RevisionError> {
    self.edit(key, actor, "module remove", |revision| {
      let before = revision.modules.len();
      revision.modules.retain(|m| m.filename != filename);
      if revision.modules.len() == before {
        return Err(RevisionError::ModuleNotFound {
          key,
          filename: filename.to_string(),
        });
      }
      Ok(())
    })
  }

  /// Replaces the source of existing modules. Returns the updated revision
  /// and the filenames whose source actually changed.
  pub fn update_modules(
    &self,
    key: RevisionKey,
    actor: &UserId,
    changes: &BTreeMap<String, String>,
  ) -> Result<(Revision, Vec<String>), RevisionError> {
    let mut changed = Vec::new();

    let revision = self.edit(key, actor, "module save", |revision| {
      if let Some(unknown) = changes.keys().find(|f| revision.module(f).is_none()) {
        return Err(RevisionError::ModuleNotFound {
          key,
          filename: unknown.clone(),
        });
      }

      for module in revision.modules.iter_mut() {
        let Some(source) = changes.get(&module.filename) else {
          continue;
        };
        let hash = self.content.put_source(source)?;
        if hash != module.content {
          module.content = hash;
          changed.push(module.filename.clone());
        }
      }
      Ok(())
    })?;

    if changed.is_empty() {
      debug!(revision = %key, "no module changes");
    } else {
      info!(revision = %key, modules = ?changed, "modules saved");
    }
    Ok((revision, changed))
  }

  /// Stores `bytes` in the upload directory and attaches them as
  /// `original_name`.
  pub fn add_attachment(
    &self,
    key: RevisionKey,
    actor: &UserId,
    original_name: &str,
    bytes: &[u8],
  ) -> Result<Revision, RevisionError> {
    let (filename, ext) = crate::content::split_upload_name(original_name)?;

    self.edit(key, actor, "attachment add", |revision| {
      let name = if ext.is_empty() {
        filename.clone()
      } else {
        format!("{}.{}", filename, ext)
      };
      if revision.attachment(&name).is_some() {
        return Err(RevisionError::DuplicateAttachment { key, name });
      }

      let stored = self.content.store_upload(key.package, original_name, bytes)?;
      revision.attachments.push(AttachmentRef {
        filename: stored.filename,
        ext: stored.ext,
        path: stored.path,
        author: actor.clone(),
        digest: stored.digest,
        size: stored.size,
      });
      Ok(())
    })
  }

  pub fn remove_attachment(&self, key: RevisionKey, actor: &UserId, name: &str) -> Result<Revision, RevisionError> {
    self.edit(key, actor, "attachment remove", |revision| {
      let before = revision.attachments.len();
      revision.attachments.retain(|a| a.display_name() != name);
      if revision.attachments.len() == before {
        return Err(RevisionError::AttachmentNotFound {
          key,
          name: name.to_string(),
        });
      }
      Ok(())
    })
  }

  pub fn switch_sdk(&self, key: RevisionKey, actor: &UserId, sdk: SdkId) -> Result<Revision, RevisionError> {
    let package = self.catalog.require(key.package)?;
    if !package.kind.requires_sdk() {
      return Err(RevisionError::SdkNotAllowed(key.package));
    }
    self.sdks.require(sdk)?;

    self.edit(key, actor, "sdk switch", |revision| {
      if revision.sdk != Some(sdk) {
        info!(revision = %key, from = ?revision.sdk, to = %sdk, "switching sdk");
        revision.sdk = Some(sdk);
      }
      Ok(())
    })
  }
}

fn check_author(revision: &Revision, actor: &UserId) -> Result<(), RevisionError> {
  if &revision.author != actor {
    return Err(RevisionError::NotAuthor {
      user: actor.clone(),
      key: revision.key(),
    });
  }
  Ok(())
}

fn module_filename(filename: &str) -> Result<String, RevisionError> {
  let trimmed = filename.trim();
  let trimmed = trimmed
    .strip_suffix(&format!(".{}", MODULE_EXT))
    .unwrap_or(trimmed);
  let slug = slugify(trimmed);
  if slug.is_empty() {
    return Err(RevisionError::InvalidFilename(filename.to_string()));
  }
  Ok(slug)
}

fn default_module_source(filename: &str, package: &Package) -> String {
  format!(
    "// {}.{} - {}'s module\n// author: {}",
    filename, MODULE_EXT, package.full_name, package.author
  )
}
