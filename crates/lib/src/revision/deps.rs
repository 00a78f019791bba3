//! Library dependencies.
//!
//! Edges pin an exact library revision. Resolution is one level deep: a
//! build sees its own modules and the modules of its direct dependencies,
//! never the dependencies of those libraries.

use serde::Serialize;
use tracing::{debug, info};

use super::graph::RevisionGraph;
use super::types::{DependencyEdge, LibraryPin, ModuleRef, Revision, RevisionError, RevisionKey};
use crate::package::{PackageId, UserId};

/// A module together with the revision that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedModule {
  pub owner: RevisionKey,
  pub module: ModuleRef,
}

impl RevisionGraph {
  /// Picks the revision of `library` a new edge should point at.
  pub fn resolve_library(&self, library: PackageId, pin: LibraryPin) -> Result<Revision, RevisionError> {
    match pin {
      LibraryPin::Newest => self.revisions.newest(library),
      LibraryPin::NewestReleased => self.newest_released(library)?.ok_or(RevisionError::NoRelease(library)),
      LibraryPin::Exact(number) => self.revisions.require(RevisionKey::new(library, number)),
    }
  }

  /// Appends an edge from `key` to the library revision `target`.
  pub fn add_dependency(&self, key: RevisionKey, actor: &UserId, target: RevisionKey) -> Result<Revision, RevisionError> {
    let library = self.catalog.require(target.package)?;

    let revision = self.edit(key, actor, "dependency add", |revision| {
      if revision.dependency(target.package).is_some() {
        return Err(RevisionError::DuplicateDependency {
          key,
          package: target.package,
        });
      }
      if target.package == key.package {
        return Err(RevisionError::SelfDependency(key.package));
      }
      if !library.active {
        return Err(RevisionError::Disabled(library.id));
      }
      if !library.kind.can_be_dependency() {
        return Err(RevisionError::NotALibrary(library.id));
      }
      self.revisions.require(target)?;

      revision.dependencies.push(DependencyEdge {
        package: target.package,
        revision: target.number,
        name: library.name.clone(),
      });
      Ok(())
    })?;

    info!(revision = %key, library = %target, "dependency added");
    Ok(revision)
  }

  /// Resolves `pin` and adds the edge.
  pub fn add_library(
    &self,
    key: RevisionKey,
    actor: &UserId,
    library: PackageId,
    pin: LibraryPin,
  ) -> Result<Revision, RevisionError> {
    let target = self.resolve_library(library, pin)?;
    self.add_dependency(key, actor, target.key())
  }

  pub fn remove_dependency(&self, key: RevisionKey, actor: &UserId, library: PackageId) -> Result<Revision, RevisionError> {
    let revision = self.edit(key, actor, "dependency remove", |revision| {
      let before = revision.dependencies.len();
      revision.dependencies.retain(|d| d.package != library);
      if revision.dependencies.len() == before {
        return Err(RevisionError::DependencyNotFound { key, package: library });
      }
      Ok(())
    })?;

    info!(revision = %key, library = %library, "dependency removed");
    Ok(revision)
  }

  /// Modules visible to a build of `key`: its own, then each direct
  /// dependency's in edge order, then the core library's newest revision for
  /// addons that neither are the core library nor already depend on it.
  pub fn resolve_transitive_modules(&self, key: RevisionKey) -> Result<Vec<ResolvedModule>, RevisionError> {
    let revision = self.revisions.require(key)?;
    let package = self.catalog.require(key.package)?;

    let mut resolved: Vec<ResolvedModule> = owned_modules(&revision);

    for edge in &revision.dependencies {
      let dependency = self.revisions.require(edge.target())?;
      resolved.extend(owned_modules(&dependency));
    }

    if let Some(core) = self.core_library
      && package.kind.injects_core_library()
      && core != key.package
      && revision.dependency(core).is_none()
    {
      let core_revision = self.revisions.newest(core)?;
      debug!(revision = %key, core = %core_revision.key(), "injecting core library");
      resolved.extend(owned_modules(&core_revision));
    }

    Ok(resolved)
  }
}

fn owned_modules(revision: &Revision) -> Vec<ResolvedModule> {
  revision
    .modules
    .iter()
    .map(|module| ResolvedModule {
      owner: revision.key(),
      module: module.clone(),
    })
    .collect()
}
