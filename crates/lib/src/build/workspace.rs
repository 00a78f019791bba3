//! Build workspaces.
//!
//! Every build gets its own directory under the workspace root, named by a
//! random id. The directory is created exclusively, filled from a
//! [`BuildPlan`] and registered by writing a marker file last; a directory
//! without a marker is an unfinished (or abandoned) materialization.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::manifest::{Manifest, readme};
use super::types::BuildError;
use crate::consts::{ARTIFACT_EXT, MAIN_MODULE, MODULE_EXT, WORKSPACE_ID_ATTEMPTS};
use crate::package::Package;
use crate::revision::{Revision, RevisionError, RevisionGraph, RevisionKey};
use crate::util::fsio::read_json;
use crate::util::unix_now;
use crate::util::validate::is_workspace_id;

pub const WORKSPACE_MARKER: &str = ".flightdeck-workspace";

/// Random, unguessable workspace identifier (simple-form UUID v4).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(String);

impl WorkspaceId {
  pub fn generate() -> Self {
    WorkspaceId(Uuid::new_v4().simple().to_string())
  }

  /// Validates an id supplied from outside; anything else could be a path.
  pub fn parse(s: &str) -> Result<Self, BuildError> {
    if is_workspace_id(s) {
      Ok(WorkspaceId(s.to_ascii_lowercase()))
    } else {
      Err(BuildError::InvalidWorkspaceId(s.to_string()))
    }
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for WorkspaceId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Contents of the registry marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceMarker {
  pub version: u32,
  pub id: WorkspaceId,
  pub created_at: u64,
  pub revision: RevisionKey,
  pub package_name: String,
  pub pid: u32,
}

#[derive(Debug, Clone)]
pub struct WorkspaceHandle {
  pub id: WorkspaceId,
  pub root: PathBuf,
  pub revision: RevisionKey,
  pub package_name: String,
}

impl WorkspaceHandle {
  pub fn artifact_path(&self) -> PathBuf {
    artifact_path(&self.root, &self.package_name)
  }
}

pub(super) fn artifact_path(root: &Path, package_name: &str) -> PathBuf {
  root.join(format!("{}.{}", package_name, ARTIFACT_EXT))
}

/// A workspace directory as found on disk.
#[derive(Debug, Clone)]
pub struct WorkspaceEntry {
  pub id: WorkspaceId,
  pub path: PathBuf,
  pub marker: Option<WorkspaceMarker>,
  pub modified: Option<SystemTime>,
}

impl WorkspaceEntry {
  pub fn is_registered(&self) -> bool {
    self.marker.is_some()
  }
}

#[derive(Debug, Clone)]
pub struct PlannedModule {
  pub filename: String,
  pub source: String,
  pub owner: RevisionKey,
}

#[derive(Debug, Clone)]
pub struct PlannedAttachment {
  pub name: String,
  pub source: PathBuf,
}

/// Point-in-time snapshot of everything a workspace will contain. All store
/// reads happen while preparing the plan; materializing it only writes.
#[derive(Debug, Clone)]
pub struct BuildPlan {
  pub package: Package,
  pub revision: Revision,
  pub modules: Vec<PlannedModule>,
  pub attachments: Vec<PlannedAttachment>,
  pub manifest: Manifest,
  pub readme: String,
}

impl BuildPlan {
  /// Resolves `key` and applies unsaved `overrides` (filename to source) to
  /// the revision's own modules. Overrides are never persisted.
  pub fn prepare(
    graph: &RevisionGraph,
    key: RevisionKey,
    overrides: &BTreeMap<String, String>,
  ) -> Result<Self, BuildError> {
    let package = graph.package(key.package)?;
    if !package.kind.is_buildable() {
      return Err(BuildError::NotBuildable(package.id));
    }

    let revision = graph.revision(key)?;
    if revision.module(MAIN_MODULE).is_none() {
      return Err(BuildError::MissingEntryPoint(key));
    }

    for filename in overrides.keys() {
      if revision.module(filename).is_none() {
        warn!(revision = %key, module = %filename, "ignoring override for unknown module");
      }
    }

    let mut seen = HashSet::new();
    let mut modules = Vec::new();
    for resolved in graph.resolve_transitive_modules(key)? {
      let filename = resolved.module.filename;
      if !seen.insert(filename.clone()) {
        warn!(revision = %key, module = %filename, owner = %resolved.owner, "module shadowed by an earlier one, not built");
        continue;
      }

      let source = match overrides.get(&filename) {
        Some(source) if resolved.owner == key => source.clone(),
        _ => graph
          .content()
          .get_source(&resolved.module.content)
          .map_err(RevisionError::from)?,
      };
      modules.push(PlannedModule {
        filename,
        source,
        owner: resolved.owner,
      });
    }

    let mut attachments = Vec::new();
    for attachment in &revision.attachments {
      let source = graph
        .content()
        .upload_path(&attachment.path)
        .map_err(RevisionError::from)?;
      attachments.push(PlannedAttachment {
        name: attachment.display_name(),
        source,
      });
    }

    Ok(BuildPlan {
      manifest: Manifest::for_revision(&package, &revision),
      readme: readme(&package),
      package,
      revision,
      modules,
      attachments,
    })
  }
}

#[derive(Debug, Clone)]
pub struct WorkspaceRegistry {
  root: PathBuf,
}

impl WorkspaceRegistry {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    WorkspaceRegistry { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn path(&self, id: &WorkspaceId) -> PathBuf {
    self.root.join(id.as_str())
  }

  /// Creates a fresh, empty workspace directory. A collision with an
  /// existing directory is retried with a new id; any other failure is not.
  pub async fn allocate(&self) -> Result<(WorkspaceId, PathBuf), BuildError> {
    fs::create_dir_all(&self.root).await.map_err(|source| BuildError::Io {
      path: self.root.clone(),
      source,
    })?;

    for attempt in 1..=WORKSPACE_ID_ATTEMPTS {
      let id = WorkspaceId::generate();
      let path = self.path(&id);
      match fs::create_dir(&path).await {
        Ok(()) => return Ok((id, path)),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
          warn!(workspace = %id, attempt, "workspace id collision, retrying");
        }
        Err(source) => return Err(BuildError::Io { path, source }),
      }
    }

    Err(BuildError::WorkspaceCollision {
      attempts: WORKSPACE_ID_ATTEMPTS,
    })
  }

  /// Writes `plan` into a new workspace. A failure part way removes the
  /// partial directory.
  pub async fn materialize(&self, plan: &BuildPlan) -> Result<WorkspaceHandle, BuildError> {
    let (id, root) = self.allocate().await?;
    let handle = WorkspaceHandle {
      id,
      root,
      revision: plan.revision.key(),
      package_name: plan.package.name.clone(),
    };

    if let Err(e) = write_workspace(&handle, plan).await {
      if let Err(cleanup) = fs::remove_dir_all(&handle.root).await {
        warn!(workspace = %handle.id, error = %cleanup, "failed to remove partial workspace");
      }
      return Err(e);
    }

    info!(
      workspace = %handle.id,
      revision = %handle.revision,
      modules = plan.modules.len(),
      attachments = plan.attachments.len(),
      "workspace materialized"
    );
    Ok(handle)
  }

  pub fn get(&self, id: &WorkspaceId) -> Option<WorkspaceEntry> {
    let path = self.path(id);
    let metadata = std::fs::metadata(&path).ok()?;
    if !metadata.is_dir() {
      return None;
    }

    Some(WorkspaceEntry {
      id: id.clone(),
      marker: read_marker(&path),
      modified: metadata.modified().ok(),
      path,
    })
  }

  /// All workspace directories, registered or not.
  pub fn list(&self) -> Result<Vec<WorkspaceEntry>, BuildError> {
    let entries = match std::fs::read_dir(&self.root) {
      Ok(entries) => entries,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
      Err(source) => {
        return Err(BuildError::Io {
          path: self.root.clone(),
          source,
        });
      }
    };

    let mut workspaces: Vec<WorkspaceEntry> = entries
      .flatten()
      .filter_map(|entry| {
        let name = entry.file_name();
        let id = WorkspaceId::parse(name.to_str()?).ok()?;
        self.get(&id)
      })
      .collect();
    workspaces.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(workspaces)
  }

  /// Removes a workspace. Returns whether anything was removed; purging a
  /// missing workspace is not an error.
  pub async fn purge(&self, id: &WorkspaceId) -> Result<bool, BuildError> {
    let path = self.path(id);
    match fs::remove_dir_all(&path).await {
      Ok(()) => {
        debug!(workspace = %id, "workspace purged");
        Ok(true)
      }
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
      Err(source) => Err(BuildError::Io { path, source }),
    }
  }
}

fn read_marker(root: &Path) -> Option<WorkspaceMarker> {
  match read_json(&root.join(WORKSPACE_MARKER)) {
    Ok(marker) => marker,
    Err(e) => {
      warn!(path = %root.display(), error = %e, "unreadable workspace marker");
      None
    }
  }
}

async fn write_workspace(handle: &WorkspaceHandle, plan: &BuildPlan) -> Result<(), BuildError> {
  let root = &handle.root;

  let lib = root.join("lib");
  create_dir(&lib).await?;
  for module in &plan.modules {
    let path = lib.join(format!("{}.{}", module.filename, MODULE_EXT));
    write_file(&path, module.source.as_bytes()).await?;
  }

  if !plan.attachments.is_empty() {
    let data = root.join("data");
    create_dir(&data).await?;
    for attachment in &plan.attachments {
      let target = data.join(&attachment.name);
      fs::copy(&attachment.source, &target)
        .await
        .map_err(|source| BuildError::Io {
          path: attachment.source.clone(),
          source,
        })?;
    }
  }

  let manifest = plan
    .manifest
    .to_bytes()
    .map_err(|e| BuildError::Io {
      path: root.join("package.json"),
      source: io::Error::other(e),
    })?;
  write_file(&root.join("package.json"), &manifest).await?;
  write_file(&root.join("README.md"), plan.readme.as_bytes()).await?;

  let marker = WorkspaceMarker {
    version: 1,
    id: handle.id.clone(),
    created_at: unix_now(),
    revision: handle.revision,
    package_name: handle.package_name.clone(),
    pid: std::process::id(),
  };
  let marker = serde_json::to_vec_pretty(&marker).map_err(|e| BuildError::Io {
    path: root.join(WORKSPACE_MARKER),
    source: io::Error::other(e),
  })?;
  write_file(&root.join(WORKSPACE_MARKER), &marker).await
}

async fn create_dir(path: &Path) -> Result<(), BuildError> {
  fs::create_dir_all(path).await.map_err(|source| BuildError::Io {
    path: path.to_path_buf(),
    source,
  })
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), BuildError> {
  fs::write(path, bytes).await.map_err(|source| BuildError::Io {
    path: path.to_path_buf(),
    source,
  })
}
