//! The janitor: removes stale workspaces and unreferenced stored blobs.
//!
//! Nothing younger than `max_age` is touched, which covers workspaces still
//! being materialized (no marker yet). Blobs are swept under the exclusive
//! content lock, so no edit can be between storing content and saving the
//! revision that refers to it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use std::{fs, io};

use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::build::{BuildError, WorkspaceEntry, WorkspaceRegistry};
use crate::content::ContentError;
use crate::error::{Categorized, ErrorKind};
use crate::revision::{RevisionError, RevisionGraph};
use crate::store_lock::{LockMode, StoreLockError};
use crate::util::hash::ContentHash;
use crate::util::unix_now;

#[derive(Debug, Error)]
pub enum GcError {
  #[error("failed to collect live references: {0}")]
  Revision(#[from] RevisionError),

  #[error(transparent)]
  Build(#[from] BuildError),

  #[error(transparent)]
  Content(#[from] ContentError),

  #[error(transparent)]
  Lock(#[from] StoreLockError),
}

impl Categorized for GcError {
  fn kind(&self) -> ErrorKind {
    match self {
      GcError::Revision(e) => e.kind(),
      GcError::Build(e) => e.kind(),
      GcError::Content(e) => e.kind(),
      GcError::Lock(e) => e.kind(),
    }
  }
}

#[derive(Debug, Clone)]
pub struct GcOptions {
  pub max_age: Duration,
  pub dry_run: bool,
}

impl Default for GcOptions {
  fn default() -> Self {
    GcOptions {
      max_age: Duration::from_secs(60 * 60),
      dry_run: false,
    }
  }
}

#[derive(Debug, Default, serde::Serialize)]
pub struct GcStats {
  pub workspaces_scanned: usize,
  pub workspaces_deleted: usize,
  pub workspaces_bytes_freed: u64,
  pub blobs_scanned: usize,
  pub blobs_deleted: usize,
  pub blobs_bytes_freed: u64,
}

impl GcStats {
  pub fn total_deleted(&self) -> usize {
    self.workspaces_deleted + self.blobs_deleted
  }

  pub fn total_bytes_freed(&self) -> u64 {
    self.workspaces_bytes_freed + self.blobs_bytes_freed
  }
}

#[derive(Debug, serde::Serialize)]
pub struct GcResult {
  pub stats: GcStats,
  pub deleted_paths: Vec<PathBuf>,
}

#[derive(Debug, Default)]
struct LiveSet {
  sources: HashSet<ContentHash>,
  uploads: HashSet<String>,
}

fn collect_live(graph: &RevisionGraph) -> Result<LiveSet, GcError> {
  let mut live = LiveSet::default();

  for package in graph.revisions().packages()? {
    for revision in graph.revisions().list(package)? {
      live.sources.extend(revision.modules.into_iter().map(|m| m.content));
      live.uploads.extend(revision.attachments.into_iter().map(|a| a.path));
    }
  }

  debug!(
    sources = live.sources.len(),
    uploads = live.uploads.len(),
    "collected live references"
  );
  Ok(live)
}

fn dir_size(path: &Path) -> u64 {
  WalkDir::new(path)
    .into_iter()
    .filter_map(|e| e.ok())
    .filter(|e| e.file_type().is_file())
    .filter_map(|e| e.metadata().ok())
    .map(|m| m.len())
    .sum()
}

fn age_of(modified: Option<SystemTime>) -> Duration {
  modified
    .and_then(|m| SystemTime::now().duration_since(m).ok())
    .unwrap_or_default()
}

fn workspace_age(entry: &WorkspaceEntry) -> Duration {
  match &entry.marker {
    Some(marker) => Duration::from_secs(unix_now().saturating_sub(marker.created_at)),
    None => age_of(entry.modified),
  }
}

pub fn collect_garbage(
  graph: &RevisionGraph,
  registry: &WorkspaceRegistry,
  options: &GcOptions,
) -> Result<GcResult, GcError> {
  let mut stats = GcStats::default();
  let mut deleted_paths = Vec::new();

  sweep_workspaces(registry, options, &mut stats, &mut deleted_paths)?;

  {
    let _content = graph.content().lock(LockMode::Exclusive, "gc")?;
    let live = collect_live(graph)?;
    sweep_blobs(graph, &live, options, &mut stats, &mut deleted_paths)?;
  }

  info!(
    workspaces_deleted = stats.workspaces_deleted,
    blobs_deleted = stats.blobs_deleted,
    bytes_freed = stats.total_bytes_freed(),
    dry_run = options.dry_run,
    "garbage collection complete"
  );

  Ok(GcResult { stats, deleted_paths })
}

fn sweep_workspaces(
  registry: &WorkspaceRegistry,
  options: &GcOptions,
  stats: &mut GcStats,
  deleted_paths: &mut Vec<PathBuf>,
) -> Result<(), GcError> {
  for entry in registry.list()? {
    stats.workspaces_scanned += 1;

    if workspace_age(&entry) < options.max_age {
      continue;
    }

    let size = dir_size(&entry.path);
    if entry.is_registered() {
      debug!(workspace = %entry.id, "removing expired workspace");
    } else {
      debug!(workspace = %entry.id, "removing unregistered workspace");
    }

    if remove(&entry.path, true, options.dry_run) {
      stats.workspaces_deleted += 1;
      stats.workspaces_bytes_freed += size;
      deleted_paths.push(entry.path);
    }
  }

  Ok(())
}

fn sweep_blobs(
  graph: &RevisionGraph,
  live: &LiveSet,
  options: &GcOptions,
  stats: &mut GcStats,
  deleted_paths: &mut Vec<PathBuf>,
) -> Result<(), GcError> {
  for blob in graph.content().blobs()? {
    stats.blobs_scanned += 1;

    let referenced = match (&blob.hash, &blob.upload_name) {
      (Some(hash), _) => live.sources.contains(hash),
      (None, Some(name)) => live.uploads.contains(name),
      // Unrecognised files in the content directory are left alone.
      (None, None) => true,
    };
    if referenced {
      continue;
    }

    let metadata = match fs::metadata(&blob.path) {
      Ok(metadata) => metadata,
      Err(_) => continue,
    };
    if age_of(metadata.modified().ok()) < options.max_age {
      continue;
    }

    debug!(path = %blob.path.display(), "removing unreferenced blob");
    if remove(&blob.path, false, options.dry_run) {
      stats.blobs_deleted += 1;
      stats.blobs_bytes_freed += metadata.len();
      deleted_paths.push(blob.path);
    }
  }

  Ok(())
}

fn remove(path: &Path, is_dir: bool, dry_run: bool) -> bool {
  if dry_run {
    return true;
  }

  let result = if is_dir {
    fs::remove_dir_all(path)
  } else {
    fs::remove_file(path)
  };

  match result {
    Ok(()) => true,
    Err(e) if e.kind() == io::ErrorKind::NotFound => false,
    Err(e) => {
      warn!(path = %path.display(), error = %e, "failed to delete");
      false
    }
  }
}
