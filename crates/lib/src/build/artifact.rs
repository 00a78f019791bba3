//! Fetching and discarding build results.

use std::io;

use tracing::info;

use super::types::{Artifact, BuildError};
use super::workspace::{WorkspaceId, WorkspaceRegistry, artifact_path};
use crate::consts::ARTIFACT_EXT;
use crate::util::validate::is_alphanum_plus;

pub const DOWNLOAD_CONTENT_TYPE: &str = "application/octet-stream";
/// Served inline to the browser extension that installs test builds.
pub const TEST_CONTENT_TYPE: &str = "text/plain; charset=x-user-defined";

/// Reads `<workspace>/<package_name>.xpi` for download.
pub async fn download(registry: &WorkspaceRegistry, workspace: &str, package_name: &str) -> Result<Artifact, BuildError> {
  let mut artifact = read(registry, workspace, package_name).await?;
  artifact.content_disposition = Some(format!("attachment; filename=\"{}\"", artifact.filename));
  Ok(artifact)
}

/// Same bytes as [`download`], served for in-browser installation.
pub async fn fetch_for_test(
  registry: &WorkspaceRegistry,
  workspace: &str,
  package_name: &str,
) -> Result<Artifact, BuildError> {
  let mut artifact = read(registry, workspace, package_name).await?;
  artifact.content_type = TEST_CONTENT_TYPE;
  Ok(artifact)
}

async fn read(registry: &WorkspaceRegistry, workspace: &str, package_name: &str) -> Result<Artifact, BuildError> {
  let id = WorkspaceId::parse(workspace)?;
  if !is_alphanum_plus(package_name) || package_name.starts_with('.') {
    return Err(BuildError::InvalidArtifactName(package_name.to_string()));
  }

  let path = artifact_path(&registry.path(&id), package_name);
  let bytes = match tokio::fs::read(&path).await {
    Ok(bytes) => bytes,
    Err(e) if e.kind() == io::ErrorKind::NotFound => {
      return Err(BuildError::ArtifactNotFound {
        workspace: id,
        name: package_name.to_string(),
      });
    }
    Err(source) => return Err(BuildError::Io { path, source }),
  };

  Ok(Artifact {
    filename: format!("{}.{}", package_name, ARTIFACT_EXT),
    bytes,
    content_type: DOWNLOAD_CONTENT_TYPE,
    content_disposition: None,
  })
}

/// Deletes a workspace. Purging twice, or purging an id that never existed,
/// succeeds.
pub async fn purge(registry: &WorkspaceRegistry, workspace: &str) -> Result<bool, BuildError> {
  let id = WorkspaceId::parse(workspace)?;
  let removed = registry.purge(&id).await?;
  info!(workspace = %id, removed, "workspace purge requested");
  Ok(removed)
}
