//! Running the toolchain.
//!
//! The child runs in its workspace with an explicit environment. It is
//! driven by a detached task: the caller awaits the result over a oneshot
//! channel, and if the caller goes away the task still finishes and purges
//! the workspace nobody will collect.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::manifest::version_label;
use super::types::{BuildEnvironment, BuildError, BuildResult};
use super::workspace::{BuildPlan, WorkspaceHandle, WorkspaceRegistry};
use crate::revision::{RevisionError, RevisionGraph, RevisionKey};

#[derive(Debug, Clone)]
pub struct Builder {
  registry: WorkspaceRegistry,
  environment: BuildEnvironment,
}

impl Builder {
  pub fn new(registry: WorkspaceRegistry, environment: BuildEnvironment) -> Self {
    Builder { registry, environment }
  }

  pub fn registry(&self) -> &WorkspaceRegistry {
    &self.registry
  }

  pub fn environment(&self) -> &BuildEnvironment {
    &self.environment
  }

  /// Locates the toolchain binary. Paths are checked as given; a bare name
  /// is searched for in the build environment's `PATH`.
  pub fn resolve_toolchain(&self) -> Result<PathBuf, BuildError> {
    let toolchain = &self.environment.toolchain;

    if toolchain.is_absolute() || toolchain.components().count() > 1 {
      let path = std::path::absolute(toolchain).unwrap_or_else(|_| toolchain.clone());
      if !path.exists() {
        return Err(BuildError::ToolchainNotFound { path });
      }
      if !is_executable(&path) {
        return Err(BuildError::ToolchainNotExecutable { path });
      }
      return Ok(path);
    }

    let search = self.environment.env.get("PATH").map(String::as_str).unwrap_or("");
    std::env::split_paths(search)
      .map(|dir| dir.join(toolchain))
      .find(|candidate| is_executable(candidate))
      .ok_or_else(|| BuildError::ToolchainNotFound {
        path: toolchain.clone(),
      })
  }

  /// Builds `key`, with `overrides` replacing the stored source of the
  /// revision's own modules for this build only.
  pub async fn build(
    &self,
    graph: &RevisionGraph,
    key: RevisionKey,
    overrides: &BTreeMap<String, String>,
  ) -> Result<BuildResult, BuildError> {
    let toolchain = self.resolve_toolchain()?;
    let plan = BuildPlan::prepare(graph, key, overrides)?;

    let interpreter = match plan.revision.sdk {
      Some(id) => match graph.sdks().get(id).map_err(RevisionError::from)? {
        Some(sdk) => sdk.interpreter,
        None => {
          warn!(revision = %key, sdk = %id, "revision refers to an unknown sdk");
          None
        }
      },
      None => None,
    };

    let handle = self.registry.materialize(&plan).await?;
    let job = BuildJob {
      toolchain,
      interpreter,
      addon_name: format!("{} ({})", plan.package.full_name, version_label(&plan.revision)),
      handle,
      environment: self.environment.clone(),
      registry: self.registry.clone(),
    };

    let (tx, rx) = oneshot::channel();
    let registry = self.registry.clone();
    tokio::spawn(async move {
      let result = job.run().await;
      if let Err(Ok(unclaimed)) = tx.send(result) {
        info!(workspace = %unclaimed.workspace, "build result not collected, purging workspace");
        if let Err(e) = registry.purge(&unclaimed.workspace).await {
          warn!(workspace = %unclaimed.workspace, error = %e, "failed to purge abandoned workspace");
        }
      }
    });

    rx.await.map_err(|_| BuildError::Abandoned)?
  }
}

struct BuildJob {
  toolchain: PathBuf,
  interpreter: Option<PathBuf>,
  addon_name: String,
  handle: WorkspaceHandle,
  environment: BuildEnvironment,
  registry: WorkspaceRegistry,
}

impl BuildJob {
  async fn run(self) -> Result<BuildResult, BuildError> {
    let root = &self.handle.root;
    let tmp_dir = root.join("tmp");
    if let Err(source) = tokio::fs::create_dir_all(&tmp_dir).await {
      self.purge().await;
      return Err(BuildError::Io { path: tmp_dir, source });
    }

    let mut command = Command::new(&self.toolchain);
    command.args(&self.environment.args);
    if let Some(interpreter) = &self.interpreter {
      command.arg("--binary").arg(interpreter);
    }
    command
      .current_dir(root)
      .env_clear()
      .env("HOME", root)
      .env("TMPDIR", &tmp_dir)
      .env("TMP", &tmp_dir)
      .env("TEMP", &tmp_dir)
      .envs(&self.environment.env)
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    info!(
      workspace = %self.handle.id,
      revision = %self.handle.revision,
      toolchain = %self.toolchain.display(),
      "running toolchain"
    );

    let child = match command.spawn() {
      Ok(child) => child,
      Err(source) => {
        self.purge().await;
        return Err(BuildError::Spawn {
          path: self.toolchain.clone(),
          source,
        });
      }
    };

    let pid = child.id();

    // Dropping the wait future on timeout drops the child, which kills it;
    // anything it started is killed through its process group.
    let output = match tokio::time::timeout(self.environment.timeout, child.wait_with_output()).await {
      Ok(Ok(output)) => output,
      Ok(Err(source)) => {
        self.purge().await;
        return Err(BuildError::Io {
          path: self.toolchain.clone(),
          source,
        });
      }
      Err(_) => {
        warn!(
          workspace = %self.handle.id,
          timeout = ?self.environment.timeout,
          "toolchain timed out, killed"
        );
        kill_process_group(pid);
        self.purge().await;
        return Err(BuildError::Timeout {
          revision: self.handle.revision,
          after: self.environment.timeout,
        });
      }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code();
    let failed = !stderr.trim().is_empty();

    if !stdout.is_empty() {
      debug!(stdout = %stdout, "toolchain stdout");
    }

    if failed && !self.environment.debug {
      warn!(
        workspace = %self.handle.id,
        code = ?code,
        stderr = %stderr,
        "build failed"
      );
      self.purge().await;
      return Err(BuildError::Failed {
        workspace: self.handle.id.clone(),
        revision: self.handle.revision,
        code,
        stdout,
        stderr,
      });
    }

    if failed {
      warn!(workspace = %self.handle.id, "build failed, workspace kept for debugging");
    }

    let artifact_path = self.handle.artifact_path();
    let artifact_present = artifact_path.is_file();
    if !failed {
      info!(
        workspace = %self.handle.id,
        artifact = %artifact_path.display(),
        artifact_present,
        code = ?code,
        "build finished"
      );
    }

    Ok(BuildResult {
      workspace: self.handle.id.clone(),
      revision: self.handle.revision,
      addon_name: self.addon_name.clone(),
      package_name: self.handle.package_name.clone(),
      artifact_path,
      artifact_present,
      stdout,
      stderr,
      code,
      success: !failed,
    })
  }

  async fn purge(&self) {
    if let Err(e) = self.registry.purge(&self.handle.id).await {
      warn!(workspace = %self.handle.id, error = %e, "failed to purge workspace");
    }
  }
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
  use rustix::process::{Pid, Signal};

  let Some(group) = pid.and_then(|raw| i32::try_from(raw).ok()).and_then(Pid::from_raw) else {
    return;
  };
  // ESRCH: the group already exited with the child.
  if let Err(e) = rustix::process::kill_process_group(group, Signal::KILL)
    && e != rustix::io::Errno::SRCH
  {
    warn!(pgid = group.as_raw_nonzero().get(), error = %e, "failed to kill toolchain process group");
  }
}

#[cfg(windows)]
fn kill_process_group(_pid: Option<u32>) {}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
  use std::os::unix::fs::PermissionsExt;

  std::fs::metadata(path)
    .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
    .unwrap_or(false)
}

#[cfg(windows)]
fn is_executable(path: &Path) -> bool {
  std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}
