//! `flightdeck build`, `download` and `purge`.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Args;

use flightdeck_lib::build::{BuildError, Builder, artifact};

use super::module::{parse_assignment, read_sources};
use crate::output::{
  OutputFormat, format_bytes, format_duration, print_info, print_json, print_stat, print_success, print_warning,
};
use crate::session::{Session, Target};

#[derive(Args, Debug)]
pub struct BuildArgs {
  /// Build with unsaved module sources: `<module>=<path>` pairs
  #[arg(long = "live", value_parser = parse_assignment)]
  live: Vec<(String, PathBuf)>,

  /// Toolchain binary (overrides FLIGHTDECK_TOOLCHAIN)
  #[arg(long)]
  toolchain: Option<PathBuf>,

  /// Toolchain arguments placed before `--binary` (default: xpi)
  #[arg(long = "arg", allow_hyphen_values = true)]
  toolchain_args: Vec<String>,

  /// Give up on the toolchain after this long (e.g. "90s")
  #[arg(long, value_parser = humantime::parse_duration)]
  timeout: Option<Duration>,

  /// Keep the workspace of a failed build
  #[arg(long)]
  debug: bool,
}

pub fn cmd_build(session: &Session, target: Target, args: BuildArgs, output: OutputFormat) -> Result<()> {
  let start = Instant::now();
  let graph = session.graph();
  let key = target.read_key(&graph)?;
  let overrides = read_sources(&args.live)?;

  let mut config = session.config.clone();
  if let Some(toolchain) = args.toolchain {
    config.toolchain = toolchain;
  }
  if let Some(timeout) = args.timeout {
    config.build_timeout = timeout;
  }
  config.debug |= args.debug;
  let mut environment = config.build_environment();
  if !args.toolchain_args.is_empty() {
    environment = environment.with_args(args.toolchain_args);
  }
  let builder = Builder::new(config.registry(), environment);

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let result = match rt.block_on(builder.build(&graph, key, &overrides)) {
    Ok(result) => result,
    Err(BuildError::Failed { stdout, stderr, .. }) if !output.is_json() => {
      if !stdout.trim().is_empty() {
        eprintln!("{}", stdout.trim_end());
      }
      eprintln!("{}", stderr.trim_end());
      anyhow::bail!("build of {} failed", key);
    }
    Err(e) => return Err(e).with_context(|| format!("Build of {} failed", key)),
  };

  if output.is_json() {
    return print_json(&result);
  }

  if result.success {
    print_success(&format!("Built {}", result.addon_name));
  } else {
    print_warning(&format!("Build of {} failed; workspace kept for inspection", key));
    if !result.stderr.trim().is_empty() {
      eprintln!("{}", result.stderr.trim_end());
    }
  }
  print_stat("Workspace", result.workspace.as_str());
  print_stat("Artifact", &format!("{}.xpi", result.package_name));
  print_stat("Path", &result.artifact_path.display().to_string());
  if !result.artifact_present {
    print_info("The toolchain produced no artifact.");
  }
  print_stat("Duration", &format_duration(start.elapsed()));
  Ok(())
}

pub fn cmd_download(session: &Session, workspace: &str, name: &str, out: Option<PathBuf>, test: bool) -> Result<()> {
  let registry = session.config.registry();
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;

  let artifact = rt.block_on(async {
    if test {
      artifact::fetch_for_test(&registry, workspace, name).await
    } else {
      artifact::download(&registry, workspace, name).await
    }
  })?;

  let out = out.unwrap_or_else(|| PathBuf::from(&artifact.filename));
  std::fs::write(&out, &artifact.bytes).with_context(|| format!("Failed to write {}", out.display()))?;

  print_success(&format!("Wrote {} ({})", out.display(), format_bytes(artifact.bytes.len() as u64)));
  print_stat("Content-Type", artifact.content_type);
  if let Some(disposition) = &artifact.content_disposition {
    print_stat("Content-Disposition", disposition);
  }
  Ok(())
}

pub fn cmd_purge(session: &Session, workspace: &str) -> Result<()> {
  let registry = session.config.registry();
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;

  if rt.block_on(artifact::purge(&registry, workspace))? {
    print_success(&format!("Purged workspace {}", workspace));
  } else {
    print_info(&format!("Workspace {} does not exist", workspace));
  }
  Ok(())
}
