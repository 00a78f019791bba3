mod cmd;
mod output;
mod prompts;
mod session;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use flightdeck_lib::consts::env;

use crate::cmd::{
  AttachmentCommand, DepCommand, ModuleCommand, PackageCommand, RevisionCommand, SdkCommand, cmd_attachment,
  cmd_build, cmd_dep, cmd_download, cmd_gc, cmd_module, cmd_package, cmd_purge, cmd_revision, cmd_sdk,
};
use crate::cmd::build::BuildArgs;
use crate::output::{OutputFormat, print_error};
use crate::session::{Session, Target};

/// FlightDeck - build browser add-ons from versioned packages
#[derive(Parser)]
#[command(name = "flightdeck")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// User to act as
  #[arg(short, long, global = true, env = env::USER)]
  user: Option<String>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Create, list and manage packages
  #[command(subcommand)]
  Package(PackageCommand),

  /// Inspect, branch and release revisions
  #[command(subcommand)]
  Revision(RevisionCommand),

  /// Edit the modules of a revision
  #[command(subcommand)]
  Module(ModuleCommand),

  /// Edit the attachments of a revision
  #[command(subcommand)]
  Attachment(AttachmentCommand),

  /// Edit the library dependencies of a revision
  #[command(subcommand)]
  Dep(DepCommand),

  /// Register SDKs and switch revisions between them
  #[command(subcommand)]
  Sdk(SdkCommand),

  /// Build an addon revision into an XPI
  Build {
    #[command(flatten)]
    target: Target,

    #[command(flatten)]
    args: BuildArgs,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Fetch the artifact of a finished build
  Download {
    /// Workspace id printed by `build`
    workspace: String,

    /// Artifact name (the package's short name)
    name: String,

    /// Where to write the XPI (default: ./<name>.xpi)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Fetch as served for in-browser test installation
    #[arg(long)]
    test: bool,
  },

  /// Delete a build workspace
  Purge {
    /// Workspace id printed by `build`
    workspace: String,
  },

  /// Remove stale workspaces and unreferenced stored content
  Gc {
    /// Only remove things older than this (e.g. "30m", "2h")
    #[arg(long, value_parser = humantime::parse_duration, default_value = "1h")]
    max_age: Duration,

    /// Preview what would be removed without removing anything
    #[arg(long)]
    dry_run: bool,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },
}

fn main() {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  if let Err(e) = run(cli) {
    print_error(&format!("{:#}", e));
    std::process::exit(1);
  }
}

fn run(cli: Cli) -> Result<()> {
  let session = Session::load(cli.user)?;

  match cli.command {
    Commands::Package(command) => cmd_package(&session, command),
    Commands::Revision(command) => cmd_revision(&session, command),
    Commands::Module(command) => cmd_module(&session, command),
    Commands::Attachment(command) => cmd_attachment(&session, command),
    Commands::Dep(command) => cmd_dep(&session, command),
    Commands::Sdk(command) => cmd_sdk(&session, command),
    Commands::Build { target, args, output } => cmd_build(&session, target, args, output),
    Commands::Download {
      workspace,
      name,
      out,
      test,
    } => cmd_download(&session, &workspace, &name, out, test),
    Commands::Purge { workspace } => cmd_purge(&session, &workspace),
    Commands::Gc {
      max_age,
      dry_run,
      output,
    } => cmd_gc(&session, max_age, dry_run, output),
  }
}
