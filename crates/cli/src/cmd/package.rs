use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use flightdeck_lib::package::{Package, PackageFilter, PackageId, PackageKind, UserId};
use flightdeck_lib::revision::Revision;

use crate::output::{OutputFormat, format_timestamp, print_info, print_json, print_stat, print_success, symbols};
use crate::prompts::confirm;
use crate::session::{Session, Target};

#[derive(Subcommand, Debug)]
pub enum PackageCommand {
  /// Create a package with its first revision
  Create {
    /// Human-readable name, unique among your active packages of this kind
    full_name: String,

    /// addon or library
    #[arg(short, long, default_value = "addon")]
    kind: PackageKind,

    #[arg(short, long, default_value = "")]
    description: String,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// List packages
  List {
    /// Only packages of this kind
    #[arg(short, long)]
    kind: Option<PackageKind>,

    /// Only packages by this author
    #[arg(long)]
    author: Option<String>,

    /// Include disabled packages
    #[arg(long)]
    all: bool,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Show a package and its newest revision
  Show {
    id: PackageId,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Copy a revision into a new package owned by you
  Copy {
    #[command(flatten)]
    source: Target,
  },

  /// Change a package's full name
  Rename { id: PackageId, full_name: String },

  /// Change a package's description
  Describe { id: PackageId, description: String },

  /// Hide a package from listings and from use as a dependency
  Disable {
    id: PackageId,

    /// Skip confirmation prompt
    #[arg(long)]
    force: bool,
  },

  /// Re-enable a disabled package
  Activate { id: PackageId },
}

#[derive(Debug, Serialize)]
struct Created<'a> {
  package: &'a Package,
  revision: &'a Revision,
}

pub fn cmd_package(session: &Session, command: PackageCommand) -> Result<()> {
  match command {
    PackageCommand::Create {
      full_name,
      kind,
      description,
      output,
    } => cmd_create(session, &full_name, kind, &description, output),
    PackageCommand::List {
      kind,
      author,
      all,
      output,
    } => cmd_list(session, kind, author, all, output),
    PackageCommand::Show { id, output } => cmd_show(session, id, output),
    PackageCommand::Copy { source } => cmd_copy(session, source),
    PackageCommand::Rename { id, full_name } => {
      let package = session.graph().catalog().rename(id, session.actor()?, &full_name)?;
      print_success(&format!("Renamed {} to '{}' ({})", id, package.full_name, package.name));
      Ok(())
    }
    PackageCommand::Describe { id, description } => {
      session
        .graph()
        .catalog()
        .set_description(id, session.actor()?, &description)?;
      print_success(&format!("Updated description of {}", id));
      Ok(())
    }
    PackageCommand::Disable { id, force } => cmd_disable(session, id, force),
    PackageCommand::Activate { id } => {
      let package = session.graph().catalog().activate(id, session.actor()?)?;
      print_success(&format!("Activated '{}' ({})", package.full_name, id));
      Ok(())
    }
  }
}

fn cmd_create(session: &Session, full_name: &str, kind: PackageKind, description: &str, output: OutputFormat) -> Result<()> {
  let graph = session.graph();
  let (package, revision) = graph.create_package(session.actor()?, kind, full_name, description)?;

  if output.is_json() {
    return print_json(&Created {
      package: &package,
      revision: &revision,
    });
  }

  print_success(&format!("Created {} '{}'", package.kind, package.full_name));
  print_stat("Id", &package.id.to_string());
  print_stat("Name", &package.name);
  print_stat("Revision", &revision.key().to_string());
  if let Some(sdk) = revision.sdk {
    print_stat("SDK", &sdk.to_string());
  }
  Ok(())
}

fn cmd_list(
  session: &Session,
  kind: Option<PackageKind>,
  author: Option<String>,
  all: bool,
  output: OutputFormat,
) -> Result<()> {
  let filter = PackageFilter {
    kind,
    author: author.map(UserId::from),
    include_disabled: all,
  };
  let packages = session.graph().catalog().list(&filter)?;

  if output.is_json() {
    return print_json(&packages);
  }

  if packages.is_empty() {
    print_info(&format!("No {} found.", kind.map_or("packages", |k| k.plural())));
    return Ok(());
  }

  for package in &packages {
    let disabled = if package.active { "" } else { " [disabled]" };
    println!(
      "{} {}  {:<8} {} ({}) by {}{}",
      symbols::INFO,
      package.id,
      package.kind.as_str(),
      package.full_name,
      package.name,
      package.author,
      disabled
    );
  }
  Ok(())
}

fn cmd_show(session: &Session, id: PackageId, output: OutputFormat) -> Result<()> {
  let graph = session.graph();
  let package = graph.package(id)?;
  let newest = graph.newest(id)?;
  let released = graph.newest_released(id)?;

  if output.is_json() {
    return print_json(&serde_json::json!({
      "package": package,
      "newest": newest.key(),
      "newest_released": released.as_ref().map(|r| r.key()),
    }));
  }

  print_success(&format!("{} '{}'", package.kind, package.full_name));
  print_stat("Id", &package.id.to_string());
  print_stat("Name", &package.name);
  print_stat("Author", package.author.as_ref());
  print_stat("Active", &package.active.to_string());
  print_stat("Created", &format_timestamp(package.created_at));
  if !package.description.is_empty() {
    print_stat("Description", &package.description);
  }
  print_stat("Newest", &newest.key().to_string());
  match released {
    Some(r) => print_stat(
      "Released",
      &format!("{} ({})", r.key(), r.version_name.as_deref().unwrap_or_default()),
    ),
    None => print_stat("Released", "never"),
  }
  Ok(())
}

fn cmd_copy(session: &Session, source: Target) -> Result<()> {
  let graph = session.graph();
  let key = source.read_key(&graph)?;
  let (package, revision) = graph.copy_package(key, session.actor()?)?;

  print_success(&format!("Copied {} to '{}'", key, package.full_name));
  print_stat("Id", &package.id.to_string());
  print_stat("Revision", &revision.key().to_string());
  Ok(())
}

fn cmd_disable(session: &Session, id: PackageId, force: bool) -> Result<()> {
  let graph = session.graph();
  let package = graph.package(id)?;

  if !confirm(&format!("Disable {} '{}'?", package.kind, package.full_name), force)? {
    print_info("Aborted.");
    return Ok(());
  }

  graph.catalog().disable(id, session.actor()?)?;
  print_success(&format!("Disabled '{}' ({})", package.full_name, id));
  Ok(())
}
