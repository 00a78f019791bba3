use anyhow::{Result, bail};
use clap::Subcommand;

use flightdeck_lib::package::PackageId;
use flightdeck_lib::revision::{Revision, RevisionGraph};

use crate::output::{
  OutputFormat, format_bytes, format_timestamp, print_info, print_item, print_json, print_stat, print_success, symbols,
  truncate_hash,
};
use crate::session::{Session, Target};

#[derive(Subcommand, Debug)]
pub enum RevisionCommand {
  /// List every revision of a package, oldest first
  List {
    package: PackageId,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Show one revision
  Show {
    #[command(flatten)]
    target: Target,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Find the revision released under a version name
  Find {
    package: PackageId,
    version: String,
  },

  /// Copy a revision into a new revision at the head of the history
  Branch {
    #[command(flatten)]
    target: Target,
  },

  /// Name a revision's version, making it immutable
  Release {
    #[command(flatten)]
    target: Target,

    /// Version name
    version: String,
  },

  /// Set a revision's commit message
  Message {
    #[command(flatten)]
    target: Target,

    message: String,
  },
}

pub fn cmd_revision(session: &Session, command: RevisionCommand) -> Result<()> {
  let graph = session.graph();

  match command {
    RevisionCommand::List { package, output } => {
      let history = graph.history(package)?;
      if output.is_json() {
        return print_json(&history);
      }
      for revision in &history {
        println!("{} {}", symbols::INFO, summary(revision));
      }
      Ok(())
    }
    RevisionCommand::Show { target, output } => {
      let revision = graph.revision(target.read_key(&graph)?)?;
      if output.is_json() {
        return print_json(&revision);
      }
      print_revision(&graph, &revision)
    }
    RevisionCommand::Find { package, version } => match graph.by_version(package, &version)? {
      Some(revision) => {
        println!("{}", summary(&revision));
        Ok(())
      }
      None => bail!("package {} has no release named '{}'", package, version),
    },
    RevisionCommand::Branch { target } => {
      let from = target.read_key(&graph)?;
      let revision = graph.branch(from, session.actor()?)?;
      print_success(&format!("Branched {} {} {}", from, symbols::ARROW, revision.key()));
      Ok(())
    }
    RevisionCommand::Release { target, version } => {
      let key = target.read_key(&graph)?;
      let revision = graph.set_version(key, session.actor()?, &version)?;
      print_success(&format!(
        "Released {} as {}",
        key,
        revision.version_name.as_deref().unwrap_or(&version)
      ));
      Ok(())
    }
    RevisionCommand::Message { target, message } => {
      let key = target.read_key(&graph)?;
      graph.set_message(key, session.actor()?, &message)?;
      print_success(&format!("Updated message of {}", key));
      Ok(())
    }
  }
}

fn summary(revision: &Revision) -> String {
  let mut line = revision.key().to_string();
  if let Some(version) = &revision.version_name {
    line.push_str(&format!(" [{}]", version));
  }
  line.push_str(&format!(" by {}", revision.author));
  if !revision.message.is_empty() {
    line.push_str(&format!(": {}", revision.message));
  }
  line
}

fn print_revision(graph: &RevisionGraph, revision: &Revision) -> Result<()> {
  print_success(&summary(revision));
  print_stat("Created", &format_timestamp(revision.created_at));
  if let Some(origin) = revision.origin {
    print_stat("Branched from", &origin.to_string());
  }
  if let Some(sdk) = revision.sdk {
    let label = match graph.sdks().get(sdk)? {
      Some(sdk) => format!("{} {} ({})", sdk.name, sdk.version, sdk.id),
      None => format!("{} (unknown)", sdk),
    };
    print_stat("SDK", &label);
  }

  println!();
  print_stat("Modules", &revision.modules.len().to_string());
  for module in &revision.modules {
    print_item(&format!("{} {}", module.filename, truncate_hash(module.content.as_str())));
  }

  if revision.attachments.is_empty() {
    print_info("No attachments.");
  } else {
    print_stat("Attachments", &revision.attachments.len().to_string());
    for attachment in &revision.attachments {
      print_item(&format!("{} ({})", attachment.display_name(), format_bytes(attachment.size)));
    }
  }

  if revision.dependencies.is_empty() {
    print_info("No dependencies.");
  } else {
    print_stat("Dependencies", &revision.dependencies.len().to_string());
    for edge in &revision.dependencies {
      print_item(&format!("{} {} {}", edge.name, symbols::ARROW, edge.target()));
    }
  }
  Ok(())
}
