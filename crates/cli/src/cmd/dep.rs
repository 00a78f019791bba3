use anyhow::Result;
use clap::Subcommand;

use flightdeck_lib::package::PackageId;
use flightdeck_lib::revision::LibraryPin;

use crate::output::{print_success, symbols};
use crate::session::{Session, Target};

#[derive(Subcommand, Debug)]
pub enum DepCommand {
  /// Depend on a library revision (its newest unless told otherwise)
  Add {
    #[command(flatten)]
    target: Target,

    /// Library package id
    library: PackageId,

    /// Pin the library's newest released revision
    #[arg(long, conflicts_with = "library_revision")]
    released: bool,

    /// Pin this exact library revision
    #[arg(long)]
    library_revision: Option<u32>,
  },

  /// Drop the dependency on a library
  Remove {
    #[command(flatten)]
    target: Target,

    /// Library package id
    library: PackageId,
  },
}

pub fn cmd_dep(session: &Session, command: DepCommand) -> Result<()> {
  let graph = session.graph();
  let actor = session.actor()?;

  match command {
    DepCommand::Add {
      target,
      library,
      released,
      library_revision,
    } => {
      let pin = match (released, library_revision) {
        (_, Some(number)) => LibraryPin::Exact(number),
        (true, None) => LibraryPin::NewestReleased,
        (false, None) => LibraryPin::Newest,
      };
      let key = target.edit_key(&graph, actor)?;
      let revision = graph.add_library(key, actor, library, pin)?;
      if let Some(edge) = revision.dependency(library) {
        print_success(&format!("{} now depends on {} {} {}", key, edge.name, symbols::ARROW, edge.target()));
      }
      Ok(())
    }
    DepCommand::Remove { target, library } => {
      let key = target.edit_key(&graph, actor)?;
      graph.remove_dependency(key, actor, library)?;
      print_success(&format!("Removed dependency on {} from {}", library, key));
      Ok(())
    }
  }
}
