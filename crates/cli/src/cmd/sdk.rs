use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;

use flightdeck_lib::sdk::SdkId;

use crate::output::{OutputFormat, print_info, print_json, print_success, symbols};
use crate::session::{Session, Target};

#[derive(Subcommand, Debug)]
pub enum SdkCommand {
  /// Register an SDK release
  Add {
    name: String,
    version: String,

    /// Interpreter passed to the toolchain as `--binary`
    #[arg(long)]
    interpreter: Option<PathBuf>,
  },

  /// List registered SDKs
  List {
    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Build an addon revision against another SDK
  Switch {
    #[command(flatten)]
    target: Target,

    sdk: SdkId,
  },
}

pub fn cmd_sdk(session: &Session, command: SdkCommand) -> Result<()> {
  let graph = session.graph();

  match command {
    SdkCommand::Add {
      name,
      version,
      interpreter,
    } => {
      let interpreter = interpreter.map(|p| dunce::canonicalize(&p).unwrap_or(p));
      let sdk = graph.sdks().register(&name, &version, interpreter)?;
      print_success(&format!("Registered {} {} as sdk {}", sdk.name, sdk.version, sdk.id));
      Ok(())
    }
    SdkCommand::List { output } => {
      let sdks = graph.sdks().list()?;
      if output.is_json() {
        return print_json(&sdks);
      }
      if sdks.is_empty() {
        print_info("No SDKs registered.");
      }
      for sdk in &sdks {
        match &sdk.interpreter {
          Some(path) => println!(
            "{} {} {} {} ({})",
            symbols::INFO,
            sdk.id,
            sdk.name,
            sdk.version,
            path.display()
          ),
          None => println!("{} {} {} {}", symbols::INFO, sdk.id, sdk.name, sdk.version),
        }
      }
      Ok(())
    }
    SdkCommand::Switch { target, sdk } => {
      let actor = session.actor()?;
      let key = target.edit_key(&graph, actor)?;
      graph.switch_sdk(key, actor, sdk)?;
      print_success(&format!("{} now builds with sdk {}", key, sdk));
      Ok(())
    }
  }
}
