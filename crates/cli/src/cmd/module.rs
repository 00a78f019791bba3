use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::Subcommand;

use crate::output::{OutputFormat, print_info, print_json, print_success, symbols, truncate_hash};
use crate::session::{Session, Target};

#[derive(Subcommand, Debug)]
pub enum ModuleCommand {
  /// List a revision's modules
  List {
    #[command(flatten)]
    target: Target,

    /// Include modules pulled in from dependencies and the core library
    #[arg(long)]
    resolved: bool,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Print a module's source
  Cat {
    #[command(flatten)]
    target: Target,

    filename: String,
  },

  /// Add a module
  Add {
    #[command(flatten)]
    target: Target,

    filename: String,

    /// Read the initial source from this file
    #[arg(long)]
    source: Option<PathBuf>,
  },

  /// Remove a module
  Remove {
    #[command(flatten)]
    target: Target,

    filename: String,
  },

  /// Replace module sources: `<module>=<path>` pairs
  Save {
    #[command(flatten)]
    target: Target,

    #[arg(required = true, value_parser = parse_assignment)]
    changes: Vec<(String, PathBuf)>,
  },
}

pub fn cmd_module(session: &Session, command: ModuleCommand) -> Result<()> {
  let graph = session.graph();

  match command {
    ModuleCommand::List {
      target,
      resolved,
      output,
    } => {
      let key = target.read_key(&graph)?;
      if resolved {
        let modules = graph.resolve_transitive_modules(key)?;
        if output.is_json() {
          return print_json(&modules);
        }
        for entry in &modules {
          println!(
            "{} {} {} {}",
            symbols::INFO,
            entry.module.filename,
            symbols::ARROW,
            entry.owner
          );
        }
        return Ok(());
      }

      let revision = graph.revision(key)?;
      if output.is_json() {
        return print_json(&revision.modules);
      }
      if revision.modules.is_empty() {
        print_info("No modules.");
      }
      for module in &revision.modules {
        println!(
          "{} {} {}",
          symbols::INFO,
          module.filename,
          truncate_hash(module.content.as_str())
        );
      }
      Ok(())
    }
    ModuleCommand::Cat { target, filename } => {
      let source = graph.module_source(target.read_key(&graph)?, &filename)?;
      print!("{}", source);
      Ok(())
    }
    ModuleCommand::Add {
      target,
      filename,
      source,
    } => {
      let actor = session.actor()?;
      let key = target.edit_key(&graph, actor)?;
      let source = source.map(|path| read_source(&path)).transpose()?;
      graph.add_module(key, actor, &filename, source.as_deref())?;
      print_success(&format!("Added module {} to {}", filename, key));
      Ok(())
    }
    ModuleCommand::Remove { target, filename } => {
      let actor = session.actor()?;
      let key = target.edit_key(&graph, actor)?;
      graph.remove_module(key, actor, &filename)?;
      print_success(&format!("Removed module {} from {}", filename, key));
      Ok(())
    }
    ModuleCommand::Save { target, changes } => {
      let actor = session.actor()?;
      let key = target.edit_key(&graph, actor)?;
      let sources = read_sources(&changes)?;
      let (_, changed) = graph.update_modules(key, actor, &sources)?;
      if changed.is_empty() {
        print_info(&format!("No changes to {}", key));
      } else {
        print_success(&format!("Saved {} in {}", changed.join(", "), key));
      }
      Ok(())
    }
  }
}

/// Parses `<name>=<path>`.
pub fn parse_assignment(s: &str) -> Result<(String, PathBuf), String> {
  let (name, path) = s
    .split_once('=')
    .ok_or_else(|| format!("expected <module>=<path>, got '{}'", s))?;
  if name.is_empty() || path.is_empty() {
    return Err(format!("expected <module>=<path>, got '{}'", s));
  }
  Ok((name.to_string(), PathBuf::from(path)))
}

fn read_source(path: &Path) -> Result<String> {
  fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Reads every `<module>=<path>` pair; a module named twice is an error.
pub fn read_sources(changes: &[(String, PathBuf)]) -> Result<BTreeMap<String, String>> {
  let mut sources = BTreeMap::new();
  for (name, path) in changes {
    if sources.insert(name.clone(), read_source(path)?).is_some() {
      return Err(anyhow!("module {} given more than once", name));
    }
  }
  Ok(sources)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn assignment_parsing() {
    assert_eq!(
      parse_assignment("main=src/main.js").unwrap(),
      ("main".to_string(), PathBuf::from("src/main.js"))
    );
    assert_eq!(
      parse_assignment("a=b=c").unwrap(),
      ("a".to_string(), PathBuf::from("b=c"))
    );
    assert!(parse_assignment("main").is_err());
    assert!(parse_assignment("=x").is_err());
    assert!(parse_assignment("main=").is_err());
  }

  #[test]
  fn duplicate_module_rejected() {
    let temp = tempfile::TempDir::new().unwrap();
    let path = temp.path().join("m.js");
    fs::write(&path, "x").unwrap();

    let ok = read_sources(&[("main".into(), path.clone())]).unwrap();
    assert_eq!(ok["main"], "x");

    let err = read_sources(&[("main".into(), path.clone()), ("main".into(), path)]).unwrap_err();
    assert!(err.to_string().contains("more than once"));
  }
}
