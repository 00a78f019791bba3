use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Subcommand;

use crate::output::{format_bytes, print_success};
use crate::session::{Session, Target};

#[derive(Subcommand, Debug)]
pub enum AttachmentCommand {
  /// Upload a file as an attachment
  Add {
    #[command(flatten)]
    target: Target,

    file: PathBuf,

    /// Attach under this name instead of the file's own
    #[arg(long)]
    name: Option<String>,
  },

  /// Remove an attachment
  Remove {
    #[command(flatten)]
    target: Target,

    name: String,
  },

  /// Fetch an attachment's stored bytes
  Get {
    #[command(flatten)]
    target: Target,

    name: String,

    /// Where to write it (default: ./<name>)
    #[arg(long)]
    out: Option<PathBuf>,
  },
}

pub fn cmd_attachment(session: &Session, command: AttachmentCommand) -> Result<()> {
  let graph = session.graph();

  match command {
    AttachmentCommand::Add { target, file, name } => {
      let actor = session.actor()?;
      let original = match name {
        Some(name) => name,
        None => file
          .file_name()
          .map(|n| n.to_string_lossy().into_owned())
          .ok_or_else(|| anyhow!("{} has no file name", file.display()))?,
      };
      let bytes = fs::read(&file).with_context(|| format!("Failed to read {}", file.display()))?;

      let key = target.edit_key(&graph, actor)?;
      let revision = graph.add_attachment(key, actor, &original, &bytes)?;
      let added = revision
        .attachments
        .last()
        .map(|a| a.display_name())
        .unwrap_or(original);
      print_success(&format!("Attached {} to {} ({})", added, key, format_bytes(bytes.len() as u64)));
      Ok(())
    }
    AttachmentCommand::Remove { target, name } => {
      let actor = session.actor()?;
      let key = target.edit_key(&graph, actor)?;
      graph.remove_attachment(key, actor, &name)?;
      print_success(&format!("Removed attachment {} from {}", name, key));
      Ok(())
    }
    AttachmentCommand::Get { target, name, out } => {
      let key = target.read_key(&graph)?;
      let (attachment, bytes) = graph.attachment_bytes(key, &name)?;
      let out = out.unwrap_or_else(|| PathBuf::from(attachment.display_name()));
      fs::write(&out, &bytes).with_context(|| format!("Failed to write {}", out.display()))?;
      print_success(&format!("Wrote {} ({})", out.display(), format_bytes(bytes.len() as u64)));
      Ok(())
    }
  }
}
