//! Interactive confirmation for destructive commands.

use std::io::{self, IsTerminal, Write};

use anyhow::{Result, bail};

/// Asks `question` on stderr. `--force` answers yes without asking; a
/// non-interactive session without `--force` is an error, never a silent yes.
pub fn confirm(question: &str, force: bool) -> Result<bool> {
  if force {
    return Ok(true);
  }

  let interactive = io::stdin().is_terminal() && io::stderr().is_terminal();
  if !interactive {
    bail!("'{}' needs confirmation; rerun with --force", question);
  }

  let mut stderr = io::stderr();
  write!(stderr, "{} [y/N] ", question)?;
  stderr.flush()?;

  let mut answer = String::new();
  io::stdin().read_line(&mut answer)?;
  Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
