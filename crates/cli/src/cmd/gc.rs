use std::time::{Duration, Instant};

use anyhow::Result;

use flightdeck_lib::gc::{GcOptions, collect_garbage};

use crate::output::{OutputFormat, format_bytes, format_duration, print_info, print_json, print_stat, print_success};
use crate::session::Session;

pub fn cmd_gc(session: &Session, max_age: Duration, dry_run: bool, output: OutputFormat) -> Result<()> {
  let start = Instant::now();
  let options = GcOptions { max_age, dry_run };

  let result = collect_garbage(&session.graph(), &session.config.registry(), &options)?;

  if output.is_json() {
    print_json(&result)?;
  } else {
    println!();
    if dry_run {
      print_info("Dry run - no changes made");
    } else {
      print_success("Garbage collection complete!");
    }
    print_stat("Workspaces removed", &result.stats.workspaces_deleted.to_string());
    print_stat("Blobs removed", &result.stats.blobs_deleted.to_string());
    print_stat("Total", &result.stats.total_deleted().to_string());
    print_stat("Space freed", &format_bytes(result.stats.total_bytes_freed()));
    print_stat("Duration", &format_duration(start.elapsed()));
  }

  Ok(())
}
