//! Terminal output: status lines, human-readable values, and JSON.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{AnsiColors, OwoColorize, Stream};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
}

/// Kind of a one-line status message. Errors and warnings go to stderr.
#[derive(Debug, Clone, Copy)]
enum Status {
  Success,
  Error,
  Warning,
  Info,
}

impl Status {
  fn symbol(self) -> &'static str {
    match self {
      Status::Success => "✓",
      Status::Error => "✗",
      Status::Warning => "⚠",
      Status::Info => symbols::INFO,
    }
  }

  fn color(self) -> AnsiColors {
    match self {
      Status::Success => AnsiColors::Green,
      Status::Error => AnsiColors::Red,
      Status::Warning => AnsiColors::Yellow,
      Status::Info => AnsiColors::Blue,
    }
  }

  fn to_stderr(self) -> bool {
    matches!(self, Status::Error | Status::Warning)
  }
}

fn emit(status: Status, message: &str) {
  let color = status.color();
  if status.to_stderr() {
    eprintln!(
      "{} {}",
      status.symbol().if_supports_color(Stream::Stderr, |s| s.color(color)),
      message.if_supports_color(Stream::Stderr, |s| s.color(color))
    );
  } else {
    println!(
      "{} {}",
      status.symbol().if_supports_color(Stream::Stdout, |s| s.color(color)),
      message
    );
  }
}

pub fn print_success(message: &str) {
  emit(Status::Success, message);
}

pub fn print_error(message: &str) {
  emit(Status::Error, message);
}

pub fn print_warning(message: &str) {
  emit(Status::Warning, message);
}

pub fn print_info(message: &str) {
  emit(Status::Info, message);
}

/// An indented `label: value` line under a status line.
pub fn print_stat(label: &str, value: &str) {
  println!("  {}: {}", label.if_supports_color(Stream::Stdout, |s| s.dimmed()), value);
}

/// One `• item` line, indented under a heading.
pub fn print_item(item: &str) {
  println!("    {} {}", symbols::INFO, item);
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

/// First 12 characters of a content hash.
pub fn truncate_hash(hash: &str) -> &str {
  hash.get(..12).unwrap_or(hash)
}

pub fn format_bytes(bytes: u64) -> String {
  const UNITS: [&str; 3] = ["KB", "MB", "GB"];
  if bytes < 1024 {
    return format!("{} B", bytes);
  }
  let mut value = bytes as f64 / 1024.0;
  let mut unit = 0;
  while value >= 1024.0 && unit + 1 < UNITS.len() {
    value /= 1024.0;
    unit += 1;
  }
  format!("{:.1} {}", value, UNITS[unit])
}

pub fn format_duration(duration: Duration) -> String {
  match duration.as_secs() {
    0 => format!("{}ms", duration.subsec_millis()),
    s @ 1..60 => format!("{}.{:02}s", s, duration.subsec_millis() / 10),
    s => format!("{}m {}s", s / 60, s % 60),
  }
}

/// Formats a unix timestamp as RFC 3339 (UTC, seconds precision).
pub fn format_timestamp(secs: u64) -> String {
  let time = std::time::UNIX_EPOCH + Duration::from_secs(secs);
  humantime::format_rfc3339_seconds(time).to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hashes_are_cut_to_twelve_chars() {
    assert_eq!(truncate_hash("abcdef123456789"), "abcdef123456");
    assert_eq!(truncate_hash("short"), "short");
  }

  #[test]
  fn sizes_pick_the_largest_whole_unit() {
    assert_eq!(format_bytes(500), "500 B");
    assert_eq!(format_bytes(1536), "1.5 KB");
    assert_eq!(format_bytes(1048576), "1.0 MB");
    assert_eq!(format_bytes(3 * 1073741824), "3.0 GB");
  }

  #[test]
  fn durations_scale_with_magnitude() {
    assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
    assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
  }

  #[test]
  fn timestamps_are_rfc3339() {
    assert_eq!(format_timestamp(0), "1970-01-01T00:00:00Z");
    assert_eq!(format_timestamp(86_400 + 61), "1970-01-02T00:01:01Z");
  }
}
