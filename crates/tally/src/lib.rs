//! ## Features
//!
//! - Level prefixes for user-facing messages (info, warn, error, success)
//! - Multi-line message support with consistent formatting
//! - Banner displays for record headers
//! - All output to stderr, so stdout stays free for rendered screens
//! - `init()` wires a `tracing` subscriber for library diagnostics
//!
//! ## Usage
//!
//! Call `tally::init(verbosity)` once from `main`, then use `info()`, `warn()`,
//! `error()`, `success()` for messages meant for the reviewer and
//! `tracing` macros for diagnostics.

use colored::*;
use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the verbosity-derived log filter
pub const LOG_ENV: &str = "BOREVIEW_LOG";

/// Set up colors and the tracing subscriber.
///
/// Safe to call more than once; later calls keep the first subscriber.
pub fn init(verbosity: u8) {
  if !console::Term::stderr().features().colors_supported() {
    colored::control::set_override(false);
  }

  let filter = EnvFilter::try_from_env(LOG_ENV)
    .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .with_writer(std::io::stderr)
    .try_init();
}

/// Filter directive used when `BOREVIEW_LOG` is not set
pub fn default_filter(verbosity: u8) -> &'static str {
  match verbosity {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  }
}

/// Core output function, one stderr line per message line
pub fn log(message: &str) {
  for line in message.lines() {
    eprintln!("{line}");
  }
}

fn format_prefix(color: Color, prefix: &str) -> String {
  format!("[{}]{:<width$}", prefix.color(color).bold(), "", width = 7 - prefix.len() - 2)
}

/// Prefix every line of `message` with `prefix`
pub fn prefixed(prefix: &str, message: &str) -> Vec<String> {
  message.lines().map(|line| format!("{prefix} {line}")).collect()
}

fn emit(color: Color, tag: &str, message: &str) {
  let prefix = format_prefix(color, tag);
  for line in prefixed(&prefix, message) {
    log(&line);
  }
}

/// Create a banner line of the specified length and character
pub fn banner_line(length: usize, char: char) -> String {
  char.to_string().repeat(length)
}

/// Display a message with a banner around it
pub fn as_banner<F>(log_fn: F, message: &str, width: Option<usize>, border_char: Option<char>)
where
  F: Fn(&str),
{
  let width = width.unwrap_or(50);
  let border_char = border_char.unwrap_or('=');

  let banner = banner_line(width, border_char);

  log_fn(&banner);
  log_fn(message);
  log_fn(&banner);
}

/// General information
pub fn info(message: &str) {
  emit(Color::Blue, "info", message);
}

/// Something needs the reviewer's attention
pub fn warn(message: &str) {
  emit(Color::Yellow, "warn", message);
}

/// Something went wrong
pub fn error(message: &str) {
  emit(Color::Red, "error", message);
}

/// Something completed successfully
pub fn success(message: &str) {
  emit(Color::Green, "sccs", message);
}

/// Highlight the end of a review run
pub fn flourish(message: &str) {
  as_banner(|msg| log(&msg.green().bold().to_string()), message, Some(45), Some('~'));
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_filter_by_verbosity() {
    assert_eq!(default_filter(0), "warn");
    assert_eq!(default_filter(1), "info");
    assert_eq!(default_filter(2), "debug");
    assert_eq!(default_filter(9), "trace");
  }

  #[test]
  fn test_prefixed_splits_lines() {
    let lines = prefixed("[x]", "one\ntwo");
    assert_eq!(lines, vec!["[x] one".to_string(), "[x] two".to_string()]);
  }

  #[test]
  fn test_banner_line() {
    assert_eq!(banner_line(3, '-'), "---");
    assert_eq!(banner_line(0, '='), "");
  }

  #[test]
  fn test_format_prefix_pads_short_tags() {
    colored::control::set_override(false);
    assert_eq!(format_prefix(Color::Blue, "info"), "[info] ");
    assert_eq!(format_prefix(Color::Red, "error"), "[error]");
    colored::control::unset_override();
  }
}
