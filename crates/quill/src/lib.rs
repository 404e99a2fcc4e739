//! ## Features
//!
//! - Standard logging levels (info, warn, error, debug, success, verbose)
//! - Multi-line messages kept aligned under one prefix per line
//! - Timestamped `event_*` variants for long-running background work
//! - Banner displays (announce, flourish) for run boundaries
//! - All output to stderr, so command stdout stays machine-readable
//!
//! ## Usage
//!
//! Level functions: `info()`, `warn()`, `error()`, `debug()`, `success()`, `verbose()`
//!
//! Banners: `announce()`, `flourish()`
//!
//! Event logging: `event_info()`, `event_warn()`, `event_error()`, `event_success()`

use chrono::Local;
use colored::*;

/// Core logging function that handles the actual output
pub fn log(message: &str) {
  for line in message.lines() {
    eprintln!("{line}");
  }
}

/// Format a bracketed, colored, width-aligned level tag
fn level_tag(color: Color, label: &str) -> String {
  format!("[{}]", format!("{label:<5}").color(color).bold())
}

/// A horizontal rule of `length` copies of `char`
pub fn banner_line(length: usize, char: char) -> String {
  char.to_string().repeat(length)
}

/// Display a message between two banner lines
pub fn as_banner<F>(log_fn: F, message: &str, width: usize, border_char: char)
where
  F: Fn(&str),
{
  let banner = banner_line(width, border_char);

  log_fn(&banner);
  log_fn(message);
  log_fn(&banner);
}

pub fn verbose(message: &str) {
  let tag = level_tag(Color::Cyan, "verb");
  for line in message.lines() {
    log(&format!("{tag} {line}"));
  }
}

/// Info level logging - general information
pub fn info(message: &str) {
  let tag = level_tag(Color::Blue, "info");
  for line in message.lines() {
    log(&format!("{tag} {line}"));
  }
}

/// Warning level logging - something needs attention
pub fn warn(message: &str) {
  let tag = level_tag(Color::Yellow, "warn");
  for line in message.lines() {
    log(&format!("{tag} {line}"));
  }
}

/// Error level logging - something went wrong
pub fn error(message: &str) {
  let tag = level_tag(Color::Red, "error");
  for line in message.lines() {
    log(&format!("{tag} {line}"));
  }
}

/// Debug level logging - detailed diagnostic information
pub fn debug(message: &str) {
  let tag = level_tag(Color::Magenta, "debug");
  for line in message.lines() {
    log(&format!("{tag} {line}"));
  }
}

/// Success level logging - something completed successfully
pub fn success(message: &str) {
  let tag = level_tag(Color::Green, "done");
  for line in message.lines() {
    log(&format!("{tag} {line}"));
  }
}

/// Timestamped info event
pub fn event_info(message: &str) {
  let timestamp = Local::now().format("%H:%M:%S").to_string();
  let tag = format!("[{}] [{}]", "event".blue().bold(), timestamp.cyan());
  for line in message.lines() {
    log(&format!("{tag} {line}"));
  }
}

/// Timestamped warning event
pub fn event_warn(message: &str) {
  let timestamp = Local::now().format("%H:%M:%S").to_string();
  let tag = format!("[{}] [{}]", "event".yellow().bold(), timestamp.cyan());
  for line in message.lines() {
    log(&format!("{tag} {line}"));
  }
}

/// Timestamped error event
pub fn event_error(message: &str) {
  let timestamp = Local::now().format("%H:%M:%S").to_string();
  let tag = format!("[{}] [{}]", "event".red().bold(), timestamp.cyan());
  for line in message.lines() {
    log(&format!("{tag} {line}"));
  }
}

/// Timestamped success event
pub fn event_success(message: &str) {
  let timestamp = Local::now().format("%H:%M:%S").to_string();
  let tag = format!("[{}] [{}]", "event".green().bold(), timestamp.cyan());
  for line in message.lines() {
    log(&format!("{tag} {line}"));
  }
}

/// Banner announcement - marks the start of a run or phase
pub fn announce(message: &str) {
  as_banner(|msg| log(&msg.blue().bold().to_string()), message, 50, '-');
}

/// Flourish - celebrate successful completion
pub fn flourish(message: &str) {
  as_banner(|msg| log(&msg.green().bold().to_string()), message, 45, '~');
}

#[macro_export]
macro_rules! verbose {
  ($msg:expr) => {
    $crate::verbose($msg);
  };
}

#[macro_export]
macro_rules! info {
  ($msg:expr) => {
    $crate::info($msg);
  };
}

#[macro_export]
macro_rules! warn {
  ($msg:expr) => {
    $crate::warn($msg);
  };
}

#[macro_export]
macro_rules! error {
  ($msg:expr) => {
    $crate::error($msg);
  };
}

#[macro_export]
macro_rules! debug {
  ($msg:expr) => {
    $crate::debug($msg);
  };
}

#[macro_export]
macro_rules! success {
  ($msg:expr) => {
    $crate::success($msg);
  };
}

#[macro_export]
macro_rules! event_info {
  ($msg:expr) => {
    $crate::event_info($msg);
  };
}

#[macro_export]
macro_rules! event_warn {
  ($msg:expr) => {
    $crate::event_warn($msg);
  };
}

#[macro_export]
macro_rules! event_error {
  ($msg:expr) => {
    $crate::event_error($msg);
  };
}

#[macro_export]
macro_rules! event_success {
  ($msg:expr) => {
    $crate::event_success($msg);
  };
}

#[macro_export]
macro_rules! announce {
  ($msg:expr) => {
    $crate::announce($msg);
  };
}

#[macro_export]
macro_rules! flourish {
  ($msg:expr) => {
    $crate::flourish($msg);
  };
}
