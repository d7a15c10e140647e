//! Terminal reporting for muslcross commands.
//!
//! Results go to stdout. Failures and skipped work go to stderr, so a
//! redirected `install` log still shows why the run stopped.

use std::fmt::Display;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use owo_colors::{OwoColorize, Stream};

use muslcross_lib::build::BuildError;
use muslcross_lib::pipeline::InstallOutcome;
use muslcross_lib::resources::FetchedResource;
use muslcross_lib::target::TargetSpec;
use muslcross_lib::verify::{TargetReport, VerificationReport};

/// Kind of a one-line status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
  Done,
  Failed,
  Skipped,
  Note,
}

impl Status {
  fn symbol(self) -> &'static str {
    match self {
      Status::Done => "✓",
      Status::Failed => "✗",
      Status::Skipped => "⚠",
      Status::Note => "•",
    }
  }
}

pub fn status(kind: Status, message: impl Display) {
  let symbol = kind.symbol();
  match kind {
    Status::Done => println!("{} {}", symbol.if_supports_color(Stream::Stdout, |s| s.green()), message),
    Status::Note => println!("{} {}", symbol.if_supports_color(Stream::Stdout, |s| s.blue()), message),
    Status::Failed => eprintln!(
      "{} {}",
      symbol.if_supports_color(Stream::Stderr, |s| s.red()),
      message.to_string().if_supports_color(Stream::Stderr, |s| s.red())
    ),
    Status::Skipped => eprintln!(
      "{} {}",
      symbol.if_supports_color(Stream::Stderr, |s| s.yellow()),
      message.to_string().if_supports_color(Stream::Stderr, |s| s.yellow())
    ),
  }
}

/// An indented `label: value` line under a status message.
pub fn field(label: &str, value: impl Display) {
  println!("  {}: {}", label.if_supports_color(Stream::Stdout, |s| s.dimmed()), value);
}

pub fn json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let text = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", text);
  Ok(())
}

/// Size of a source archive. Config tarballs are a few KiB, GCC is ~85 MiB.
pub fn archive_size(bytes: u64) -> String {
  const KIB: u64 = 1024;
  const MIB: u64 = KIB * 1024;

  if bytes >= MIB {
    format!("{:.1} MiB", bytes as f64 / MIB as f64)
  } else {
    format!("{} KiB", bytes.div_ceil(KIB))
  }
}

/// Wall time of a toolchain build, which runs from minutes to hours.
pub fn elapsed(duration: Duration) -> String {
  let secs = duration.as_secs();
  match (secs / 3600, secs / 60 % 60, secs % 60) {
    (0, 0, s) => format!("{s}s"),
    (0, m, s) => format!("{m}m {s:02}s"),
    (h, m, _) => format!("{h}h {m:02}m"),
  }
}

pub fn fetched(item: &FetchedResource) {
  let state = if item.cached { "cached" } else { "downloaded" };
  status(
    Status::Note,
    format_args!(
      "{} {} ({}, {})",
      item.resource.name,
      item.resource.version,
      state,
      archive_size(item.size)
    ),
  );
}

/// What an install run produced, whether or not it succeeded.
pub fn install_summary(outcome: &InstallOutcome, prefix: &Path, took: Duration) {
  let downloaded = outcome.fetched.iter().filter(|f| !f.cached).count();
  status(
    Status::Note,
    format_args!("Sources: {} downloaded, {} cached", downloaded, outcome.fetched.len() - downloaded),
  );
  for install in &outcome.build.installed {
    status(Status::Done, format_args!("Built {}", install.triple));
  }
  if !outcome.links.is_empty() {
    field(
      "Linked",
      format_args!("{} binaries into {}", outcome.links.len(), prefix.join("bin").display()),
    );
  }
  if let Some(report) = &outcome.verification
    && report.is_success()
  {
    field("Verified", report.targets.len());
  }
  if outcome.work_kept {
    field("Work directory", outcome.work_dir.display());
  }
  field("Duration", elapsed(took));
}

/// The failed target, the end of its make log and the targets never tried.
pub fn build_failure(triple: &str, err: &BuildError, skipped: &[String]) {
  status(Status::Failed, format_args!("{}: {}", triple, err));
  if let BuildError::MakeFailed { tail, .. } = err
    && !tail.is_empty()
  {
    eprintln!("{}", indent_tail(tail));
  }
  for triple in skipped {
    status(Status::Skipped, format_args!("Skipped {}", triple));
  }
}

fn indent_tail(tail: &str) -> String {
  tail.lines().map(|line| format!("    | {line}")).collect::<Vec<_>>().join("\n")
}

pub fn verification_failures(report: &VerificationReport) {
  for target in report.failures() {
    if let Some(err) = &target.error {
      status(Status::Failed, format_args!("{}: {}", target.triple, err));
    }
  }
}

/// One verified target; with `steps`, every command that ran for it.
pub fn target_report(target: &TargetReport, steps: bool) {
  match &target.error {
    None => status(Status::Done, &target.triple),
    Some(err) => status(Status::Failed, format_args!("{}: {}", target.triple, err)),
  }

  if steps {
    for step in &target.steps {
      let kind = if step.success { Status::Done } else { Status::Failed };
      println!(
        "    {} {} {}",
        kind.symbol().if_supports_color(Stream::Stdout, |s| s.dimmed()),
        step.program,
        step.args.join(" ")
      );
    }
  }
}

/// Option identifiers aligned against their triples.
pub fn target_table(targets: &[TargetSpec]) {
  let width = targets.iter().map(|t| t.option.len()).max().unwrap_or(0);
  for target in targets {
    let marker = if target.default_enabled { " (default)" } else { "" };
    println!(
      "{:width$}  {}{}",
      target.option,
      target.triple.if_supports_color(Stream::Stdout, |s| s.dimmed()),
      marker,
      width = width
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn archive_sizes() {
    assert_eq!(archive_size(500), "1 KiB");
    assert_eq!(archive_size(45 * 1024), "45 KiB");
    assert_eq!(archive_size(1024 * 1024), "1.0 MiB");
    assert_eq!(archive_size(85_300_000), "81.3 MiB");
  }

  #[test]
  fn elapsed_build_times() {
    assert_eq!(elapsed(Duration::from_millis(900)), "0s");
    assert_eq!(elapsed(Duration::from_secs(42)), "42s");
    assert_eq!(elapsed(Duration::from_secs(187)), "3m 07s");
    assert_eq!(elapsed(Duration::from_secs(3725)), "1h 02m");
  }

  #[test]
  fn log_tail_is_indented() {
    assert_eq!(indent_tail("checking gmp\nerror: no\n"), "    | checking gmp\n    | error: no");
    assert_eq!(indent_tail(""), "");
  }
}
