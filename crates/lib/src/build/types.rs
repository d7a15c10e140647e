//! Build errors and results.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
  /// make exited unsuccessfully.
  #[error("build of {triple} failed with exit code {code:?}; see {log}")]
  MakeFailed {
    triple: String,
    code: Option<i32>,
    log: PathBuf,
    /// Last lines of the log.
    tail: String,
  },

  /// make succeeded but the compiler driver was not installed.
  #[error("build of {triple} did not produce {path}")]
  MissingCompiler { triple: String, path: PathBuf },

  #[error("failed to run {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl BuildError {
  /// The target being built when the error occurred, if any.
  pub fn triple(&self) -> Option<&str> {
    match self {
      BuildError::MakeFailed { triple, .. } | BuildError::MissingCompiler { triple, .. } => Some(triple),
      BuildError::Spawn { .. } | BuildError::Io(_) => None,
    }
  }
}

/// An installed cross toolchain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolchainInstall {
  pub triple: String,
  /// Directory holding `<triple>-cc`, `<triple>-c++` and the binutils.
  pub bin_dir: PathBuf,
}

impl ToolchainInstall {
  pub fn new(triple: impl Into<String>, bin_dir: impl Into<PathBuf>) -> Self {
    Self {
      triple: triple.into(),
      bin_dir: bin_dir.into(),
    }
  }

  /// Path of a prefixed tool, e.g. `tool("readelf")` for `<triple>-readelf`.
  pub fn tool(&self, name: &str) -> PathBuf {
    self.bin_dir.join(format!("{}-{}", self.triple, name))
  }
}

/// Outcome of building a selection.
#[derive(Debug, Default)]
pub struct BuildRun {
  /// Targets built successfully, in build order.
  pub installed: Vec<ToolchainInstall>,

  /// The target that failed (at most one, stops the run).
  pub failed: Option<(String, BuildError)>,

  /// Targets not attempted because an earlier one failed.
  pub skipped: Vec<String>,
}

impl BuildRun {
  pub fn is_success(&self) -> bool {
    self.failed.is_none()
  }
}
