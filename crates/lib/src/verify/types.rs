//! Verification report types.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Why a target failed verification.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerificationError {
  #[error("{program} exited with code {code:?}")]
  StepFailed { program: String, code: Option<i32> },

  #[error("{program} did not produce {path}")]
  MissingOutput { program: String, path: PathBuf },

  #[error("failed to run {program}: {message}")]
  Spawn { program: String, message: String },
}

/// One command run during verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
  pub program: String,
  pub args: Vec<String>,
  pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetReport {
  pub triple: String,
  pub steps: Vec<Step>,
  pub error: Option<VerificationError>,
}

impl TargetReport {
  pub fn is_success(&self) -> bool {
    self.error.is_none()
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
  pub targets: Vec<TargetReport>,
}

impl VerificationReport {
  pub fn is_success(&self) -> bool {
    self.targets.iter().all(TargetReport::is_success)
  }

  pub fn failures(&self) -> impl Iterator<Item = &TargetReport> {
    self.targets.iter().filter(|t| !t.is_success())
  }
}
