//! Running make for each target.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::build::types::{BuildError, BuildRun, ToolchainInstall};
use crate::consts::LOG_TAIL_LINES;
use crate::target::{Selection, TargetSpec};

/// Everything needed to invoke make for any target.
#[derive(Debug, Clone)]
pub struct BuildContext {
  pub make: String,
  pub jobs: Option<usize>,
  /// Staged musl-cross-make tree containing `config.mak`.
  pub source_dir: PathBuf,
  /// `OUTPUT` from `config.mak`; toolchains land in `<output>/bin`.
  pub output_dir: PathBuf,
  pub logs_dir: PathBuf,
  /// The complete child environment.
  pub env: BTreeMap<String, String>,
}

impl BuildContext {
  fn make_args(&self, triple: &str) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(jobs) = self.jobs {
      args.push(format!("-j{jobs}"));
    }
    args.push("install".to_string());
    args.push(format!("TARGET={triple}"));
    args
  }

  pub fn log_path(&self, triple: &str) -> PathBuf {
    self.logs_dir.join(format!("{triple}.log"))
  }
}

/// Build and install one target.
pub async fn build_target(spec: &TargetSpec, ctx: &BuildContext) -> Result<ToolchainInstall, BuildError> {
  let triple = spec.triple;
  let log_path = ctx.log_path(triple);
  let args = ctx.make_args(triple);

  info!(triple = %triple, make = %ctx.make, log = ?log_path, "building toolchain");

  tokio::fs::create_dir_all(&ctx.logs_dir).await?;
  let log = File::create(&log_path)?;
  let log_err = log.try_clone()?;

  debug!(args = ?args, cwd = ?ctx.source_dir, "spawning make");
  let status = Command::new(&ctx.make)
    .args(&args)
    .current_dir(&ctx.source_dir)
    .env_clear()
    .envs(&ctx.env)
    .stdin(Stdio::null())
    .stdout(Stdio::from(log))
    .stderr(Stdio::from(log_err))
    .status()
    .await
    .map_err(|source| BuildError::Spawn {
      program: ctx.make.clone(),
      source,
    })?;

  if !status.success() {
    let tail = log_tail(&log_path, LOG_TAIL_LINES).await;
    error!(triple = %triple, code = ?status.code(), log = ?log_path, "build failed");
    return Err(BuildError::MakeFailed {
      triple: triple.to_string(),
      code: status.code(),
      log: log_path,
      tail,
    });
  }

  let install = ToolchainInstall::new(triple, ctx.output_dir.join("bin"));
  let cc = install.tool("cc");
  if !cc.exists() {
    return Err(BuildError::MissingCompiler {
      triple: triple.to_string(),
      path: cc,
    });
  }

  info!(triple = %triple, "toolchain installed");
  Ok(install)
}

/// Build every selected target in order, stopping at the first failure.
pub async fn build_all(selection: &Selection, ctx: &BuildContext) -> BuildRun {
  let mut run = BuildRun::default();
  let mut remaining = selection.targets().iter();

  for spec in remaining.by_ref() {
    match build_target(spec, ctx).await {
      Ok(install) => run.installed.push(install),
      Err(e) => {
        run.failed = Some((spec.triple.to_string(), e));
        break;
      }
    }
  }

  run.skipped = remaining.map(|t| t.triple.to_string()).collect();
  if !run.skipped.is_empty() {
    warn!(skipped = ?run.skipped, "remaining targets skipped");
  }

  run
}

/// Last `lines` lines of a log file; empty if it cannot be read.
async fn log_tail(path: &Path, lines: usize) -> String {
  match tokio::fs::read(path).await {
    Ok(bytes) => {
      let text = String::from_utf8_lossy(&bytes);
      let all: Vec<&str> = text.lines().collect();
      all[all.len().saturating_sub(lines)..].join("\n")
    }
    Err(e) => {
      warn!(path = ?path, error = %e, "could not read build log");
      String::new()
    }
  }
}
