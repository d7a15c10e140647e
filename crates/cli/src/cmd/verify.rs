use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use muslcross_lib::pipeline;

use crate::cmd::{TargetArgs, load_settings, runtime};
use crate::output;

/// Execute the verify command.
///
/// Compiles the smoke-test programs with each selected toolchain already linked
/// into the prefix and runs the prefixed binutils over the results.
pub fn cmd_verify(
  targets: &TargetArgs,
  prefix: Option<PathBuf>,
  json: bool,
  verbose: bool,
  config: Option<&Path>,
) -> Result<()> {
  let mut settings = load_settings(config)?;
  if let Some(prefix) = prefix {
    settings.prefix = Some(prefix);
  }

  let rt = runtime()?;
  let report = rt
    .block_on(pipeline::verify_installed(&settings, &targets.overrides()))
    .context("Verification failed")?;

  if json {
    output::json(&report)?;
  } else {
    for target in &report.targets {
      output::target_report(target, verbose);
    }
  }

  let failed = report.failures().count();
  if failed > 0 {
    bail!("{} of {} target(s) failed verification", failed, report.targets.len());
  }
  Ok(())
}
