use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use tracing::debug;

use muslcross_lib::environment::HostEnv;
use muslcross_lib::pipeline::{self, InstallOptions, PipelineError};
use muslcross_lib::platform::Platform;

use crate::cmd::{InstallArgs, load_settings, runtime};
use crate::output::{self, Status};

/// Execute the install command.
///
/// Fetches every source, builds the selected targets with musl-cross-make and
/// links the resulting binaries into `<prefix>/bin`.
pub fn cmd_install(args: InstallArgs, config: Option<&Path>, base_env: &HostEnv) -> Result<()> {
  let mut settings = load_settings(config)?;
  if let Some(prefix) = args.prefix {
    settings.prefix = Some(prefix);
  }
  if let Some(jobs) = args.jobs {
    settings.jobs = Some(jobs);
  }
  settings.validate().context("Invalid install options")?;

  let host = Platform::current().ok_or(PipelineError::UnsupportedHost)?;
  debug!(host = %host, prefix = ?settings.prefix(), "installing");

  let options = InstallOptions {
    overrides: args.targets.overrides(),
    verify: !args.no_verify,
    keep_work: args.keep_work,
    command: std::env::args().collect::<Vec<_>>().join(" "),
  };

  let start = Instant::now();
  let rt = runtime()?;
  let outcome = rt
    .block_on(pipeline::install(&settings, host, base_env, &options))
    .context("Install failed")?;

  output::install_summary(&outcome, &settings.prefix(), start.elapsed());

  if let Some((triple, err)) = &outcome.build.failed {
    output::build_failure(triple, err, &outcome.build.skipped);
    bail!("Build of {} failed", triple);
  }

  if let Some(report) = &outcome.verification
    && !report.is_success()
  {
    output::verification_failures(report);
    bail!("Verification failed for {} target(s)", report.failures().count());
  }

  output::status(
    Status::Done,
    format_args!(
      "Installed {} toolchain(s) into {}",
      outcome.build.installed.len(),
      settings.prefix().display()
    ),
  );
  Ok(())
}
