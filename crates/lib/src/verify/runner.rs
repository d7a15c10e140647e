use std::path::Path;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::build::ToolchainInstall;
use crate::verify::types::{Step, TargetReport, VerificationError, VerificationReport};

/// Binutils run against each compiled program, with their arguments.
pub const INSPECTIONS: &[(&str, &[&str])] = &[
  ("readelf", &["-a"]),
  ("objdump", &["-ldSC"]),
  ("strings", &[]),
  ("size", &[]),
  ("nm", &[]),
  ("strip", &[]),
];

const HELLO_C: &str = r#"#include <stdio.h>
int main(void) {
    puts("Hello World!");
    return 0;
}
"#;

const HELLO_CPP: &str = r#"#include <iostream>
int main(void) {
    std::cout << "Hello World!" << std::endl;
    return 0;
}
"#;

/// Compiler driver and source file for each language checked.
const PROGRAMS: &[(&str, &str)] = &[("cc", "hello.c"), ("c++", "hello.cpp")];

/// Verify every install, writing sources and binaries under `work_dir`.
///
/// Only setting up `work_dir` can fail the call itself; per-target failures
/// are recorded in the report.
pub async fn verify(installs: &[ToolchainInstall], work_dir: &Path) -> std::io::Result<VerificationReport> {
  tokio::fs::create_dir_all(work_dir).await?;
  tokio::fs::write(work_dir.join("hello.c"), HELLO_C).await?;
  tokio::fs::write(work_dir.join("hello.cpp"), HELLO_CPP).await?;

  let mut report = VerificationReport::default();
  for install in installs {
    let target = verify_target(install, work_dir).await;
    match &target.error {
      None => info!(triple = %install.triple, steps = target.steps.len(), "toolchain verified"),
      Some(e) => warn!(triple = %install.triple, error = %e, "toolchain verification failed"),
    }
    report.targets.push(target);
  }

  Ok(report)
}

async fn verify_target(install: &ToolchainInstall, work_dir: &Path) -> TargetReport {
  let mut report = TargetReport {
    triple: install.triple.clone(),
    steps: Vec::new(),
    error: None,
  };

  if let Err(e) = run_checks(install, work_dir, &mut report.steps).await {
    report.error = Some(e);
  }

  report
}

async fn run_checks(install: &ToolchainInstall, work_dir: &Path, steps: &mut Vec<Step>) -> Result<(), VerificationError> {
  let program = format!("hello-{}", install.triple);
  let output = work_dir.join(&program);

  for (driver, source) in PROGRAMS {
    let _ = tokio::fs::remove_file(&output).await;

    let compile_args = ["-O2", *source, "-o", program.as_str()];
    run_step(install, driver, &compile_args, work_dir, steps).await?;

    if !output.exists() {
      return Err(VerificationError::MissingOutput {
        program: tool_name(install, driver),
        path: output,
      });
    }

    for (tool, options) in INSPECTIONS {
      let mut args: Vec<&str> = options.to_vec();
      args.push(&program);
      run_step(install, tool, &args, work_dir, steps).await?;
    }
  }

  Ok(())
}

async fn run_step(
  install: &ToolchainInstall,
  tool: &str,
  args: &[&str],
  work_dir: &Path,
  steps: &mut Vec<Step>,
) -> Result<(), VerificationError> {
  let program = tool_name(install, tool);
  debug!(program = %program, args = ?args, "running check");

  let result = Command::new(install.tool(tool))
    .args(args)
    .current_dir(work_dir)
    .env_clear()
    .output()
    .await;

  let mut step = Step {
    program: program.clone(),
    args: args.iter().map(|a| a.to_string()).collect(),
    success: false,
  };

  let output = match result {
    Ok(output) => output,
    Err(e) => {
      steps.push(step);
      return Err(VerificationError::Spawn {
        program,
        message: e.to_string(),
      });
    }
  };

  step.success = output.status.success();
  steps.push(step);

  if !output.status.success() {
    debug!(stderr = %String::from_utf8_lossy(&output.stderr), "check failed");
    return Err(VerificationError::StepFailed {
      program,
      code: output.status.code(),
    });
  }

  Ok(())
}

fn tool_name(install: &ToolchainInstall, tool: &str) -> String {
  format!("{}-{}", install.triple, tool)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::fake_toolchain;
  use tempfile::TempDir;

  const STEPS_PER_TARGET: usize = 2 * (1 + 6);

  fn install(temp: &TempDir, triple: &str, failing: Option<&str>) -> ToolchainInstall {
    let bin = temp.path().join("bin");
    fake_toolchain(&bin, triple, failing);
    ToolchainInstall::new(triple, bin)
  }

  #[tokio::test]
  async fn healthy_toolchain_runs_every_step() {
    let temp = TempDir::new().unwrap();
    let installs = vec![install(&temp, "x86_64-linux-musl", None)];

    let report = verify(&installs, &temp.path().join("verify")).await.unwrap();

    assert!(report.is_success());
    let steps = &report.targets[0].steps;
    assert_eq!(steps.len(), STEPS_PER_TARGET);
    assert_eq!(steps[0].program, "x86_64-linux-musl-cc");
    assert_eq!(steps[0].args, vec!["-O2", "hello.c", "-o", "hello-x86_64-linux-musl"]);
    assert_eq!(steps[1].program, "x86_64-linux-musl-readelf");
    assert_eq!(steps[1].args, vec!["-a", "hello-x86_64-linux-musl"]);
    assert_eq!(steps[7].program, "x86_64-linux-musl-c++");
    assert!(temp.path().join("verify/hello.cpp").exists());
  }

  #[tokio::test]
  async fn failure_does_not_stop_later_targets() {
    let temp = TempDir::new().unwrap();
    let installs = vec![
      install(&temp, "x86_64-linux-musl", None),
      install(&temp, "aarch64-linux-musl", Some("objdump")),
      install(&temp, "s390x-linux-musl", None),
    ];

    let report = verify(&installs, &temp.path().join("verify")).await.unwrap();

    assert!(!report.is_success());
    assert!(report.targets[0].is_success());
    assert!(report.targets[2].is_success());
    assert_eq!(report.targets[2].steps.len(), STEPS_PER_TARGET);

    let failed = &report.targets[1];
    assert_eq!(
      failed.error,
      Some(VerificationError::StepFailed {
        program: "aarch64-linux-musl-objdump".to_string(),
        code: Some(1),
      })
    );
    assert_eq!(failed.steps.len(), 3);
    assert!(!failed.steps[2].success);
    assert_eq!(report.failures().count(), 1);
  }

  #[tokio::test]
  async fn compiler_without_output_is_reported() {
    let temp = TempDir::new().unwrap();
    let bin = temp.path().join("bin");
    fake_toolchain(&bin, "mips-linux-musl", None);
    crate::util::testutil::write_script(&bin.join("mips-linux-musl-cc"), "exit 0\n");

    let report = verify(
      &[ToolchainInstall::new("mips-linux-musl", &bin)],
      &temp.path().join("verify"),
    )
    .await
    .unwrap();

    assert!(matches!(
      report.targets[0].error,
      Some(VerificationError::MissingOutput { ref program, .. }) if program == "mips-linux-musl-cc"
    ));
  }

  #[tokio::test]
  async fn absent_toolchain_is_spawn_error() {
    let temp = TempDir::new().unwrap();
    let report = verify(
      &[ToolchainInstall::new("powerpc-linux-musl", temp.path().join("nowhere"))],
      &temp.path().join("verify"),
    )
    .await
    .unwrap();

    assert!(matches!(report.targets[0].error, Some(VerificationError::Spawn { .. })));
    assert_eq!(report.targets[0].steps.len(), 1);
  }

  #[tokio::test]
  async fn checks_run_with_empty_environment() {
    let temp = TempDir::new().unwrap();
    let bin = temp.path().join("bin");
    fake_toolchain(&bin, "arm-linux-musleabi", None);
    crate::util::testutil::write_script(
      &bin.join("arm-linux-musleabi-strings"),
      "[ -z \"$HOME\" ] || exit 3\n",
    );

    let report = verify(
      &[ToolchainInstall::new("arm-linux-musleabi", &bin)],
      &temp.path().join("verify"),
    )
    .await
    .unwrap();

    assert!(report.is_success(), "{report:?}");
  }
}
