mod config;
mod fetch;
mod info;
mod install;
mod targets;
mod verify;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use muslcross_lib::settings::Settings;
use muslcross_lib::target::{TARGETS, TargetOverrides};

pub use config::cmd_config;
pub use fetch::cmd_fetch;
pub use info::cmd_info;
pub use install::cmd_install;
pub use targets::cmd_targets;
pub use verify::cmd_verify;

/// Target selection flags shared by several commands.
#[derive(Debug, Clone, Args)]
pub struct TargetArgs {
  /// Also build TARGET (repeatable)
  #[arg(long = "with", value_name = "TARGET", long_help = option_help("Also build TARGET (repeatable)."))]
  pub with: Vec<String>,

  /// Do not build TARGET (repeatable)
  #[arg(long = "without", value_name = "TARGET", long_help = option_help("Do not build TARGET (repeatable)."))]
  pub without: Vec<String>,

  /// Build every known target, ignoring --without
  #[arg(long)]
  pub all_targets: bool,
}

impl TargetArgs {
  pub fn overrides(&self) -> TargetOverrides {
    TargetOverrides {
      enable: self.with.clone(),
      disable: self.without.clone(),
      all: self.all_targets,
    }
  }
}

#[derive(Debug, Clone, Args)]
pub struct InstallArgs {
  #[command(flatten)]
  pub targets: TargetArgs,

  /// Install prefix (default: $XDG_DATA_HOME/muslcross/toolchains)
  #[arg(long, value_name = "DIR")]
  pub prefix: Option<PathBuf>,

  /// Parallel jobs passed to make
  #[arg(short, long, value_name = "N")]
  pub jobs: Option<usize>,

  /// Skip smoke-testing the installed toolchains
  #[arg(long)]
  pub no_verify: bool,

  /// Keep the work directory after a successful install
  #[arg(long)]
  pub keep_work: bool,
}

fn option_help(summary: &str) -> String {
  let options: Vec<String> = TARGETS
    .iter()
    .map(|t| {
      if t.default_enabled {
        format!("{} (default)", t.option)
      } else {
        t.option.to_string()
      }
    })
    .collect();
  format!("{summary}\n\nTargets: {}", options.join(", "))
}

fn load_settings(config: Option<&Path>) -> Result<Settings> {
  Settings::load(config).context("Failed to load settings")
}

fn runtime() -> Result<tokio::runtime::Runtime> {
  tokio::runtime::Runtime::new().context("Failed to create async runtime")
}
