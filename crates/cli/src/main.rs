mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use muslcross_lib::environment::HostEnv;

use crate::cmd::{InstallArgs, TargetArgs};

/// Build musl cross-compilation toolchains with musl-cross-make
#[derive(Parser)]
#[command(name = "muslcross")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Settings file (default: $XDG_CONFIG_HOME/muslcross/config.toml)
  #[arg(long, global = true, value_name = "FILE")]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Fetch, build and install the selected toolchains
  Install(InstallArgs),

  /// Download and verify every source archive into the cache
  Fetch,

  /// Print the config.mak that would be used for a build
  Config {
    #[command(flatten)]
    targets: TargetArgs,
  },

  /// List buildable targets
  Targets {
    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Smoke-test installed toolchains
  Verify {
    #[command(flatten)]
    targets: TargetArgs,

    /// Install prefix to verify
    #[arg(long, value_name = "DIR")]
    prefix: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Show host platform and muslcross paths
  Info,
}

fn main() -> Result<()> {
  let base_env = HostEnv::capture();
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let config = cli.config.as_deref();

  match cli.command {
    Commands::Install(args) => cmd::cmd_install(args, config, &base_env),
    Commands::Fetch => cmd::cmd_fetch(config),
    Commands::Config { targets } => cmd::cmd_config(&targets, config),
    Commands::Targets { json } => cmd::cmd_targets(json),
    Commands::Verify { targets, prefix, json } => cmd::cmd_verify(&targets, prefix, json, cli.verbose, config),
    Commands::Info => cmd::cmd_info(config),
  }
}
