use std::path::Path;

use anyhow::Result;

use muslcross_lib::pipeline;

use crate::cmd::{TargetArgs, load_settings};

/// Execute the config command: print the `config.mak` a build would use.
pub fn cmd_config(targets: &TargetArgs, config: Option<&Path>) -> Result<()> {
  let settings = load_settings(config)?;
  let text = pipeline::render_config(&settings, &targets.overrides())?;
  print!("{}", text);
  Ok(())
}
