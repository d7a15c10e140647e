use anyhow::Result;

use muslcross_lib::target::TARGETS;

use crate::output;

/// Execute the targets command.
pub fn cmd_targets(json: bool) -> Result<()> {
  if json {
    return output::json(&TARGETS);
  }

  output::target_table(TARGETS);
  Ok(())
}
