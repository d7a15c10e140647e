use std::path::Path;

use anyhow::{Context, Result};

use muslcross_lib::pipeline;

use crate::cmd::{load_settings, runtime};
use crate::output::{self, Status};

/// Execute the fetch command.
///
/// Downloads every declared source archive into the cache, verifying each one.
pub fn cmd_fetch(config: Option<&Path>) -> Result<()> {
  let settings = load_settings(config)?;

  let rt = runtime()?;
  let fetched = rt.block_on(pipeline::fetch(&settings)).context("Fetch failed")?;

  for item in &fetched {
    output::fetched(item);
  }

  let downloaded: Vec<_> = fetched.iter().filter(|f| !f.cached).collect();
  let bytes: u64 = downloaded.iter().map(|f| f.size).sum();

  output::status(Status::Done, format_args!("{} sources ready", fetched.len()));
  output::field(
    "Downloaded",
    format_args!("{} ({})", downloaded.len(), output::archive_size(bytes)),
  );
  output::field("Cache", settings.downloads_dir().display());
  Ok(())
}
