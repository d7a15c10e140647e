use std::path::{Path, PathBuf};

use anyhow::Result;

use muslcross_lib::platform::{self, paths};

use crate::cmd::load_settings;
use crate::output::{self, Status};

/// Execute the info command.
pub fn cmd_info(config: Option<&Path>) -> Result<()> {
  let settings = load_settings(config)?;
  let settings_path = config.map(Path::to_path_buf).unwrap_or_else(paths::settings_path);

  output::status(Status::Note, format_args!("muslcross {}", env!("CARGO_PKG_VERSION")));
  output::field(
    "Platform",
    platform::platform_triple().as_deref().unwrap_or("unsupported"),
  );
  output::field("Settings", display(&settings_path));
  output::field("Downloads", display(&settings.downloads_dir()));
  output::field("Prefix", display(&settings.prefix()));
  output::field("GCC", &settings.versions.gcc.version);
  output::field("musl", &settings.versions.musl.version);
  output::field("binutils", &settings.versions.binutils.version);
  output::field("Linux headers", &settings.versions.linux.version);
  Ok(())
}

/// Canonical form for paths that exist, as given otherwise.
fn display(path: &Path) -> String {
  let resolved: PathBuf = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
  resolved.display().to_string()
}
