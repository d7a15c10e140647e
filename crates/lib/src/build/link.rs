//! Exposing installed toolchains on the prefix `bin` directory.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::build::types::BuildError;

/// Symlink every entry of `<output>/bin` into `prefix_bin`.
///
/// Existing entries of the same name are replaced. Returns the created links
/// in name order.
pub fn link_binaries(output_dir: &Path, prefix_bin: &Path) -> Result<Vec<PathBuf>, BuildError> {
  let source_bin = output_dir.join("bin");
  std::fs::create_dir_all(prefix_bin)?;

  let mut links = Vec::new();
  if !source_bin.is_dir() {
    return Ok(links);
  }

  for entry in WalkDir::new(&source_bin)
    .min_depth(1)
    .max_depth(1)
    .sort_by_file_name()
  {
    let entry = entry.map_err(|e| BuildError::Io(std::io::Error::other(e)))?;
    if entry.file_type().is_dir() {
      continue;
    }

    let link = prefix_bin.join(entry.file_name());
    if link.symlink_metadata().is_ok() {
      std::fs::remove_file(&link)?;
    }

    symlink(entry.path(), &link)?;
    debug!(link = ?link, to = ?entry.path(), "linked");
    links.push(link);
  }

  info!(count = links.len(), bin = ?prefix_bin, "linked toolchain binaries");
  Ok(links)
}

#[cfg(unix)]
fn symlink(original: &Path, link: &Path) -> std::io::Result<()> {
  std::os::unix::fs::symlink(original, link)
}

#[cfg(not(unix))]
fn symlink(_original: &Path, _link: &Path) -> std::io::Result<()> {
  Err(std::io::Error::new(
    std::io::ErrorKind::Unsupported,
    "linking toolchains requires a unix host",
  ))
}
