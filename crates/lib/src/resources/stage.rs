//! Laying out fetched resources as a musl-cross-make build tree.
//!
//! ```text
//! <work>/
//!   musl-cross-make/   unpacked build system (patched)
//!   sources/           component archives, named as musl-cross-make expects
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tokio::process::Command;
use tracing::{debug, info};

use crate::resources::types::{FetchedResource, ResourceError, ResourceKind, sanitize_file_name};

/// Paths of a staged build tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedTree {
  /// Unpacked musl-cross-make checkout; `make` runs here.
  pub source_dir: PathBuf,
  /// Directory referenced by `SOURCES` in `config.mak`.
  pub sources_dir: PathBuf,
}

impl StagedTree {
  pub fn at(work_dir: &Path) -> Self {
    Self {
      source_dir: work_dir.join("musl-cross-make"),
      sources_dir: work_dir.join("sources"),
    }
  }
}

/// Stage fetched resources under `work_dir`.
///
/// Unpacks the build system, copies components into the sources directory and
/// applies patches in order.
pub async fn stage(fetched: &[FetchedResource], work_dir: &Path) -> Result<StagedTree, ResourceError> {
  let tree = StagedTree::at(work_dir);

  let build_system = fetched
    .iter()
    .find(|f| f.resource.kind == ResourceKind::BuildSystem)
    .ok_or(ResourceError::MissingBuildSystem)?;

  if tree.source_dir.exists() {
    tokio::fs::remove_dir_all(&tree.source_dir).await?;
  }
  tokio::fs::create_dir_all(&tree.source_dir).await?;

  info!(archive = ?build_system.path, dest = ?tree.source_dir, "unpacking build system");
  let archive = build_system.path.clone();
  let dest = tree.source_dir.clone();
  tokio::task::spawn_blocking(move || unpack_stripped(&archive, &dest))
    .await
    .map_err(|e| ResourceError::Io(std::io::Error::other(e)))??;

  tokio::fs::create_dir_all(&tree.sources_dir).await?;
  for component in fetched.iter().filter(|f| f.resource.kind == ResourceKind::Component) {
    let dest = tree.sources_dir.join(sanitize_file_name(&component.resource.name));
    debug!(name = %component.resource.name, dest = ?dest, "staging component");
    tokio::fs::copy(&component.path, &dest).await?;
  }

  for patch in fetched.iter().filter(|f| f.resource.kind == ResourceKind::Patch) {
    apply_patch(&patch.resource.name, &patch.path, &tree.source_dir).await?;
  }

  Ok(tree)
}

/// Unpack a `.tar.gz` or `.tar` archive, dropping the leading path component.
///
/// Entries that would land outside `dest` are rejected.
pub fn unpack_stripped(archive: &Path, dest: &Path) -> Result<(), ResourceError> {
  let file = File::open(archive)?;
  let name = archive.to_string_lossy();

  if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
    unpack_entries(tar::Archive::new(GzDecoder::new(BufReader::new(file))), archive, dest)
  } else if name.ends_with(".tar") {
    unpack_entries(tar::Archive::new(BufReader::new(file)), archive, dest)
  } else {
    Err(ResourceError::Unpack {
      path: archive.to_path_buf(),
      message: "unsupported archive format".to_string(),
    })
  }
}

fn unpack_entries<R: std::io::Read>(
  mut tar: tar::Archive<R>,
  archive: &Path,
  dest: &Path,
) -> Result<(), ResourceError> {
  let unpack_err = |message: String| ResourceError::Unpack {
    path: archive.to_path_buf(),
    message,
  };

  tar.set_preserve_permissions(true);

  for entry in tar.entries().map_err(|e| unpack_err(e.to_string()))? {
    let mut entry = entry.map_err(|e| unpack_err(e.to_string()))?;
    let path = entry.path().map_err(|e| unpack_err(e.to_string()))?.into_owned();

    let stripped: PathBuf = path.components().skip(1).collect();
    if stripped.as_os_str().is_empty() {
      continue;
    }
    if stripped.components().any(|c| !matches!(c, Component::Normal(_))) {
      return Err(unpack_err(format!("entry escapes destination: {}", path.display())));
    }

    let target = dest.join(&stripped);
    if let Some(parent) = target.parent() {
      std::fs::create_dir_all(parent)?;
    }
    entry
      .unpack(&target)
      .map_err(|e| unpack_err(format!("{}: {e}", stripped.display())))?;
  }

  Ok(())
}

async fn apply_patch(name: &str, patch: &Path, source_dir: &Path) -> Result<(), ResourceError> {
  info!(patch = %name, "applying patch");

  let output = Command::new("patch")
    .args(patch_args(patch))
    .current_dir(source_dir)
    .output()
    .await?;

  if !output.status.success() {
    debug!(stdout = %String::from_utf8_lossy(&output.stdout), stderr = %String::from_utf8_lossy(&output.stderr), "patch output");
    return Err(ResourceError::PatchFailed {
      name: name.to_string(),
      code: output.status.code(),
    });
  }

  Ok(())
}

fn patch_args(patch: &Path) -> Vec<String> {
  vec![
    "-p1".to_string(),
    "--batch".to_string(),
    "-i".to_string(),
    patch.to_string_lossy().to_string(),
  ]
}
