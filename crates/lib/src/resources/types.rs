//! Resource types and errors.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// What a resource is used for once fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
  /// The musl-cross-make archive; unpacked as the build tree.
  BuildSystem,
  /// A source archive copied into the sources directory under its name.
  Component,
  /// A patch applied to the build tree with `patch -p1`.
  Patch,
}

/// A named downloadable artifact pinned to a content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
  /// File name the build system expects (e.g. `gcc-13.1.0.tar.xz`).
  pub name: String,
  pub kind: ResourceKind,
  pub version: String,
  /// `config.mak` variable pinning this version (e.g. `GCC_VER`).
  pub version_var: Option<&'static str>,
  pub url: String,
  /// Expected SHA-256, normalized to lowercase hex.
  pub sha256: String,
}

impl Resource {
  /// Cache location: `<downloads>/<sha256>/<name>`.
  pub fn cache_path(&self, downloads_dir: &Path) -> PathBuf {
    downloads_dir
      .join(&self.sha256)
      .join(sanitize_file_name(&self.name))
  }
}

/// A resource whose bytes are on disk and verified.
#[derive(Debug, Clone)]
pub struct FetchedResource {
  pub resource: Resource,
  pub path: PathBuf,
  /// True when the cache already held a verified copy.
  pub cached: bool,
  pub size: u64,
}

/// Errors from declaring, fetching or staging resources.
#[derive(Debug, Error)]
pub enum ResourceError {
  #[error("unknown resource: {0}")]
  Unknown(String),

  /// HTTP request failed or returned a non-success status.
  #[error("fetch failed for {url}: {message}")]
  FetchFailed { url: String, message: String },

  /// Downloaded bytes do not match the pinned digest.
  #[error("integrity check failed for {name} ({url}): expected {expected}, got {actual}")]
  Integrity {
    name: String,
    url: String,
    expected: String,
    actual: String,
  },

  #[error("failed to unpack {path}: {message}")]
  Unpack { path: PathBuf, message: String },

  #[error("no build system archive among fetched resources")]
  MissingBuildSystem,

  #[error("patch {name} failed with exit code {code:?}")]
  PatchFailed { name: String, code: Option<i32> },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Reduce a resource name to a safe single path component.
///
/// Only alphanumerics, dash, underscore and dot survive; anything else becomes `_`.
pub fn sanitize_file_name(name: &str) -> String {
  let sanitized: String = name
    .chars()
    .map(|c| {
      if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
        c
      } else {
        '_'
      }
    })
    .collect();

  if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
    "resource".to_string()
  } else {
    sanitized
  }
}
