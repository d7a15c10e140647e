//! Directory layout of one build.
//!
//! ```text
//! <work>/                    scratch, removed after a successful install
//!   musl-cross-make/         build tree, make runs here
//!   sources/                 SOURCES in config.mak
//!   fakejdk/bin/             host stubs (Linux)
//!   logs/<triple>.log        captured make output
//!   verify/                  smoke test sources and binaries
//! <prefix>/
//!   libexec/                 OUTPUT in config.mak
//!   bin/                     symlinks into libexec/bin
//!   .lock
//! ```

use std::path::{Path, PathBuf};

use crate::consts::LOCK_FILENAME;
use crate::resources::StagedTree;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
  pub work_dir: PathBuf,
  pub tree: StagedTree,
  pub prefix: PathBuf,
}

impl Layout {
  pub fn new(work_dir: &Path, prefix: &Path) -> Self {
    Self {
      work_dir: work_dir.to_path_buf(),
      tree: StagedTree::at(work_dir),
      prefix: prefix.to_path_buf(),
    }
  }

  /// Install root handed to musl-cross-make as `OUTPUT`.
  pub fn output_dir(&self) -> PathBuf {
    self.prefix.join("libexec")
  }

  pub fn bin_dir(&self) -> PathBuf {
    self.prefix.join("bin")
  }

  pub fn logs_dir(&self) -> PathBuf {
    self.work_dir.join("logs")
  }

  pub fn verify_dir(&self) -> PathBuf {
    self.work_dir.join("verify")
  }

  pub fn lock_path(&self) -> PathBuf {
    self.prefix.join(LOCK_FILENAME)
  }
}
