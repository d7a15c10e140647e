//! Exclusive advisory lock on an install prefix.
//!
//! An install holds `<prefix>/.lock` for its whole duration so two invocations
//! never write the same cache entries or toolchain directories at once. The
//! lock file records who holds it, which is reported to a second invocation.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
pub struct LockMetadata {
  pub version: u32,
  pub pid: u32,
  pub started_at_unix: u64,
  pub command: String,
  pub prefix: PathBuf,
}

#[derive(Debug, Error)]
pub enum LockError {
  #[error(
    "prefix is locked by another process: {command} (PID {pid}, started at Unix time {started_at_unix})\n\
     If no muslcross process is running, remove the lock file:\n  {lock_path}"
  )]
  Contention {
    command: String,
    pid: u32,
    started_at_unix: u64,
    lock_path: PathBuf,
  },

  #[error(
    "prefix is locked (holder unknown)\n\
     If no muslcross process is running, remove the lock file:\n  {lock_path}"
  )]
  ContentionUnknown { lock_path: PathBuf },

  #[error("failed to create prefix directory: {0}")]
  CreateDir(#[source] io::Error),

  #[error("failed to open lock file: {0}")]
  OpenFile(#[source] io::Error),

  #[error("failed to write lock metadata: {0}")]
  WriteMetadata(#[source] io::Error),

  #[error("failed to acquire lock: {0}")]
  LockFailed(#[source] io::Error),
}

/// A held prefix lock; released when dropped.
#[derive(Debug)]
pub struct PrefixLock {
  file: File,
  lock_path: PathBuf,
}

impl PrefixLock {
  /// Take the lock at `lock_path` without waiting, creating its directory.
  pub fn acquire(lock_path: &Path, command: &str) -> Result<Self, LockError> {
    let prefix = lock_path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(prefix).map_err(LockError::CreateDir)?;

    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(false)
      .open(lock_path)
      .map_err(LockError::OpenFile)?;

    if let Err(err) = try_lock(&file) {
      if err.kind() == io::ErrorKind::WouldBlock {
        return Err(read_contention_error(lock_path));
      }
      return Err(LockError::LockFailed(err));
    }

    write_metadata(&file, command, prefix)?;
    debug!(path = ?lock_path, "acquired prefix lock");

    Ok(Self {
      file,
      lock_path: lock_path.to_path_buf(),
    })
  }

  /// Read back the metadata through the held handle.
  pub fn read_metadata(&self) -> io::Result<LockMetadata> {
    let mut file = &self.file;
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).map_err(io::Error::other)
  }

  pub fn lock_path(&self) -> &Path {
    &self.lock_path
  }
}

fn write_metadata(file: &File, command: &str, prefix: &Path) -> Result<(), LockError> {
  let metadata = LockMetadata {
    version: 1,
    pid: std::process::id(),
    started_at_unix: SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .unwrap_or_default()
      .as_secs(),
    command: command.to_string(),
    prefix: prefix.to_path_buf(),
  };

  file.set_len(0).map_err(LockError::WriteMetadata)?;
  let mut writer = io::BufWriter::new(file);
  serde_json::to_writer_pretty(&mut writer, &metadata).map_err(|e| LockError::WriteMetadata(io::Error::other(e)))?;
  writer.flush().map_err(LockError::WriteMetadata)?;

  Ok(())
}

fn read_contention_error(lock_path: &Path) -> LockError {
  if let Ok(contents) = std::fs::read_to_string(lock_path)
    && let Ok(metadata) = serde_json::from_str::<LockMetadata>(&contents)
  {
    return LockError::Contention {
      command: metadata.command,
      pid: metadata.pid,
      started_at_unix: metadata.started_at_unix,
      lock_path: lock_path.to_path_buf(),
    };
  }

  LockError::ContentionUnknown {
    lock_path: lock_path.to_path_buf(),
  }
}

#[cfg(unix)]
fn try_lock(file: &File) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  flock(file.as_fd(), FlockOperation::NonBlockingLockExclusive)
    .map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> io::Result<()> {
  Err(io::Error::new(io::ErrorKind::Unsupported, "prefix locking requires a unix host"))
}
