use crate::consts::{APP_NAME, CACHE_ENV, PREFIX_ENV, SETTINGS_ENV, SETTINGS_FILENAME};
use std::path::PathBuf;

/// Returns the user's home directory
pub fn home_dir() -> PathBuf {
  std::env::var_os("HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|| PathBuf::from("/"))
}

/// Returns the directory for configuration files for the application
pub fn config_dir() -> PathBuf {
  let config_home = std::env::var("XDG_CONFIG_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".config"));
  config_home.join(APP_NAME)
}

/// Returns the directory for data files for the application
pub fn data_dir() -> PathBuf {
  let data_home = std::env::var("XDG_DATA_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".local").join("share"));
  data_home.join(APP_NAME)
}

/// Returns the directory for cache files for the application
pub fn cache_dir() -> PathBuf {
  if let Ok(path) = std::env::var(CACHE_ENV) {
    return PathBuf::from(path);
  }

  let cache_home = std::env::var("XDG_CACHE_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".cache"));
  cache_home.join(APP_NAME)
}

/// Directory holding verified downloads, keyed by content hash.
pub fn downloads_dir() -> PathBuf {
  cache_dir().join("downloads")
}

/// Install prefix for toolchains (`bin/` symlinks plus `libexec/` trees).
pub fn prefix_dir() -> PathBuf {
  if let Ok(path) = std::env::var(PREFIX_ENV) {
    return PathBuf::from(path);
  }

  data_dir().join("toolchains")
}

/// Location of the settings file.
pub fn settings_path() -> PathBuf {
  if let Ok(path) = std::env::var(SETTINGS_ENV) {
    return PathBuf::from(path);
  }

  config_dir().join(SETTINGS_FILENAME)
}
