/// Name used for XDG directories and the generated pkgversion string.
pub const APP_NAME: &str = "muslcross";

/// Settings file name inside the config directory.
pub const SETTINGS_FILENAME: &str = "config.toml";

/// Overrides the settings file location.
pub const SETTINGS_ENV: &str = "MUSLCROSS_CONFIG";

/// Overrides the download cache directory.
pub const CACHE_ENV: &str = "MUSLCROSS_CACHE";

/// Overrides the install prefix.
pub const PREFIX_ENV: &str = "MUSLCROSS_PREFIX";

/// Build configuration file consumed by musl-cross-make.
pub const CONFIG_MAK: &str = "config.mak";

/// Lock file guarding a prefix against concurrent installs.
pub const LOCK_FILENAME: &str = ".lock";

/// Number of trailing build log lines surfaced on failure.
pub const LOG_TAIL_LINES: usize = 40;

/// Upper bound on concurrent downloads.
pub const DEFAULT_FETCH_PARALLELISM: usize = 4;
