//! Invocation settings.
//!
//! `Settings` is built once at start-up from the optional TOML settings file and
//! a few environment overrides, then passed by reference to every stage. Nothing
//! downstream reads process-wide state for build options.
//!
//! # File format
//!
//! ```toml
//! jobs = 8
//! languages = ["c", "c++"]
//!
//! [versions.gcc]
//! version = "13.1.0"
//! sha256 = "61d684f0aa5e76ac6585ad8898a2427aade8979ed5e7f85492286c4dfc13ee86"
//!
//! [support_libs]
//! mode = "system"
//! gmp = "/opt/homebrew/opt/gmp"
//! mpfr = "/opt/homebrew/opt/mpfr"
//! mpc = "/opt/homebrew/opt/libmpc"
//! isl = "/opt/homebrew/opt/isl"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::{CACHE_ENV, DEFAULT_FETCH_PARALLELISM, PREFIX_ENV};
use crate::platform::paths;
use crate::util::hash::ContentHash;

/// Errors raised while loading or validating settings.
#[derive(Debug, Error)]
pub enum SettingsError {
  #[error("settings file not found: {0}")]
  NotFound(PathBuf),

  #[error("failed to read settings file {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid settings file {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: Box<toml::de::Error>,
  },

  #[error("invalid sha256 for {name}: {value}")]
  InvalidDigest { name: String, value: String },

  #[error("invalid setting {key}: {message}")]
  Invalid { key: &'static str, message: String },
}

/// A component version pinned to the digest of its release archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pin {
  pub version: String,
  pub sha256: String,
}

impl Pin {
  fn new(version: &str, sha256: &str) -> Self {
    Self {
      version: version.to_string(),
      sha256: sha256.to_string(),
    }
  }
}

/// Version pins for every component fetched for a build.
///
/// `config_sub.version` is a savannah `config.git` revision rather than a release number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Versions {
  pub linux: Pin,
  pub gcc: Pin,
  pub binutils: Pin,
  pub musl: Pin,
  pub config_sub: Pin,
  pub gmp: Pin,
  pub mpfr: Pin,
  pub mpc: Pin,
  pub isl: Pin,
}

impl Default for Versions {
  fn default() -> Self {
    Self {
      linux: Pin::new("6.1.31", "e86917bba1990e967943645484182a64ba325f98b114a1906cc1d50992e073c1"),
      gcc: Pin::new("13.1.0", "61d684f0aa5e76ac6585ad8898a2427aade8979ed5e7f85492286c4dfc13ee86"),
      binutils: Pin::new("2.40", "0f8a4c272d7f17f369ded10a4aca28b8e304828e95526da482b0ccc4dfc9d8e1"),
      musl: Pin::new("1.2.4", "7a35eae33d5372a7c0da1188de798726f68825513b7ae3ebe97aaaa52114f039"),
      config_sub: Pin::new(
        "63acb96f9247",
        "b45ba96fa578cfca60ed16e27e689f10812c3f946535e779229afe7a840763e6",
      ),
      gmp: Pin::new("6.1.2", "5275bb04f4863a13516b2f39392ac5e272f5e1bb8057b18aec1c9b79d73d8fb2"),
      mpfr: Pin::new("4.0.2", "c05e3f02d09e0e9019384cdd58e0f19c64e6db1fd6f5ecf77b4b1c61ca253acc"),
      mpc: Pin::new("1.1.0", "6985c538143c1208dcb1ac42cedad6ff52e267b47e5f970183a3e75125b43c2e"),
      isl: Pin::new("0.21", "d18ca11f8ad1a39ab6d03d3dcb3365ab416720fcb65b42d69f34f51bf0a0e859"),
    }
  }
}

impl Versions {
  fn pins(&self) -> [(&'static str, &Pin); 9] {
    [
      ("linux", &self.linux),
      ("gcc", &self.gcc),
      ("binutils", &self.binutils),
      ("musl", &self.musl),
      ("config_sub", &self.config_sub),
      ("gmp", &self.gmp),
      ("mpfr", &self.mpfr),
      ("mpc", &self.mpc),
      ("isl", &self.isl),
    ]
  }
}

/// Where the musl-cross-make build system itself comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSystem {
  /// Archive URL; `{rev}` is replaced with `rev`.
  pub url: String,
  pub rev: String,
  pub sha256: String,
}

impl Default for BuildSystem {
  fn default() -> Self {
    Self {
      url: "https://github.com/jthat/musl-cross-make/archive/{rev}.tar.gz".to_string(),
      rev: "d1993a6".to_string(),
      sha256: "12256deee0f9ad50eb7ffa81af22c252f4953c1423e9011fe3acdb025a0ce43d".to_string(),
    }
  }
}

impl BuildSystem {
  pub fn archive_url(&self) -> String {
    self.url.replace("{rev}", &self.rev)
  }
}

/// How GCC's support libraries are provided.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SupportLibs {
  /// Fetch GMP/MPFR/MPC/ISL sources and let musl-cross-make build them.
  #[default]
  Bundled,
  /// Link against libraries already installed on the host.
  System {
    gmp: PathBuf,
    mpfr: PathBuf,
    mpc: PathBuf,
    isl: PathBuf,
    #[serde(default)]
    zstd: Option<PathBuf>,
  },
}

impl SupportLibs {
  pub fn is_bundled(&self) -> bool {
    matches!(self, SupportLibs::Bundled)
  }
}

/// A patch applied to the musl-cross-make tree before building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSpec {
  pub name: String,
  pub url: String,
  pub sha256: String,
}

/// Host tool overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostTools {
  /// Make program; defaults to `gmake` on macOS and `make` elsewhere.
  pub make: Option<String>,
  /// Directory with GNU `sed` named `sed`; defaults to Homebrew's gnu-sed gnubin.
  pub gnubin_dir: Option<PathBuf>,
}

/// Complete, immutable configuration for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub build_system: BuildSystem,
  pub versions: Versions,
  pub support_libs: SupportLibs,
  pub patches: Vec<PatchSpec>,
  pub languages: Vec<String>,
  pub bugurl: Option<String>,
  /// Parallel jobs handed to make; `None` lets make decide.
  pub jobs: Option<usize>,
  pub fetch_parallelism: usize,
  pub prefix: Option<PathBuf>,
  pub cache_dir: Option<PathBuf>,
  /// Scratch directory for the build tree; `<prefix>/.work` when unset.
  pub work_dir: Option<PathBuf>,
  pub host: HostTools,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      build_system: BuildSystem::default(),
      versions: Versions::default(),
      support_libs: SupportLibs::default(),
      patches: Vec::new(),
      languages: vec!["c".to_string(), "c++".to_string()],
      bugurl: None,
      jobs: None,
      fetch_parallelism: DEFAULT_FETCH_PARALLELISM,
      prefix: None,
      cache_dir: None,
      work_dir: None,
      host: HostTools::default(),
    }
  }
}

impl Settings {
  /// Load settings.
  ///
  /// An explicit `path` must exist. Without one, the default settings file is
  /// used when present and built-in defaults otherwise. `MUSLCROSS_PREFIX` and
  /// `MUSLCROSS_CACHE` override the file.
  pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
    let mut settings = match path {
      Some(path) => {
        if !path.exists() {
          return Err(SettingsError::NotFound(path.to_path_buf()));
        }
        Self::from_file(path)?
      }
      None => {
        let default_path = paths::settings_path();
        if default_path.exists() {
          Self::from_file(&default_path)?
        } else {
          debug!(path = %default_path.display(), "no settings file, using defaults");
          Self::default()
        }
      }
    };

    if let Ok(prefix) = std::env::var(PREFIX_ENV) {
      settings.prefix = Some(PathBuf::from(prefix));
    }
    if let Ok(cache) = std::env::var(CACHE_ENV) {
      settings.cache_dir = Some(PathBuf::from(cache));
    }

    settings.validate()?;
    Ok(settings)
  }

  /// Parse a settings file without applying environment overrides.
  pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
    let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    debug!(path = %path.display(), "loaded settings file");
    Self::from_toml(&content).map_err(|source| SettingsError::Parse {
      path: path.to_path_buf(),
      source: Box::new(source),
    })
  }

  pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
    toml::from_str(content)
  }

  /// Check digests and numeric limits.
  pub fn validate(&self) -> Result<(), SettingsError> {
    let mut digests: Vec<(String, &str)> = vec![("build_system".to_string(), self.build_system.sha256.as_str())];
    for (name, pin) in self.versions.pins() {
      digests.push((name.to_string(), pin.sha256.as_str()));
    }
    for patch in &self.patches {
      digests.push((patch.name.clone(), patch.sha256.as_str()));
    }

    for (name, value) in digests {
      if !ContentHash::is_valid(value) {
        return Err(SettingsError::InvalidDigest {
          name,
          value: value.to_string(),
        });
      }
    }

    if self.languages.is_empty() {
      return Err(SettingsError::Invalid {
        key: "languages",
        message: "at least one language is required".to_string(),
      });
    }
    if self.jobs == Some(0) {
      return Err(SettingsError::Invalid {
        key: "jobs",
        message: "must be at least 1".to_string(),
      });
    }
    if self.fetch_parallelism == 0 {
      return Err(SettingsError::Invalid {
        key: "fetch_parallelism",
        message: "must be at least 1".to_string(),
      });
    }

    Ok(())
  }

  pub fn prefix(&self) -> PathBuf {
    self.prefix.clone().unwrap_or_else(paths::prefix_dir)
  }

  pub fn downloads_dir(&self) -> PathBuf {
    match &self.cache_dir {
      Some(dir) => dir.join("downloads"),
      None => paths::downloads_dir(),
    }
  }
}
