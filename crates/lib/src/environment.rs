//! Host environment preparation for builds.
//!
//! Child processes never inherit mutations of this process's environment.
//! Instead the environment is captured once at start-up as a [`HostEnv`], and
//! every build step receives an explicit map computed from it and an
//! [`EnvironmentPatch`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::platform::{Os, Platform};
use crate::settings::Settings;

/// Script that makes a stubbed tool look present but unusable.
pub const FAILING_STUB: &str = "#!/bin/sh\nexit 1\n";

/// Tools stubbed out on Linux so binutils' gprofng never detects a JDK.
const JDK_STUBS: &[&str] = &["java", "javac"];

#[derive(Debug, Error)]
pub enum EnvError {
  #[error("failed to install stub {path}: {source}")]
  Stub {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("PATH entry contains a separator: {0}")]
  InvalidPath(String),
}

/// The process environment as captured at start-up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostEnv {
  vars: BTreeMap<String, String>,
}

impl HostEnv {
  /// Snapshot the current process environment. Non-UTF-8 entries are skipped.
  pub fn capture() -> Self {
    let vars = std::env::vars_os()
      .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
      .collect();
    Self { vars }
  }

  pub fn from_vars<I, K, V>(vars: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
  {
    Self {
      vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
    }
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.vars.get(key).map(String::as_str)
  }

  pub fn vars(&self) -> &BTreeMap<String, String> {
    &self.vars
  }
}

/// An executable file to create before building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stub {
  pub path: PathBuf,
  pub content: &'static str,
}

/// Host-specific adjustments applied on top of the base environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentPatch {
  /// Directories placed before the inherited `PATH`, in order.
  pub path_prepend: Vec<PathBuf>,
  /// Variables set on top of the base environment.
  pub vars: BTreeMap<String, String>,
  /// Make program to invoke.
  pub make: String,
  pub stubs: Vec<Stub>,
}

/// Compute the environment patch for building on `host`.
///
/// macOS builds need GNU sed ahead of the system one and GNU make as `gmake`.
/// Linux builds get failing `java`/`javac` stubs under `<work>/fakejdk/bin`.
pub fn prepare(host: Platform, settings: &Settings, work_dir: &Path) -> EnvironmentPatch {
  let mut path_prepend = Vec::new();
  let mut stubs = Vec::new();

  match host.os {
    Os::MacOs => {
      let gnubin = settings
        .host
        .gnubin_dir
        .clone()
        .unwrap_or_else(|| host.homebrew_prefix().join("opt/gnu-sed/libexec/gnubin"));
      path_prepend.push(gnubin);
    }
    Os::Linux => {
      let fakejdk = work_dir.join("fakejdk").join("bin");
      stubs.extend(JDK_STUBS.iter().map(|name| Stub {
        path: fakejdk.join(name),
        content: FAILING_STUB,
      }));
      path_prepend.push(fakejdk);
    }
  }

  let make = settings
    .host
    .make
    .clone()
    .unwrap_or_else(|| host.os.make_program().to_string());

  let mut vars = BTreeMap::new();
  vars.insert("LANG".to_string(), "C".to_string());
  vars.insert("LC_ALL".to_string(), "C".to_string());

  debug!(host = %host, make = %make, path_prepend = ?path_prepend, "prepared build environment");

  EnvironmentPatch {
    path_prepend,
    vars,
    make,
    stubs,
  }
}

impl EnvironmentPatch {
  /// Write every stub with mode 0755, creating parent directories.
  pub fn install_stubs(&self) -> Result<(), EnvError> {
    for stub in &self.stubs {
      write_executable(&stub.path, stub.content).map_err(|source| EnvError::Stub {
        path: stub.path.clone(),
        source,
      })?;
      info!(path = ?stub.path, "installed stub");
    }
    Ok(())
  }

  /// The complete environment for build child processes.
  pub fn env_map(&self, base: &HostEnv) -> Result<BTreeMap<String, String>, EnvError> {
    let mut env = base.vars().clone();

    let inherited = base.get("PATH").unwrap_or_default();
    let mut entries: Vec<PathBuf> = self.path_prepend.clone();
    entries.extend(std::env::split_paths(inherited).filter(|p| !p.as_os_str().is_empty()));

    let path = std::env::join_paths(entries).map_err(|e| EnvError::InvalidPath(e.to_string()))?;
    env.insert("PATH".to_string(), path.to_string_lossy().into_owned());

    for (key, value) in &self.vars {
      env.insert(key.clone(), value.clone());
    }

    Ok(env)
  }
}

fn write_executable(path: &Path, content: &str) -> std::io::Result<()> {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)?;
  }
  std::fs::write(path, content)?;

  #[cfg(unix)]
  {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
  }

  Ok(())
}
