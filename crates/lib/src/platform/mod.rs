//! Host platform detection.
//!
//! Toolchains can be built on Linux and macOS, on x86_64 or aarch64. The host
//! decides how the build environment is prepared (GNU sed and `gmake` on
//! macOS, JDK stubs on Linux) and where Homebrew keeps its tools.

pub mod paths;

use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
  X86_64,
  Aarch64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
  Linux,
  MacOs,
}

impl Os {
  /// Name under which GNU make is installed.
  pub fn make_program(self) -> &'static str {
    match self {
      Os::Linux => "make",
      Os::MacOs => "gmake",
    }
  }
}

/// A supported build host, shown as e.g. `aarch64-darwin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
  pub arch: Arch,
  pub os: Os,
}

impl Platform {
  pub fn new(arch: Arch, os: Os) -> Self {
    Self { arch, os }
  }

  /// Interpret `std::env::consts::{OS, ARCH}` style names.
  ///
  /// Returns `None` for hosts musl-cross-make is not driven on.
  pub fn from_names(os: &str, arch: &str) -> Option<Self> {
    let os = match os {
      "linux" => Os::Linux,
      "macos" => Os::MacOs,
      _ => return None,
    };
    let arch = match arch {
      "x86_64" => Arch::X86_64,
      "aarch64" => Arch::Aarch64,
      _ => return None,
    };
    Some(Self { arch, os })
  }

  pub fn current() -> Option<Self> {
    Self::from_names(std::env::consts::OS, std::env::consts::ARCH)
  }

  pub fn triple(&self) -> String {
    let arch = match self.arch {
      Arch::X86_64 => "x86_64",
      Arch::Aarch64 => "aarch64",
    };
    let os = match self.os {
      Os::Linux => "linux",
      Os::MacOs => "darwin",
    };
    format!("{arch}-{os}")
  }

  /// Default Homebrew prefix, where GNU tools are expected on macOS hosts.
  pub fn homebrew_prefix(&self) -> PathBuf {
    match (self.os, self.arch) {
      (Os::MacOs, Arch::Aarch64) => PathBuf::from("/opt/homebrew"),
      (Os::MacOs, Arch::X86_64) => PathBuf::from("/usr/local"),
      (Os::Linux, _) => PathBuf::from("/home/linuxbrew/.linuxbrew"),
    }
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.triple())
  }
}

pub fn platform_triple() -> Option<String> {
  Platform::current().map(|p| p.triple())
}
