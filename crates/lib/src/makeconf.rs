//! Rendering musl-cross-make's `config.mak`.
//!
//! The file is a pure function of the selection, the declared resources, the
//! layout and the settings, so identical inputs give byte-identical output.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::consts::CONFIG_MAK;
use crate::layout::Layout;
use crate::resources::Registry;
use crate::settings::{Settings, SupportLibs};
use crate::target::Selection;

/// Pinned component versions, in the order they appear in the file.
const VERSION_VARS: &[&str] = &["LINUX_VER", "BINUTILS_VER", "GCC_VER", "MUSL_VER", "CONFIG_SUB_REV"];

/// Support library versions; left empty to build against host libraries.
const SUPPORT_VARS: &[&str] = &["GMP_VER", "MPC_VER", "MPFR_VER", "ISL_VER"];

const GCC_CONFIG: &[&str] = &[
  "--disable-libquadmath",
  "--disable-decimal-float",
  "--disable-libitm",
  "--disable-fixed-point",
];

// Deep template nesting in GCC's sources trips clang's default limit.
const CLANG_CHECK: &str = "ifeq ($(shell $(CXX) -v 2>&1 | grep -c \"clang\"), 1)\n\
                           TOOLCHAIN_CONFIG += CXX=\"$(CXX) -fbracket-depth=512\"\n\
                           endif\n";

/// A materialized `config.mak`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
  pub sources_dir: PathBuf,
  pub output_dir: PathBuf,
  pub versions: Vec<(&'static str, String)>,
  pub support_versions: Vec<(&'static str, String)>,
  pub common_config: Vec<String>,
  pub gcc_config: Vec<String>,
}

impl BuildConfig {
  pub fn materialize(selection: &Selection, registry: &Registry, layout: &Layout, settings: &Settings) -> Self {
    let version_of = |var: &str| {
      registry
        .resources()
        .iter()
        .find(|r| r.version_var == Some(var))
        .map(|r| r.version.clone())
        .unwrap_or_default()
    };

    let versions = VERSION_VARS.iter().map(|var| (*var, version_of(var))).collect();
    let support_versions = SUPPORT_VARS.iter().map(|var| (*var, version_of(var))).collect();

    let mut common_config = vec![
      "--disable-nls".to_string(),
      "--enable-checking=release".to_string(),
      format!("--enable-languages={}", settings.languages.join(",")),
    ];

    if let SupportLibs::System {
      gmp,
      mpfr,
      mpc,
      isl,
      zstd,
    } = &settings.support_libs
    {
      common_config.push(format!("--with-gmp={}", gmp.display()));
      common_config.push(format!("--with-mpfr={}", mpfr.display()));
      common_config.push(format!("--with-mpc={}", mpc.display()));
      common_config.push(format!("--with-isl={}", isl.display()));
      if let Some(zstd) = zstd {
        common_config.push(format!("--with-zstd={}", zstd.display()));
      }
      common_config.push("--with-system-zlib".to_string());
    }

    common_config.push(format!("--with-pkgversion='{}'", pkgversion(selection)));
    if let Some(bugurl) = &settings.bugurl {
      common_config.push(format!("--with-bugurl={bugurl}"));
    }
    // make runs from the build tree, so that is the prefix compiled into debug info.
    common_config.push(format!("--with-debug-prefix-map={}=", layout.tree.source_dir.display()));

    Self {
      sources_dir: layout.tree.sources_dir.clone(),
      output_dir: layout.output_dir(),
      versions,
      support_versions,
      common_config,
      gcc_config: GCC_CONFIG.iter().map(|s| s.to_string()).collect(),
    }
  }

  pub fn render(&self) -> String {
    let mut out = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(out, "SOURCES = {}", self.sources_dir.display());
    let _ = writeln!(out, "OUTPUT = {}", self.output_dir.display());

    out.push_str("\n# Versions\n");
    for (var, version) in &self.versions {
      push_assignment(&mut out, var, version);
    }

    out.push_str("\n# Support libraries; empty when the host provides them\n");
    for (var, version) in &self.support_versions {
      push_assignment(&mut out, var, version);
    }

    out.push('\n');
    out.push_str(CLANG_CHECK);

    out.push('\n');
    for option in &self.common_config {
      let _ = writeln!(out, "COMMON_CONFIG += {option}");
    }

    out.push('\n');
    for option in &self.gcc_config {
      let _ = writeln!(out, "GCC_CONFIG += {option}");
    }

    out
  }

  /// Write `config.mak` into `dir`, returning its path.
  pub fn write(&self, dir: &Path) -> std::io::Result<PathBuf> {
    let path = dir.join(CONFIG_MAK);
    std::fs::write(&path, self.render())?;
    info!(path = ?path, "wrote build configuration");
    Ok(path)
  }
}

fn push_assignment(out: &mut String, var: &str, value: &str) {
  if value.is_empty() {
    let _ = writeln!(out, "{var} =");
  } else {
    let _ = writeln!(out, "{var} = {value}");
  }
}

/// `muslcross <version> <options...>`, tagging compilers with how they were built.
fn pkgversion(selection: &Selection) -> String {
  let mut parts = vec![format!("muslcross {}", env!("CARGO_PKG_VERSION"))];
  parts.extend(selection.options().into_iter().map(str::to_string));
  parts.join(" ")
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::target::{TARGETS, TargetOverrides, select_targets};
  use tempfile::TempDir;

  fn selection(enable: &[&str]) -> Selection {
    let overrides = TargetOverrides {
      enable: enable.iter().map(|s| s.to_string()).collect(),
      ..TargetOverrides::default()
    };
    select_targets(TARGETS, &overrides).unwrap()
  }

  fn system_settings() -> Settings {
    Settings {
      support_libs: SupportLibs::System {
        gmp: PathBuf::from("/opt/gmp"),
        mpfr: PathBuf::from("/opt/mpfr"),
        mpc: PathBuf::from("/opt/libmpc"),
        isl: PathBuf::from("/opt/isl"),
        zstd: Some(PathBuf::from("/opt/zstd")),
      },
      bugurl: Some("https://example.com/issues".to_string()),
      ..Settings::default()
    }
  }

  fn render(selection: &Selection, settings: &Settings) -> String {
    let layout = Layout::new(Path::new("/work"), Path::new("/prefix"));
    BuildConfig::materialize(selection, &Registry::standard(settings), &layout, settings).render()
  }

  #[test]
  fn header_and_pins() {
    let text = render(&selection(&[]), &Settings::default());

    assert!(text.starts_with("SOURCES = /work/sources\nOUTPUT = /prefix/libexec\n"));
    assert!(text.contains(
      "LINUX_VER = 6.1.31\nBINUTILS_VER = 2.40\nGCC_VER = 13.1.0\nMUSL_VER = 1.2.4\nCONFIG_SUB_REV = 63acb96f9247\n"
    ));
    assert!(text.contains("GMP_VER = 6.1.2\nMPC_VER = 1.1.0\nMPFR_VER = 4.0.2\nISL_VER = 0.21\n"));
  }

  #[test]
  fn system_libraries_blank_support_pins() {
    let text = render(&selection(&[]), &system_settings());

    assert!(text.contains("GMP_VER =\nMPC_VER =\nMPFR_VER =\nISL_VER =\n"));
    assert!(text.contains("COMMON_CONFIG += --with-gmp=/opt/gmp\n"));
    assert!(text.contains("COMMON_CONFIG += --with-mpc=/opt/libmpc\n"));
    assert!(text.contains("COMMON_CONFIG += --with-zstd=/opt/zstd\n"));
    assert!(text.contains("COMMON_CONFIG += --with-system-zlib\n"));
    assert!(text.contains("COMMON_CONFIG += --with-bugurl=https://example.com/issues\n"));
  }

  #[test]
  fn common_and_gcc_options() {
    let text = render(&selection(&["aarch64"]), &Settings::default());

    assert!(text.contains("COMMON_CONFIG += --disable-nls\n"));
    assert!(text.contains("COMMON_CONFIG += --enable-checking=release\n"));
    assert!(text.contains("COMMON_CONFIG += --enable-languages=c,c++\n"));
    assert!(text.contains(&format!(
      "COMMON_CONFIG += --with-pkgversion='muslcross {} x86_64 aarch64'\n",
      env!("CARGO_PKG_VERSION")
    )));
    assert!(text.contains("COMMON_CONFIG += --with-debug-prefix-map=/work/musl-cross-make=\n"));
    assert!(!text.contains("--with-debug-prefix-map=/work=\n"));
    assert!(!text.contains("--with-bugurl"));
    for option in GCC_CONFIG {
      assert!(text.contains(&format!("GCC_CONFIG += {option}\n")));
    }
  }

  #[test]
  fn clang_check_is_present() {
    let text = render(&selection(&[]), &Settings::default());
    assert!(text.contains("ifeq ($(shell $(CXX) -v 2>&1 | grep -c \"clang\"), 1)\n"));
    assert!(text.contains("TOOLCHAIN_CONFIG += CXX=\"$(CXX) -fbracket-depth=512\"\nendif\n"));
  }

  #[test]
  fn rendering_is_deterministic() {
    let settings = system_settings();
    assert_eq!(
      render(&selection(&["mips", "s390x"]), &settings),
      render(&selection(&["s390x", "mips"]), &settings)
    );
  }

  #[test]
  fn write_creates_config_mak() {
    let temp = TempDir::new().unwrap();
    let layout = Layout::new(temp.path(), Path::new("/prefix"));
    let settings = Settings::default();
    let config = BuildConfig::materialize(&selection(&[]), &Registry::standard(&settings), &layout, &settings);

    let path = config.write(temp.path()).unwrap();
    assert_eq!(path, temp.path().join("config.mak"));
    assert_eq!(std::fs::read_to_string(path).unwrap(), config.render());
  }
}
