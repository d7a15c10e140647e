//! End-to-end flows for one invocation.
//!
//! `install` runs every stage in order:
//!
//! 1. select targets (fails before any network access)
//! 2. lock the prefix
//! 3. fetch and verify all resources
//! 4. stage the build tree and write `config.mak`
//! 5. prepare the host environment
//! 6. build targets in sequence, stopping at the first failure
//! 7. link binaries into `<prefix>/bin`
//! 8. optionally smoke-test the new toolchains
//!
//! The work directory is kept whenever something fails so build logs remain
//! available.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::build::{self, BuildContext, BuildError, BuildRun, ToolchainInstall};
use crate::environment::{self, EnvError, HostEnv};
use crate::layout::Layout;
use crate::lock::{LockError, PrefixLock};
use crate::makeconf::BuildConfig;
use crate::platform::Platform;
use crate::resources::{self, FetchedResource, Registry, ResourceError};
use crate::settings::{Settings, SettingsError};
use crate::target::{SelectError, Selection, TARGETS, TargetOverrides, select_targets};
use crate::verify::{self, VerificationReport};

#[derive(Debug, Error)]
pub enum PipelineError {
  #[error(transparent)]
  Settings(#[from] SettingsError),

  #[error(transparent)]
  Select(#[from] SelectError),

  #[error("no targets selected; enable at least one with --with")]
  NoTargets,

  #[error("unsupported host platform")]
  UnsupportedHost,

  #[error(transparent)]
  Resource(#[from] ResourceError),

  #[error(transparent)]
  Lock(#[from] LockError),

  #[error(transparent)]
  Env(#[from] EnvError),

  #[error(transparent)]
  Build(#[from] BuildError),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Options for [`install`] that do not live in [`Settings`].
#[derive(Debug, Clone)]
pub struct InstallOptions {
  pub overrides: TargetOverrides,
  pub verify: bool,
  /// Keep the work directory even after a successful install.
  pub keep_work: bool,
  /// Recorded in the prefix lock for contention messages.
  pub command: String,
}

#[derive(Debug)]
pub struct InstallOutcome {
  pub selection: Selection,
  pub fetched: Vec<FetchedResource>,
  pub build: BuildRun,
  pub links: Vec<PathBuf>,
  pub verification: Option<VerificationReport>,
  pub work_dir: PathBuf,
  /// Whether `work_dir` was left on disk.
  pub work_kept: bool,
}

impl InstallOutcome {
  pub fn is_success(&self) -> bool {
    self.build.is_success() && self.verification.as_ref().is_none_or(VerificationReport::is_success)
  }
}

/// Resolve target overrides against the built-in table.
pub fn select(overrides: &TargetOverrides) -> Result<Selection, PipelineError> {
  Ok(select_targets(TARGETS, overrides)?)
}

/// Build directory layout for `settings`.
///
/// The work directory defaults to `<prefix>/.work`, which the prefix lock
/// also guards.
pub fn layout(settings: &Settings) -> Layout {
  let prefix = settings.prefix();
  let work_dir = settings.work_dir.clone().unwrap_or_else(|| prefix.join(".work"));
  Layout::new(&work_dir, &prefix)
}

/// Render `config.mak` for a selection without touching the filesystem.
pub fn render_config(settings: &Settings, overrides: &TargetOverrides) -> Result<String, PipelineError> {
  let selection = select(overrides)?;
  let registry = Registry::standard(settings);
  Ok(BuildConfig::materialize(&selection, &registry, &layout(settings), settings).render())
}

/// Populate the download cache with every declared resource.
pub async fn fetch(settings: &Settings) -> Result<Vec<FetchedResource>, PipelineError> {
  let registry = Registry::standard(settings);
  let client = resources::fetch::http_client()?;
  let fetched = resources::fetch_all(
    &client,
    registry.resources(),
    &settings.downloads_dir(),
    settings.fetch_parallelism,
  )
  .await?;
  Ok(fetched)
}

/// Fetch, build, link and optionally verify the selected toolchains.
///
/// A failed build is reported through [`InstallOutcome::build`] rather than as
/// an error so callers can show which targets were installed or skipped.
pub async fn install(
  settings: &Settings,
  host: Platform,
  base_env: &HostEnv,
  options: &InstallOptions,
) -> Result<InstallOutcome, PipelineError> {
  let selection = select(&options.overrides)?;
  if selection.is_empty() {
    return Err(PipelineError::NoTargets);
  }
  info!(targets = ?selection.triples(), "selected targets");

  let layout = layout(settings);
  let _lock = PrefixLock::acquire(&layout.lock_path(), &options.command)?;

  let fetched = fetch(settings).await?;

  resources::stage(&fetched, &layout.work_dir).await?;
  let registry = Registry::standard(settings);
  BuildConfig::materialize(&selection, &registry, &layout, settings).write(&layout.tree.source_dir)?;

  let patch = environment::prepare(host, settings, &layout.work_dir);
  patch.install_stubs()?;

  let ctx = BuildContext {
    make: patch.make.clone(),
    jobs: settings.jobs,
    source_dir: layout.tree.source_dir.clone(),
    output_dir: layout.output_dir(),
    logs_dir: layout.logs_dir(),
    env: patch.env_map(base_env)?,
  };

  let run = build::build_all(&selection, &ctx).await;

  let mut outcome = InstallOutcome {
    selection,
    fetched,
    build: run,
    links: Vec::new(),
    verification: None,
    work_dir: layout.work_dir.clone(),
    work_kept: true,
  };

  if !outcome.build.is_success() {
    warn!(work_dir = ?layout.work_dir, "build failed, keeping work directory");
    return Ok(outcome);
  }

  outcome.links = build::link_binaries(&layout.output_dir(), &layout.bin_dir())?;

  if options.verify {
    let installs = linked_installs(&outcome.build.installed, &layout.bin_dir());
    outcome.verification = Some(verify::verify(&installs, &layout.verify_dir()).await?);
  }

  let owns_work_dir = settings.work_dir.is_none();
  if outcome.is_success() && owns_work_dir && !options.keep_work {
    tokio::fs::remove_dir_all(&layout.work_dir).await?;
    outcome.work_kept = false;
  }

  Ok(outcome)
}

/// Smoke-test toolchains already linked into the prefix.
pub async fn verify_installed(
  settings: &Settings,
  overrides: &TargetOverrides,
) -> Result<VerificationReport, PipelineError> {
  let selection = select(overrides)?;
  if selection.is_empty() {
    return Err(PipelineError::NoTargets);
  }

  let bin_dir = layout(settings).bin_dir();
  let installs: Vec<_> = selection
    .triples()
    .into_iter()
    .map(|triple| ToolchainInstall::new(triple, &bin_dir))
    .collect();

  let scratch = tempfile::Builder::new().prefix("muslcross-verify-").tempdir()?;
  Ok(verify::verify(&installs, scratch.path()).await?)
}

/// The same toolchains, addressed through their `<prefix>/bin` links.
fn linked_installs(installed: &[ToolchainInstall], bin_dir: &Path) -> Vec<ToolchainInstall> {
  installed
    .iter()
    .map(|i| ToolchainInstall::new(i.triple.clone(), bin_dir))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::platform::{Arch, Os};
  use crate::resources::ResourceKind;
  use crate::util::hash::hash_bytes;
  use crate::util::testutil::{fake_make, fake_toolchain};
  use flate2::Compression;
  use flate2::write::GzEncoder;
  use tempfile::TempDir;

  fn linux() -> Platform {
    Platform::new(Arch::X86_64, Os::Linux)
  }

  fn settings_in(temp: &TempDir) -> Settings {
    Settings {
      prefix: Some(temp.path().join("prefix")),
      cache_dir: Some(temp.path().join("cache")),
      ..Settings::default()
    }
  }

  fn build_system_archive() -> Vec<u8> {
    let makefile = b"all:\n";
    let mut header = tar::Header::new_gnu();
    header.set_size(makefile.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();

    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    builder
      .append_data(&mut header, "musl-cross-make-test/Makefile", &makefile[..])
      .unwrap();
    builder.into_inner().unwrap().finish().unwrap()
  }

  /// Settings whose every resource is already in the download cache, with
  /// `fake_make` standing in for GNU make.
  fn offline_settings(temp: &TempDir) -> Settings {
    let mut settings = settings_in(temp);
    let archive = build_system_archive();
    settings.build_system.sha256 = hash_bytes(&archive).0;

    let v = &mut settings.versions;
    for (var, pin) in [
      ("LINUX_VER", &mut v.linux),
      ("GCC_VER", &mut v.gcc),
      ("BINUTILS_VER", &mut v.binutils),
      ("MUSL_VER", &mut v.musl),
      ("CONFIG_SUB_REV", &mut v.config_sub),
      ("GMP_VER", &mut v.gmp),
      ("MPFR_VER", &mut v.mpfr),
      ("MPC_VER", &mut v.mpc),
      ("ISL_VER", &mut v.isl),
    ] {
      pin.sha256 = hash_bytes(var.as_bytes()).0;
    }

    let downloads = settings.downloads_dir();
    for resource in Registry::standard(&settings).resources() {
      let bytes = match (resource.kind, resource.version_var) {
        (ResourceKind::BuildSystem, _) => archive.clone(),
        (_, Some(var)) => var.as_bytes().to_vec(),
        (_, None) => panic!("unexpected resource {}", resource.name),
      };
      let path = resource.cache_path(&downloads);
      std::fs::create_dir_all(path.parent().unwrap()).unwrap();
      std::fs::write(path, bytes).unwrap();
    }

    settings.host.make = Some(fake_make(temp.path()).display().to_string());
    settings
  }

  fn base_env(temp: &TempDir, extra: &[(&str, &str)]) -> HostEnv {
    let mut vars = vec![
      (
        "PATH".to_string(),
        std::env::var("PATH").unwrap_or_else(|_| "/usr/bin:/bin".to_string()),
      ),
      (
        "FAKE_OUTPUT".to_string(),
        temp.path().join("prefix/libexec").display().to_string(),
      ),
    ];
    vars.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
    HostEnv::from_vars(vars)
  }

  fn install_options(enable: &[&str], keep_work: bool) -> InstallOptions {
    InstallOptions {
      overrides: TargetOverrides {
        enable: enable.iter().map(|s| s.to_string()).collect(),
        ..TargetOverrides::default()
      },
      verify: false,
      keep_work,
      command: "install".to_string(),
    }
  }

  #[tokio::test]
  async fn install_builds_links_and_cleans_up() {
    let temp = TempDir::new().unwrap();
    let settings = offline_settings(&temp);
    let prefix = temp.path().join("prefix");

    let outcome = install(&settings, linux(), &base_env(&temp, &[]), &install_options(&["aarch64"], false))
      .await
      .unwrap();

    assert!(outcome.is_success());
    assert!(outcome.fetched.iter().all(|f| f.cached));
    let triples: Vec<_> = outcome.build.installed.iter().map(|i| i.triple.as_str()).collect();
    assert_eq!(triples, vec!["x86_64-linux-musl", "aarch64-linux-musl"]);

    assert_eq!(outcome.links.len(), 6);
    assert_eq!(
      std::fs::read_link(prefix.join("bin/aarch64-linux-musl-cc")).unwrap(),
      prefix.join("libexec/bin/aarch64-linux-musl-cc")
    );
    assert!(!outcome.work_kept);
    assert!(!prefix.join(".work").exists());
  }

  #[tokio::test]
  async fn install_keeps_work_tree_on_request() {
    let temp = TempDir::new().unwrap();
    let settings = offline_settings(&temp);
    let work = temp.path().join("prefix/.work");

    let outcome = install(&settings, linux(), &base_env(&temp, &[]), &install_options(&[], true))
      .await
      .unwrap();

    assert!(outcome.is_success());
    assert!(outcome.work_kept);

    let config = std::fs::read_to_string(work.join("musl-cross-make/config.mak")).unwrap();
    assert!(config.contains("GCC_VER = 13.1.0"));
    assert!(config.contains("--with-pkgversion='muslcross"));
    assert!(work.join("musl-cross-make/Makefile").exists());
    assert!(work.join("sources/gcc-13.1.0.tar.xz").exists());
    assert!(work.join("fakejdk/bin/java").exists());

    let log = std::fs::read_to_string(work.join("logs/x86_64-linux-musl.log")).unwrap();
    assert!(log.contains("make install TARGET=x86_64-linux-musl"));
  }

  #[tokio::test]
  async fn failed_build_keeps_work_and_skips_linking() {
    let temp = TempDir::new().unwrap();
    let settings = offline_settings(&temp);
    let env = base_env(&temp, &[("FAKE_FAIL", "x86_64-linux-musl")]);

    let outcome = install(&settings, linux(), &env, &install_options(&["aarch64"], false))
      .await
      .unwrap();

    assert!(!outcome.is_success());
    assert_eq!(
      outcome.build.failed.as_ref().map(|(t, _)| t.as_str()),
      Some("x86_64-linux-musl")
    );
    assert_eq!(outcome.build.skipped, vec!["aarch64-linux-musl"]);
    assert!(outcome.links.is_empty());
    assert!(outcome.work_kept);
    assert!(temp.path().join("prefix/.work/logs/x86_64-linux-musl.log").exists());
    assert!(!temp.path().join("prefix/bin").exists());
  }

  #[tokio::test]
  async fn install_rejects_unknown_option_before_any_work() {
    let temp = TempDir::new().unwrap();
    let settings = settings_in(&temp);

    let err = install(&settings, linux(), &HostEnv::default(), &install_options(&["sparc"], false))
      .await
      .unwrap_err();

    assert!(matches!(err, PipelineError::Select(SelectError::UnknownOption { .. })));
    assert!(!temp.path().join("prefix").exists());
    assert!(!temp.path().join("cache").exists());
  }

  #[test]
  fn work_dir_defaults_under_prefix() {
    let temp = TempDir::new().unwrap();
    let settings = settings_in(&temp);

    assert_eq!(layout(&settings).work_dir, temp.path().join("prefix/.work"));

    let settings = Settings {
      work_dir: Some(temp.path().join("scratch")),
      ..settings
    };
    assert_eq!(layout(&settings).work_dir, temp.path().join("scratch"));
  }

  #[test]
  fn render_config_uses_prefix_layout() {
    let temp = TempDir::new().unwrap();
    let settings = settings_in(&temp);

    let text = render_config(&settings, &TargetOverrides::default()).unwrap();
    assert!(text.contains(&format!("OUTPUT = {}", temp.path().join("prefix/libexec").display())));
    assert!(text.contains(&format!("SOURCES = {}", temp.path().join("prefix/.work/sources").display())));
  }

  #[test]
  fn render_config_rejects_unknown_option() {
    let overrides = TargetOverrides {
      enable: vec!["sparc".to_string()],
      ..TargetOverrides::default()
    };
    let err = render_config(&Settings::default(), &overrides).unwrap_err();
    assert!(matches!(err, PipelineError::Select(SelectError::UnknownOption { .. })));
  }

  #[tokio::test]
  async fn install_refuses_empty_selection_before_locking() {
    let temp = TempDir::new().unwrap();
    let settings = settings_in(&temp);
    let options = InstallOptions {
      overrides: TargetOverrides {
        disable: vec!["x86_64".to_string()],
        ..TargetOverrides::default()
      },
      verify: false,
      keep_work: false,
      command: "install".to_string(),
    };

    let err = install(&settings, linux(), &HostEnv::default(), &options).await.unwrap_err();

    assert!(matches!(err, PipelineError::NoTargets));
    assert!(!temp.path().join("prefix").exists());
  }

  #[tokio::test]
  async fn verify_installed_uses_prefix_links() {
    let temp = TempDir::new().unwrap();
    let settings = settings_in(&temp);
    fake_toolchain(&temp.path().join("prefix/bin"), "x86_64-linux-musl", None);

    let report = verify_installed(&settings, &TargetOverrides::default()).await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.targets.len(), 1);
  }

  #[tokio::test]
  async fn verify_installed_reports_missing_toolchains() {
    let temp = TempDir::new().unwrap();
    let settings = settings_in(&temp);

    let overrides = TargetOverrides {
      enable: vec!["armhf".to_string()],
      ..TargetOverrides::default()
    };
    let report = verify_installed(&settings, &overrides).await.unwrap();
    assert_eq!(report.failures().count(), 2);
  }

  #[test]
  fn linked_installs_point_at_prefix_bin() {
    let installs = linked_installs(
      &[ToolchainInstall::new("mips-linux-musl", "/p/libexec/bin")],
      Path::new("/p/bin"),
    );
    assert_eq!(installs[0].tool("cc"), PathBuf::from("/p/bin/mips-linux-musl-cc"));
  }
}
