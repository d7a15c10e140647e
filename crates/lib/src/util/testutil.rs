//! Test helpers standing in for make and cross toolchains.
//!
//! The scripts only use shell builtins where they may run with a cleared
//! environment.

use std::collections::BTreeMap;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::verify::INSPECTIONS;

/// Write an executable `/bin/sh` script.
pub fn write_script(path: &Path, body: &str) -> PathBuf {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(path, format!("#!/bin/sh\n{body}")).unwrap();
  std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
  path.to_path_buf()
}

/// A stand-in for make that installs an empty toolchain into `$FAKE_OUTPUT/bin`.
///
/// `FAKE_FAIL=<triple>` makes that target fail with exit code 2;
/// `FAKE_NO_CC=1` exits successfully without installing anything.
pub fn fake_make(dir: &Path) -> PathBuf {
  write_script(
    &dir.join("fake-make"),
    r#"target=""
for arg in "$@"; do
  case "$arg" in
    TARGET=*) target="${arg#TARGET=}" ;;
  esac
done
echo "make $*"
if [ -n "$FAKE_FAIL" ] && [ "$target" = "$FAKE_FAIL" ]; then
  echo "error: cannot build $target" >&2
  exit 2
fi
[ -n "$FAKE_NO_CC" ] && exit 0
mkdir -p "$FAKE_OUTPUT/bin"
for tool in cc c++ readelf; do
  : > "$FAKE_OUTPUT/bin/$target-$tool"
done
echo "installed $target"
"#,
  )
}

/// Environment for [`fake_make`] with the host `PATH`.
pub fn fake_make_env(output: &Path) -> BTreeMap<String, String> {
  let mut env = BTreeMap::new();
  env.insert(
    "PATH".to_string(),
    std::env::var("PATH").unwrap_or_else(|_| "/usr/bin:/bin".to_string()),
  );
  env.insert("FAKE_OUTPUT".to_string(), output.display().to_string());
  env
}

/// Install a fake cross toolchain for `triple` into `bin_dir`.
///
/// The compiler drivers create whatever `-o` names; every other tool succeeds
/// unless it is `failing`.
pub fn fake_toolchain(bin_dir: &Path, triple: &str, failing: Option<&str>) {
  let compiler = r#"out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then
    out="$2"
    shift
  fi
  shift
done
[ -n "$out" ] && : > "$out"
exit 0
"#;

  for driver in ["cc", "c++"] {
    let body = if failing == Some(driver) { "exit 1\n" } else { compiler };
    write_script(&bin_dir.join(format!("{triple}-{driver}")), body);
  }

  for (tool, _) in INSPECTIONS {
    let body = if failing == Some(*tool) { "exit 1\n" } else { "exit 0\n" };
    write_script(&bin_dir.join(format!("{triple}-{tool}")), body);
  }
}
