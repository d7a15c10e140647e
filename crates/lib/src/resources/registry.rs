//! Declared resources for a toolchain build.

use crate::resources::types::{Resource, ResourceError, ResourceKind};
use crate::settings::{Pin, Settings};
use crate::util::hash::ContentHash;

const GNU_MIRROR: &str = "https://ftp.gnu.org/gnu";

/// The complete set of resources for one invocation, in declaration order.
///
/// The build system archive is always first, followed by components and then
/// patches in the order they must be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
  resources: Vec<Resource>,
}

impl Registry {
  /// Declare everything a musl-cross-make build needs under `settings`.
  ///
  /// GMP, MPFR, MPC and ISL sources are only declared when the support
  /// libraries are bundled.
  pub fn standard(settings: &Settings) -> Self {
    let v = &settings.versions;
    let bs = &settings.build_system;

    let mut resources = vec![Resource {
      name: format!("musl-cross-make-{}.tar.gz", bs.rev),
      kind: ResourceKind::BuildSystem,
      version: bs.rev.clone(),
      version_var: None,
      url: bs.archive_url(),
      sha256: ContentHash::normalize(&bs.sha256),
    }];

    resources.push(component(
      &format!("linux-{}.tar.xz", v.linux.version),
      "LINUX_VER",
      &v.linux,
      linux_url(&v.linux.version),
    ));
    resources.push(component(
      &format!("gcc-{}.tar.xz", v.gcc.version),
      "GCC_VER",
      &v.gcc,
      format!("{GNU_MIRROR}/gcc/gcc-{0}/gcc-{0}.tar.xz", v.gcc.version),
    ));
    resources.push(component(
      &format!("binutils-{}.tar.xz", v.binutils.version),
      "BINUTILS_VER",
      &v.binutils,
      format!("{GNU_MIRROR}/binutils/binutils-{}.tar.xz", v.binutils.version),
    ));
    resources.push(component(
      &format!("musl-{}.tar.gz", v.musl.version),
      "MUSL_VER",
      &v.musl,
      format!("https://www.musl-libc.org/releases/musl-{}.tar.gz", v.musl.version),
    ));
    resources.push(component(
      "config.sub",
      "CONFIG_SUB_REV",
      &v.config_sub,
      format!(
        "https://git.savannah.gnu.org/gitweb/?p=config.git;a=blob_plain;f=config.sub;hb={}",
        v.config_sub.version
      ),
    ));

    if settings.support_libs.is_bundled() {
      resources.push(component(
        &format!("gmp-{}.tar.bz2", v.gmp.version),
        "GMP_VER",
        &v.gmp,
        format!("{GNU_MIRROR}/gmp/gmp-{}.tar.bz2", v.gmp.version),
      ));
      resources.push(component(
        &format!("mpfr-{}.tar.bz2", v.mpfr.version),
        "MPFR_VER",
        &v.mpfr,
        format!("{GNU_MIRROR}/mpfr/mpfr-{}.tar.bz2", v.mpfr.version),
      ));
      resources.push(component(
        &format!("mpc-{}.tar.gz", v.mpc.version),
        "MPC_VER",
        &v.mpc,
        format!("{GNU_MIRROR}/mpc/mpc-{}.tar.gz", v.mpc.version),
      ));
      resources.push(component(
        &format!("isl-{}.tar.bz2", v.isl.version),
        "ISL_VER",
        &v.isl,
        format!("https://downloads.sourceforge.net/project/libisl/isl-{}.tar.bz2", v.isl.version),
      ));
    }

    for patch in &settings.patches {
      resources.push(Resource {
        name: patch.name.clone(),
        kind: ResourceKind::Patch,
        version: String::new(),
        version_var: None,
        url: patch.url.clone(),
        sha256: ContentHash::normalize(&patch.sha256),
      });
    }

    Self { resources }
  }

  pub fn resources(&self) -> &[Resource] {
    &self.resources
  }

  /// Fetch metadata for a resource by name.
  pub fn resolve(&self, name: &str) -> Result<&Resource, ResourceError> {
    self
      .resources
      .iter()
      .find(|r| r.name == name)
      .ok_or_else(|| ResourceError::Unknown(name.to_string()))
  }

  pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &Resource> {
    self.resources.iter().filter(move |r| r.kind == kind)
  }
}

fn component(name: &str, var: &'static str, pin: &Pin, url: String) -> Resource {
  Resource {
    name: name.to_string(),
    kind: ResourceKind::Component,
    version: pin.version.clone(),
    version_var: Some(var),
    url,
    sha256: ContentHash::normalize(&pin.sha256),
  }
}

/// kernel.org groups releases by major version: `v6.x/linux-6.1.31.tar.xz`.
fn linux_url(version: &str) -> String {
  let major = version.split('.').next().unwrap_or(version);
  format!("https://cdn.kernel.org/pub/linux/kernel/v{major}.x/linux-{version}.tar.xz")
}
