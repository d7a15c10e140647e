//! Cross target table and selection.
//!
//! The set of buildable targets is static data: a user-facing option identifier,
//! the canonical musl triple it builds, and whether it is built by default.
//! CLI flags and listings are generated from [`TARGETS`].

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// A buildable cross target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TargetSpec {
  /// User-facing option identifier (e.g. `armhf`).
  pub option: &'static str,
  /// Canonical target triple; also the prefix of every produced executable.
  pub triple: &'static str,
  pub default_enabled: bool,
}

impl fmt::Display for TargetSpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.triple)
  }
}

const fn target(option: &'static str, triple: &'static str, default_enabled: bool) -> TargetSpec {
  TargetSpec {
    option,
    triple,
    default_enabled,
  }
}

/// Every target musl-cross-make is asked to build, in build order.
pub const TARGETS: &[TargetSpec] = &[
  target("x86", "i686-linux-musl", false),
  target("i486", "i486-linux-musl", false),
  target("x86_64", "x86_64-linux-musl", true),
  target("x86_64x32", "x86_64-linux-muslx32", false),
  target("aarch64", "aarch64-linux-musl", false),
  target("arm", "arm-linux-musleabi", false),
  target("armhf", "arm-linux-musleabihf", false),
  target("mips", "mips-linux-musl", false),
  target("mipsel", "mipsel-linux-musl", false),
  target("mips64", "mips64-linux-musl", false),
  target("mips64el", "mips64el-linux-musl", false),
  target("powerpc", "powerpc-linux-musl", false),
  target("powerpc-sf", "powerpc-linux-muslsf", false),
  target("powerpc64", "powerpc64-linux-musl", false),
  target("s390x", "s390x-linux-musl", false),
];

/// Look up a target by option identifier.
pub fn find(option: &str) -> Option<&'static TargetSpec> {
  TARGETS.iter().find(|t| t.option == option)
}

/// Explicit user overrides applied on top of the default set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetOverrides {
  pub enable: Vec<String>,
  pub disable: Vec<String>,
  /// Build every declared target. Takes precedence over `disable`.
  pub all: bool,
}

/// Selection errors. Raised before any fetch or build starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectError {
  #[error("unknown target option '{option}' (known: {known})")]
  UnknownOption { option: String, known: String },

  #[error("target option '{0}' is both enabled and disabled")]
  Conflict(String),
}

/// An ordered, duplicate-free set of targets chosen for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
  targets: Vec<TargetSpec>,
}

impl Selection {
  pub fn targets(&self) -> &[TargetSpec] {
    &self.targets
  }

  pub fn triples(&self) -> Vec<&'static str> {
    self.targets.iter().map(|t| t.triple).collect()
  }

  pub fn options(&self) -> Vec<&'static str> {
    self.targets.iter().map(|t| t.option).collect()
  }

  pub fn is_empty(&self) -> bool {
    self.targets.is_empty()
  }

  pub fn len(&self) -> usize {
    self.targets.len()
  }
}

/// Resolve overrides against a target table.
///
/// Precedence, highest first: `all`, explicit disable, explicit enable, default.
/// Unknown identifiers and identifiers both enabled and disabled are rejected.
/// The result keeps table order.
pub fn select_targets(table: &[TargetSpec], overrides: &TargetOverrides) -> Result<Selection, SelectError> {
  for option in overrides.enable.iter().chain(&overrides.disable) {
    if !table.iter().any(|t| t.option == option) {
      return Err(SelectError::UnknownOption {
        option: option.clone(),
        known: table.iter().map(|t| t.option).collect::<Vec<_>>().join(", "),
      });
    }
  }

  if let Some(option) = overrides.enable.iter().find(|o| overrides.disable.contains(o)) {
    return Err(SelectError::Conflict(option.clone()));
  }

  let mut chosen: BTreeSet<&str> = table.iter().filter(|t| t.default_enabled).map(|t| t.option).collect();
  chosen.extend(overrides.enable.iter().map(String::as_str));
  for option in &overrides.disable {
    chosen.remove(option.as_str());
  }

  let targets = table
    .iter()
    .filter(|t| overrides.all || chosen.contains(t.option))
    .copied()
    .collect();

  Ok(Selection { targets })
}

#[cfg(test)]
mod tests {
  use super::*;

  const T1: TargetSpec = target("t1", "t1-linux-musl", true);
  const T2: TargetSpec = target("t2", "t2-linux-musl", false);
  const T3: TargetSpec = target("t3", "t3-linux-musl", false);
  const TABLE: &[TargetSpec] = &[T1, T2, T3];

  fn overrides(enable: &[&str], disable: &[&str], all: bool) -> TargetOverrides {
    TargetOverrides {
      enable: enable.iter().map(|s| s.to_string()).collect(),
      disable: disable.iter().map(|s| s.to_string()).collect(),
      all,
    }
  }

  #[test]
  fn defaults_only() {
    let selection = select_targets(TABLE, &TargetOverrides::default()).unwrap();
    assert_eq!(selection.targets(), &[T1]);
  }

  #[test]
  fn enable_adds_to_defaults() {
    let selection = select_targets(TABLE, &overrides(&["t2"], &[], false)).unwrap();
    assert_eq!(selection.targets(), &[T1, T2]);
  }

  #[test]
  fn disable_removes_default() {
    let selection = select_targets(TABLE, &overrides(&["t3"], &["t1"], false)).unwrap();
    assert_eq!(selection.targets(), &[T3]);
  }

  #[test]
  fn disabling_everything_yields_empty_selection() {
    let selection = select_targets(TABLE, &overrides(&[], &["t1"], false)).unwrap();
    assert!(selection.is_empty());
  }

  #[test]
  fn all_wins_over_individual_disables() {
    let selection = select_targets(TABLE, &overrides(&[], &["t1", "t2", "t3"], true)).unwrap();
    assert_eq!(selection.targets(), TABLE);
  }

  #[test]
  fn result_keeps_table_order() {
    let selection = select_targets(TABLE, &overrides(&["t3", "t2"], &[], false)).unwrap();
    assert_eq!(selection.options(), vec!["t1", "t2", "t3"]);
  }

  #[test]
  fn duplicate_enables_are_collapsed() {
    let selection = select_targets(TABLE, &overrides(&["t2", "t2"], &[], false)).unwrap();
    assert_eq!(selection.len(), 2);
  }

  #[test]
  fn unknown_option_is_rejected() {
    let err = select_targets(TABLE, &overrides(&["sparc"], &[], false)).unwrap_err();
    assert!(matches!(err, SelectError::UnknownOption { ref option, .. } if option == "sparc"));

    let err = select_targets(TABLE, &overrides(&[], &["vax"], true)).unwrap_err();
    assert!(matches!(err, SelectError::UnknownOption { ref option, .. } if option == "vax"));
  }

  #[test]
  fn enable_and_disable_same_option_conflicts() {
    let err = select_targets(TABLE, &overrides(&["t2"], &["t2"], false)).unwrap_err();
    assert_eq!(err, SelectError::Conflict("t2".to_string()));
  }

  #[test]
  fn table_identifiers_and_triples_are_unique() {
    let options: BTreeSet<_> = TARGETS.iter().map(|t| t.option).collect();
    let triples: BTreeSet<_> = TARGETS.iter().map(|t| t.triple).collect();
    assert_eq!(options.len(), TARGETS.len());
    assert_eq!(triples.len(), TARGETS.len());
  }

  #[test]
  fn x86_64_is_the_only_default() {
    let selection = select_targets(TARGETS, &TargetOverrides::default()).unwrap();
    assert_eq!(selection.triples(), vec!["x86_64-linux-musl"]);
    assert_eq!(find("armhf").map(|t| t.triple), Some("arm-linux-musleabihf"));
  }
}
