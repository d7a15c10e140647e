//! Driving musl-cross-make, one target at a time.
//!
//! Each selected target is built by `make install TARGET=<triple>` in the
//! staged tree. Output goes to a per-target log file rather than the terminal;
//! on failure the tail of that log is carried in the error. Targets build
//! strictly in sequence and the first failure stops the run.
//!
//! # Submodules
//!
//! - [`driver`] - running make for one target or a whole selection
//! - [`link`] - exposing installed executables under `<prefix>/bin`

pub mod driver;
pub mod link;
mod types;

pub use driver::{BuildContext, build_all, build_target};
pub use link::link_binaries;
pub use types::*;
