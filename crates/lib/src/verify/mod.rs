//! Smoke-testing installed toolchains.
//!
//! For every toolchain a C and a C++ hello world are compiled with the
//! prefixed compiler driver, then the target's binutils are run against the
//! result. Commands run with an empty environment so the toolchain cannot lean
//! on anything from the host shell.
//!
//! A failing target ends its own checks but never the run; the report lists
//! every step taken per target.

mod runner;
mod types;

pub use runner::{INSPECTIONS, verify};
pub use types::*;
