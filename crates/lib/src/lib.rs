//! muslcross-lib: building musl cross toolchains with musl-cross-make.
//!
//! The crate is organised by pipeline stage:
//! - `target`: the static table of cross targets and selection rules
//! - `resources`: pinned source archives, verified downloads and staging
//! - `makeconf`: rendering musl-cross-make's `config.mak`
//! - `environment`: host-specific build environment
//! - `build`: running make per target and linking the results
//! - `verify`: compiling and inspecting smoke-test programs
//! - `pipeline`: the flows exposed by the `muslcross` binary

pub mod build;
pub mod consts;
pub mod environment;
pub mod layout;
pub mod lock;
pub mod makeconf;
pub mod pipeline;
pub mod platform;
pub mod resources;
pub mod settings;
pub mod target;
pub mod util;
pub mod verify;
