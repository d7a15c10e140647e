//! Resource registry, fetching and staging.
//!
//! Every archive a build needs is declared up front with a pinned SHA-256.
//! Downloads land in a content-addressed cache and are only handed to the build
//! after their digest verifies, so the build itself runs offline.

pub mod fetch;
pub mod registry;
pub mod stage;
pub mod types;

pub use fetch::{fetch, fetch_all};
pub use registry::Registry;
pub use stage::{StagedTree, stage};
pub use types::{FetchedResource, Resource, ResourceError, ResourceKind};
