//! Tag catalog boundary.
//!
//! # Purpose
//! The detector needs two read-only queries against the tagging service: the
//! tags of one category, and the tag ids attached to an inventory object. This
//! trait isolates them so adapters (vSphere REST, in-memory fixtures, test
//! doubles) can be swapped without touching detection.
//!
//! # Key invariants
//! - Results are ordered sequences. Resolution is first-match, so the order an
//!   adapter returns is the order the resolver honors.
//! - Implementations must not cache lookup results across events.
use crate::event::ObjectRef;
use crate::tag::Tag;
use async_trait::async_trait;
use thiserror::Error;

pub mod memory;

pub use memory::{CatalogFixture, InMemoryCatalog};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("tag category not found: {0}")]
    CategoryNotFound(String),
    #[error("tag catalog unavailable: {0}")]
    Unavailable(#[from] anyhow::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Read-only view of the tagging service used by drift detection.
///
/// # What it does
/// Answers the two queries the detector issues per event: the tags of the
/// zone category, and the tag ids attached to a VM or host.
///
/// # Why it exists
/// Keeps vCenter I/O out of the detection logic so backends can be swapped
/// (REST adapter, fixtures, failing doubles in tests).
///
/// # Invariants
/// - Returned sequences keep the backend's order; callers rely on it for
///   first-match resolution.
/// - No result is cached between calls.
#[async_trait]
pub trait TagCatalog: Send + Sync {
    /// All tags in `category`, which may be a category name or id.
    ///
    /// # Errors
    /// - `CategoryNotFound` when no category has that id or name.
    /// - `Unavailable` on transport, authentication or decoding failures.
    async fn tags_for_category(&self, category: &str) -> CatalogResult<Vec<Tag>>;

    /// Ids of the tags attached to `object`, in association order.
    ///
    /// An object with no tags yields an empty list, not an error.
    ///
    /// # Errors
    /// - `Unavailable` on transport, authentication or decoding failures.
    async fn attached_tags(&self, object: &ObjectRef) -> CatalogResult<Vec<String>>;

    /// Short backend label for logs (`vsphere`, `memory`, ...).
    fn backend_name(&self) -> &'static str;
}
