//! tagdrift service library crate.
//!
//! # Purpose
//! Exposes the HTTP surface, configuration, observability wiring and the
//! vSphere/webhook adapters that plug into `tagdrift-core`, for use by the
//! binary and integration tests.
//!
//! # Notes
//! Detection logic lives in `tagdrift-core`; this crate only owns I/O.
pub mod api;
pub mod app;
pub mod catalog;
pub mod config;
pub mod notify;
pub mod observability;

/// Commit the binary was built from, injected via `TAGDRIFT_BUILD_COMMIT`.
pub const BUILD_COMMIT: &str = match option_env!("TAGDRIFT_BUILD_COMMIT") {
    Some(commit) => commit,
    None => "unknown",
};
