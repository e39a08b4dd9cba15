//! Zone-drift detection core.
//!
//! # Purpose
//! Turns a vSphere VM migration notification into a drift classification: does
//! the VM carry a zone tag, and does its new host carry the same one? Drifted
//! results are rendered into an alert and handed to a [`notify::Notifier`].
//!
//! # Notes
//! Everything here is stateless per event. I/O happens only behind the
//! [`catalog::TagCatalog`] and [`notify::Notifier`] traits so the service crate
//! can plug in vSphere and webhook adapters while tests use in-memory doubles.
pub mod catalog;
pub mod detect;
pub mod event;
pub mod notify;
pub mod pipeline;
pub mod resolve;
pub mod tag;
pub mod validate;

pub use catalog::{CatalogError, CatalogFixture, CatalogResult, InMemoryCatalog, TagCatalog};
pub use detect::{DetectError, Drift, DriftResult, UNKNOWN_ZONE, detect};
pub use event::{EventEnvelope, MigrationEvent, NamedObject, ObjectRef};
pub use notify::{DeliveryError, DriftAlert, Notifier};
pub use pipeline::{DriftPipeline, PipelineConfig, PipelineError, PipelineOutcome};
pub use resolve::{ZoneAssignment, resolve_zone};
pub use tag::Tag;
pub use validate::{ValidationError, validate};
