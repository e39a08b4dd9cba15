//! Drift classification.
//!
//! # Purpose
//! Resolves the zone tag of a migrated VM and of the host it landed on, then
//! classifies the pair as [`DriftResult::NoZoneConstraint`],
//! [`DriftResult::InSync`] or [`DriftResult::Drifted`].
//!
//! # Key invariants
//! - At most three catalog lookups per event, in order: category tags, VM
//!   tags, host tags. The host lookup is skipped when the VM has no zone.
//! - Any lookup failure aborts detection; no partial result escapes.
//! - Ambiguous assignments are logged at `warn` and resolved first-match.
use crate::catalog::{CatalogError, TagCatalog};
use crate::event::MigrationEvent;
use crate::resolve::{ZoneAssignment, resolve_zone};
use crate::tag::Tag;
use thiserror::Error;

/// Host zone rendered when the host carries no tag from the category.
pub const UNKNOWN_ZONE: &str = "(n/a)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drift {
    pub vm_zone: String,
    pub host_zone: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriftResult {
    /// The VM carries no zone tag and is not subject to placement policy.
    NoZoneConstraint,
    InSync { zone: Tag },
    Drifted(Drift),
}

impl DriftResult {
    pub fn outcome(&self) -> &'static str {
        match self {
            DriftResult::NoZoneConstraint => "no_zone_constraint",
            DriftResult::InSync { .. } => "in_sync",
            DriftResult::Drifted(_) => "drifted",
        }
    }
}

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("could not get tags for category {category:?}: {source}")]
    CategoryLookup {
        category: String,
        #[source]
        source: CatalogError,
    },
    #[error("could not get tags for vm {vm:?}: {source}")]
    VmTagLookup {
        vm: String,
        #[source]
        source: CatalogError,
    },
    #[error("could not retrieve tags for host {host:?}: {source}")]
    HostTagLookup {
        host: String,
        #[source]
        source: CatalogError,
    },
}

impl DetectError {
    /// Which lookup failed: `category`, `vm` or `host`.
    pub fn lookup(&self) -> &'static str {
        match self {
            DetectError::CategoryLookup { .. } => "category",
            DetectError::VmTagLookup { .. } => "vm",
            DetectError::HostTagLookup { .. } => "host",
        }
    }
}

fn record_lookup<T>(lookup: &'static str, result: &Result<T, CatalogError>) {
    let outcome = if result.is_ok() { "ok" } else { "error" };
    metrics::counter!(
        "tagdrift_catalog_lookups_total",
        "lookup" => lookup,
        "result" => outcome
    )
    .increment(1);
}

fn warn_if_ambiguous(object: &str, name: &str, assignment: &ZoneAssignment) {
    if let ZoneAssignment::Ambiguous {
        selected,
        candidates,
    } = assignment
    {
        let candidate_names: Vec<&str> = candidates.iter().map(|tag| tag.name.as_str()).collect();
        tracing::warn!(
            object,
            name,
            selected = %selected.name,
            candidates = ?candidate_names,
            "multiple zone tags attached, using first attached"
        );
    }
}

/// Classify `event` against the zone tags of `category`.
///
/// # What it does
/// Fetches the category's tags and the VM's attached tags, resolves the VM
/// zone, and stops with [`DriftResult::NoZoneConstraint`] when there is none.
/// Otherwise fetches the destination host's tags and compares the two zones
/// by tag id.
///
/// # Why it exists
/// This is the single decision point for "is this VM where it should be";
/// validation happens before it and notification after it.
///
/// # Errors
/// - [`DetectError::CategoryLookup`], [`DetectError::VmTagLookup`] or
///   [`DetectError::HostTagLookup`] for the first catalog call that fails.
///   Later lookups are not attempted.
pub async fn detect(
    event: &MigrationEvent,
    category: &str,
    catalog: &dyn TagCatalog,
) -> Result<DriftResult, DetectError> {
    let zone_tags = catalog.tags_for_category(category).await;
    record_lookup("category", &zone_tags);
    let zone_tags = zone_tags.map_err(|source| DetectError::CategoryLookup {
        category: category.to_string(),
        source,
    })?;

    let vm_tags = catalog.attached_tags(&event.vm.reference).await;
    record_lookup("vm", &vm_tags);
    let vm_tags = vm_tags.map_err(|source| DetectError::VmTagLookup {
        vm: event.vm.name.clone(),
        source,
    })?;

    let vm_assignment = resolve_zone(&zone_tags, &vm_tags);
    warn_if_ambiguous("vm", &event.vm.name, &vm_assignment);
    let Some(vm_zone) = vm_assignment.tag() else {
        tracing::debug!(
            vm = %event.vm.name,
            zone_tags = ?zone_tags,
            vm_tags = ?vm_tags,
            "ignoring vm: did not contain matching zonal tag"
        );
        return Ok(DriftResult::NoZoneConstraint);
    };
    tracing::debug!(vm = %event.vm.name, zone = %vm_zone.name, "found zone assignment for vm");

    let host_tags = catalog.attached_tags(&event.current_host.reference).await;
    record_lookup("host", &host_tags);
    let host_tags = host_tags.map_err(|source| DetectError::HostTagLookup {
        host: event.current_host.name.clone(),
        source,
    })?;

    let host_assignment = resolve_zone(&zone_tags, &host_tags);
    warn_if_ambiguous("host", &event.current_host.name, &host_assignment);

    match host_assignment.tag() {
        Some(host_zone) if host_zone.id == vm_zone.id => {
            tracing::debug!(
                vm = %event.vm.name,
                host = %event.current_host.name,
                zone = %vm_zone.name,
                "vm and host running in same zone"
            );
            Ok(DriftResult::InSync {
                zone: vm_zone.clone(),
            })
        }
        host_zone => {
            let host_zone = host_zone
                .map(|tag| tag.name.clone())
                .unwrap_or_else(|| UNKNOWN_ZONE.to_string());
            tracing::info!(
                vm = %event.vm.name,
                host = %event.current_host.name,
                vm_zone = %vm_zone.name,
                host_zone = %host_zone,
                "vm not running on a host matching desired zone"
            );
            Ok(DriftResult::Drifted(Drift {
                vm_zone: vm_zone.name.clone(),
                host_zone,
            }))
        }
    }
}
