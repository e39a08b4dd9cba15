//! Drift alerts and the delivery boundary.
//!
//! # Purpose
//! [`DriftAlert`] captures everything a human needs to act on a drifted VM and
//! renders it as a Slack `blocks` document (section, divider, section).
//! [`Notifier`] is the seam the pipeline delivers through; the service crate
//! provides the webhook implementation.
//!
//! # Key invariants
//! - Names are embedded verbatim; JSON escaping is left to `serde_json`.
//! - Delivery is attempted once per call. Retrying is the caller's decision.
use crate::detect::Drift;
use crate::event::MigrationEvent;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

const ALERT_HEADLINE: &str = ":warning: A virtual machine is *not running* in its preferred zone.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriftAlert {
    pub event_id: String,
    pub vm: String,
    pub source_host: String,
    pub destination_host: String,
    pub reason: String,
    pub vm_zone: String,
    pub host_zone: String,
}

impl DriftAlert {
    pub fn new(event: &MigrationEvent, drift: &Drift) -> Self {
        Self {
            event_id: event.id.clone(),
            vm: event.vm.name.clone(),
            source_host: event.source_host_name.clone(),
            destination_host: event.current_host.name.clone(),
            reason: event.subject.clone(),
            vm_zone: drift.vm_zone.clone(),
            host_zone: drift.host_zone.clone(),
        }
    }

    pub fn details(&self) -> String {
        format!(
            "Virtual machine {} migrated from host {} to host {}.\n\n *Event reason:* {}\n*VM zone:* {}\n*Host zone:* {}",
            self.vm,
            self.source_host,
            self.destination_host,
            self.reason,
            self.vm_zone,
            self.host_zone
        )
    }

    pub fn to_payload(&self) -> Value {
        json!({
            "blocks": [
                {
                    "type": "section",
                    "text": { "type": "mrkdwn", "text": ALERT_HEADLINE }
                },
                { "type": "divider" },
                {
                    "type": "section",
                    "text": { "type": "mrkdwn", "text": self.details() }
                }
            ]
        })
    }
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("could not create notification request: {0}")]
    Request(#[source] anyhow::Error),
    #[error("could not send notification: {0}")]
    Transport(#[source] anyhow::Error),
    #[error("could not read notification response body (status {status}): {source}")]
    Body {
        status: u16,
        #[source]
        source: anyhow::Error,
    },
    #[error("notification endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, alert: &DriftAlert) -> Result<(), DeliveryError>;
}
