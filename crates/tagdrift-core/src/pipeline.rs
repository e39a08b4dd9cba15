//! End-to-end processing of one migration event.
//!
//! # Purpose
//! Wires validation, detection and notification into the single operation the
//! HTTP layer calls: [`DriftPipeline::process`].
//!
//! # Lifecycle
//! `Received -> Validated -> CatalogLookup* -> Classified -> [Notified] -> Done`,
//! or `Rejected` on the first failure. Nothing is remembered between events, so
//! redelivering the same payload classifies it again and, when drifted, sends
//! a second alert.
use crate::catalog::TagCatalog;
use crate::detect::{DetectError, DriftResult, detect};
use crate::event::EventEnvelope;
use crate::notify::{DeliveryError, DriftAlert, Notifier};
use crate::validate::{ValidationError, validate};
use std::sync::Arc;
use thiserror::Error;
use tracing::Instrument;

/// Immutable per-deployment settings for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Zone tag category, by name or id.
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub event_id: String,
    pub result: DriftResult,
    /// Set when a drift alert was delivered.
    pub alert: Option<DriftAlert>,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{source} (eventID: {event_id})")]
    Catalog {
        event_id: String,
        source: DetectError,
    },
    #[error("{source} (eventID: {event_id})")]
    Delivery {
        event_id: String,
        source: DeliveryError,
    },
}

impl PipelineError {
    pub fn event_id(&self) -> &str {
        match self {
            PipelineError::Validation(err) => err.event_id(),
            PipelineError::Catalog { event_id, .. } | PipelineError::Delivery { event_id, .. } => {
                event_id
            }
        }
    }

    /// Validation failures are the sender's fault; everything else is ours.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::Validation(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "invalid_event",
            PipelineError::Catalog { .. } => "catalog_unavailable",
            PipelineError::Delivery { .. } => "delivery_failed",
        }
    }
}

#[derive(Clone)]
pub struct DriftPipeline {
    config: PipelineConfig,
    catalog: Arc<dyn TagCatalog>,
    notifier: Arc<dyn Notifier>,
}

impl DriftPipeline {
    pub fn new(
        config: PipelineConfig,
        catalog: Arc<dyn TagCatalog>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            catalog,
            notifier,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn catalog_backend(&self) -> &'static str {
        self.catalog.backend_name()
    }

    /// Run one envelope through validation, detection and notification.
    ///
    /// # What it does
    /// Validates the envelope, classifies it with [`detect`], and delivers one
    /// alert through the notifier when the VM drifted. Records
    /// `tagdrift_events_total{outcome}` for every call.
    ///
    /// # Why it exists
    /// Gives the HTTP layer one call per request, with a single error type it
    /// can map to a status code.
    ///
    /// # Errors
    /// - [`PipelineError::Validation`] before any catalog call is made.
    /// - [`PipelineError::Catalog`] when a tag lookup fails; nothing is sent.
    /// - [`PipelineError::Delivery`] when the notifier rejects the alert.
    pub async fn process(&self, envelope: &EventEnvelope) -> Result<PipelineOutcome, PipelineError> {
        let span = tracing::info_span!("drift.event", event_id = %envelope.id);
        let result = self.process_inner(envelope).instrument(span).await;
        let outcome = match &result {
            Ok(outcome) => outcome.result.outcome(),
            Err(err) => err.kind(),
        };
        metrics::counter!("tagdrift_events_total", "outcome" => outcome).increment(1);
        result
    }

    async fn process_inner(
        &self,
        envelope: &EventEnvelope,
    ) -> Result<PipelineOutcome, PipelineError> {
        tracing::debug!(event = ?envelope, "received event");

        let event = validate(envelope).map_err(|err| {
            tracing::error!(field = err.field(), error = %err, "invalid event");
            PipelineError::from(err)
        })?;

        let result = detect(&event, &self.config.category, self.catalog.as_ref())
            .await
            .map_err(|source| {
                tracing::error!(
                    lookup = source.lookup(),
                    category = %self.config.category,
                    error = %source,
                    "tag catalog lookup failed"
                );
                PipelineError::Catalog {
                    event_id: event.id.clone(),
                    source,
                }
            })?;

        let DriftResult::Drifted(drift) = &result else {
            return Ok(PipelineOutcome {
                event_id: event.id,
                result,
                alert: None,
            });
        };

        let alert = DriftAlert::new(&event, drift);
        let delivery = self.notifier.notify(&alert).await;
        let delivered = if delivery.is_ok() { "ok" } else { "error" };
        metrics::counter!("tagdrift_notifications_total", "result" => delivered).increment(1);
        if let Err(source) = delivery {
            tracing::error!(error = %source, vm = %alert.vm, "could not send drift notification");
            return Err(PipelineError::Delivery {
                event_id: event.id,
                source,
            });
        }

        Ok(PipelineOutcome {
            event_id: event.id,
            result,
            alert: Some(alert),
        })
    }
}
