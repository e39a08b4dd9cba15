//! CloudEvent ingestion handler.
//!
//! # Purpose
//! Accepts one vSphere migration CloudEvent per request in either HTTP binding
//! mode and runs it through the drift pipeline.
//!
//! # Key invariants and assumptions
//! - Structured mode is selected by `Content-Type: application/cloudevents+json`;
//!   anything else is treated as binary mode with `ce-*` headers.
//! - Success is `200` with an empty body, whatever the classification.
//! - The handler holds no state between requests; redelivery is reprocessed.
use crate::api::error::{ApiError, api_from_pipeline, api_validation_error};
use crate::app::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use tagdrift_core::EventEnvelope;

const STRUCTURED_CONTENT_TYPE: &str = "application/cloudevents+json";

pub(crate) async fn receive_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let envelope = decode_envelope(&headers, &body)?;
    match state.pipeline.process(&envelope).await {
        Ok(outcome) => {
            tracing::info!(
                event_id = %outcome.event_id,
                outcome = outcome.result.outcome(),
                alerted = outcome.alert.is_some(),
                "event processed"
            );
            Ok(StatusCode::OK)
        }
        Err(err) => Err(api_from_pipeline(&err)),
    }
}

fn decode_envelope(headers: &HeaderMap, body: &[u8]) -> Result<EventEnvelope, ApiError> {
    if is_structured(headers) {
        return serde_json::from_slice(body).map_err(|err| {
            let id = structured_event_id(body);
            tracing::error!(
                event_id = ?id,
                error = %err,
                "could not decode structured cloudevent"
            );
            let message = match &id {
                Some(id) => format!("could not decode cloudevent (eventID: {id}): {err}"),
                None => format!("could not decode cloudevent: {err}"),
            };
            api_validation_error(&message, id.as_deref())
        });
    }

    let Some(id) = header_str(headers, "ce-id") else {
        tracing::error!("binary cloudevent without ce-id header");
        return Err(api_validation_error("missing ce-id header", None));
    };
    let data = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(body).map_err(|err| {
            tracing::error!(event_id = %id, error = %err, "could not decode event data");
            api_validation_error(
                &format!("could not decode event data as JSON (eventID: {id}): {err}"),
                Some(id),
            )
        })?
    };

    let mut envelope = EventEnvelope::new(id, data);
    envelope.source = header_str(headers, "ce-source").unwrap_or_default().to_string();
    envelope.event_type = header_str(headers, "ce-type").unwrap_or_default().to_string();
    if let Some(subject) = header_str(headers, "ce-subject") {
        envelope = envelope.with_subject(subject);
    }
    Ok(envelope)
}

// Best-effort `id` from a body that failed envelope decoding.
fn structured_event_id(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value
        .get("id")
        .and_then(|id| id.as_str())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

fn is_structured(headers: &HeaderMap) -> bool {
    header_str(headers, header::CONTENT_TYPE.as_str())
        .map(|value| {
            value
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .eq_ignore_ascii_case(STRUCTURED_CONTENT_TYPE)
        })
        .unwrap_or(false)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}
