//! API error types and helpers.
//!
//! # Purpose and responsibility
//! Keeps error bodies uniform (`{code, message, event_id}`) and maps pipeline
//! failures to HTTP statuses.
//!
//! # Key invariants and assumptions
//! - Validation failures are 400; catalog and delivery failures are 500.
//! - Every message for an identified event embeds `(eventID: ...)`.
//!
//! # Security considerations
//! - Upstream error details (vCenter responses, webhook bodies) are logged by
//!   the pipeline and never echoed to the caller.
use crate::api::types::ErrorResponse;
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tagdrift_core::{DetectError, PipelineError};

/// Structured API error returned by handlers.
///
/// # What it does
/// Couples an HTTP status code with a JSON error body.
///
/// # Invariants
/// - `status` must match the semantics of `body.code`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Build a 400 Bad Request validation error.
///
/// # What it does
/// Returns an `ApiError` with code `validation_error`, echoing `event_id`
/// when the request carried one.
///
/// # Errors
/// - Does not fail.
pub fn api_validation_error(message: &str, event_id: Option<&str>) -> ApiError {
    ApiError {
        status: StatusCode::BAD_REQUEST,
        body: ErrorResponse {
            code: "validation_error".to_string(),
            message: message.to_string(),
            event_id: event_id.map(str::to_string),
        },
    }
}

/// Build a 500 Internal Server Error with a caller-chosen code.
///
/// # What it does
/// Returns an `ApiError` whose `code` names the failing dependency
/// (`catalog_unavailable`, `delivery_failed`).
///
/// # Errors
/// - Does not fail.
pub fn api_internal(code: &str, message: &str, event_id: Option<&str>) -> ApiError {
    ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
            event_id: event_id.map(str::to_string),
        },
    }
}

/// Translate a pipeline failure into its response.
///
/// # What it does
/// Maps validation failures to 400 with the validator's own message, and
/// catalog or delivery failures to 500 with a fixed message naming the lookup
/// or the delivery that failed. Every body carries the event id.
///
/// # Why it exists
/// Keeps upstream details (vCenter responses, webhook bodies) out of client
/// responses while still telling the sender which event failed and why.
///
/// # Errors
/// - Does not fail.
pub fn api_from_pipeline(err: &PipelineError) -> ApiError {
    let event_id = err.event_id();
    match err {
        PipelineError::Validation(inner) => {
            api_validation_error(&inner.to_string(), Some(event_id))
        }
        PipelineError::Catalog { source, .. } => {
            let message = match source {
                DetectError::CategoryLookup { category, .. } => {
                    format!("could not get tags for category {category:?} (eventID: {event_id})")
                }
                DetectError::VmTagLookup { vm, .. } => {
                    format!("could not get tags for vm {vm:?} (eventID: {event_id})")
                }
                DetectError::HostTagLookup { host, .. } => {
                    format!("could not retrieve tags for host {host:?} (eventID: {event_id})")
                }
            };
            api_internal(err.kind(), &message, Some(event_id))
        }
        PipelineError::Delivery { .. } => api_internal(
            err.kind(),
            &format!("could not send slack message (eventID: {event_id})"),
            Some(event_id),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagdrift_core::{CatalogError, DeliveryError, ValidationError};

    #[test]
    fn api_error_helpers_build_expected_codes() {
        let validation = api_validation_error("bad", None);
        assert_eq!(validation.status, StatusCode::BAD_REQUEST);
        assert_eq!(validation.body.code, "validation_error");
        assert!(validation.body.event_id.is_none());

        let internal = api_internal("catalog_unavailable", "oops", Some("7"));
        assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.body.code, "catalog_unavailable");
        assert_eq!(internal.body.event_id.as_deref(), Some("7"));
    }

    #[test]
    fn validation_failures_are_bad_requests() {
        let err = PipelineError::from(ValidationError::MissingVmName {
            event_id: "12".to_string(),
        });
        let api = api_from_pipeline(&err);
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert!(api.body.message.contains("(eventID: 12)"));
        assert_eq!(api.body.event_id.as_deref(), Some("12"));
    }

    #[test]
    fn catalog_failures_hide_upstream_details() {
        let err = PipelineError::Catalog {
            event_id: "12".to_string(),
            source: DetectError::HostTagLookup {
                host: "esx-02".to_string(),
                source: CatalogError::Unavailable(anyhow::anyhow!("secret upstream body")),
            },
        };
        let api = api_from_pipeline(&err);
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.body.code, "catalog_unavailable");
        assert_eq!(
            api.body.message,
            "could not retrieve tags for host \"esx-02\" (eventID: 12)"
        );
    }

    #[test]
    fn delivery_failures_are_internal() {
        let err = PipelineError::Delivery {
            event_id: "12".to_string(),
            source: DeliveryError::Status {
                status: 403,
                body: "invalid_token".to_string(),
            },
        };
        let api = api_from_pipeline(&err);
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.body.code, "delivery_failed");
        assert_eq!(api.body.message, "could not send slack message (eventID: 12)");
    }
}
