//! tagdrift HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures tracing middleware, and defines the
//! shared state injected into handlers.
use crate::api;
use crate::observability;
use axum::Router;
use std::sync::Arc;
use tagdrift_core::DriftPipeline;
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<DriftPipeline>,
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let parent = observability::trace_context_from_headers(request.headers());
            let span = tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            );
            span.set_parent(parent);
            span
        });

    Router::new()
        .route("/", axum::routing::post(api::events::receive_event))
        .route("/healthz", axum::routing::get(api::system::healthz))
        .with_state(state)
        .layer(trace_layer)
}
