//! Health check handler.
//!
//! # Key invariants
//! - Must stay side-effect free: no catalog or webhook calls, so a degraded
//!   vCenter does not get the pod restarted.
use crate::api::types::HealthStatus;
use axum::Json;

pub(crate) async fn healthz() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
    })
}
