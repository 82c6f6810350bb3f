//! Health Routes
//!
//! Health check endpoints for monitoring and Kubernetes probes.
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health/ready - Readiness probe (ready to serve traffic)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::{BucketTableHealth, HealthResponse};
use crate::api::state::AppState;
use crate::codec::FieldDataType;

/// GET /health/live
///
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// Returns 200 once every data type has a usable bucket table.
pub async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    if check_buckets(&state) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health
///
/// Full health status with component details.
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let buckets_ok = check_buckets(&state);
    let databases = state.service.list_databases().await.len();
    let active_builds = state.service.list_build_status(true).await.len();

    let status = if buckets_ok { "healthy" } else { "unhealthy" };

    let locator = state.service.locator();
    let bucket_tables = FieldDataType::all()
        .iter()
        .map(|dt| BucketTableHealth {
            data_type: dt.as_str().to_string(),
            buckets: locator.table(*dt).len(),
        })
        .collect();

    Json(HealthResponse {
        status: status.to_string(),
        buckets: (if buckets_ok { "ok" } else { "error" }).to_string(),
        databases,
        bucket_tables,
        active_builds,
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn check_buckets(state: &AppState) -> bool {
    let locator = state.service.locator();
    FieldDataType::all()
        .iter()
        .all(|dt| !locator.table(*dt).is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_liveness() {
        let status = liveness().await;
        assert_eq!(status, StatusCode::OK);
    }
}
