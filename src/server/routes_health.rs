//! # Health & Observability Endpoints
//!
//! | Endpoint | Purpose |
//! |----------|---------|
//! | `GET /healthz` | Liveness: process is alive |
//! | `GET /readyz` | Readiness: store reachable within 2 seconds |
//! | `GET /metrics` | Prometheus scraping endpoint |

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use std::sync::Arc;

use super::AppState;
use crate::store::StageStore;

/// Liveness probe: no dependencies checked.
pub(super) async fn handler_healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Readiness probe: 503 while the store is unreachable.
pub(super) async fn handler_readyz<S: StageStore>(
    State(state): State<Arc<AppState<S>>>,
) -> impl IntoResponse {
    let check = tokio::time::timeout(
        std::time::Duration::from_secs(2),
        state.service.store().health_check(),
    )
    .await;

    match check {
        Ok(Ok(())) => (StatusCode::OK, "ok"),
        Ok(Err(_)) => (StatusCode::SERVICE_UNAVAILABLE, "store unreachable"),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "store timeout"),
    }
}

/// Prometheus metrics in text exposition format.
pub(super) async fn handler_metrics<S: StageStore>(
    State(state): State<Arc<AppState<S>>>,
) -> impl IntoResponse {
    let body = state.metrics.encode();
    (
        StatusCode::OK,
        [(
            "content-type",
            "application/openmetrics-text; version=1.0.0; charset=utf-8",
        )],
        body,
    )
}
