//! # Server: HTTP Surface for Construction Stages
//!
//! Runs an Axum HTTP server exposing the stage operations as a small REST API
//! plus health and metrics endpoints.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | `GET` | `/constructionStages` | list all stages |
//! | `POST` | `/constructionStages` | create |
//! | `GET` | `/constructionStages/{id}` | read one |
//! | `PATCH` | `/constructionStages/{id}` | partial update |
//! | `DELETE` | `/constructionStages/{id}` | soft delete |
//! | `GET` | `/healthz`, `/readyz`, `/metrics` | probes and scraping |
//!
//! The router is generic over the [`StageStore`] so the same routes serve the
//! PostgreSQL store in production and the in-memory store in tests.

mod routes_health;
mod routes_stages;

use anyhow::Result;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, Instrument};

use crate::prom_metrics;
use crate::service::StageService;
use crate::store::StageStore;

pub struct AppState<S> {
    pub service: StageService<S>,
    pub metrics: prom_metrics::Metrics,
}

impl<S: StageStore> AppState<S> {
    pub fn new(service: StageService<S>) -> Arc<Self> {
        Arc::new(AppState {
            service,
            metrics: prom_metrics::Metrics::new(),
        })
    }
}

/// Records request latency, generates (or propagates) a request ID, and wraps
/// the request in a tracing span.
async fn metrics_middleware<S: StageStore>(
    State(state): State<Arc<AppState<S>>>,
    req: Request,
    next: Next,
) -> axum::response::Response {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let method = req.method().to_string();
    let raw_path = req.uri().path().to_string();
    let norm_path = normalize_path(&raw_path);
    let start = std::time::Instant::now();

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %raw_path,
    );
    let mut response = next.run(req).instrument(span).await;

    state
        .metrics
        .http_request_duration
        .get_or_create(&prom_metrics::HttpLabel {
            method,
            path: norm_path,
        })
        .observe(start.elapsed().as_secs_f64());

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Collapse numeric path segments into `:id` to bound label cardinality.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|seg| {
            if !seg.is_empty() && seg.chars().all(|c| c.is_ascii_digit()) {
                ":id"
            } else {
                seg
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

pub fn build_router<S: StageStore>(state: Arc<AppState<S>>) -> Router {
    Router::new()
        .route(
            "/constructionStages",
            get(routes_stages::handler_stages_list::<S>)
                .post(routes_stages::handler_stages_create::<S>),
        )
        .route(
            "/constructionStages/{id}",
            get(routes_stages::handler_stage_get::<S>)
                .patch(routes_stages::handler_stage_patch::<S>)
                .delete(routes_stages::handler_stage_delete::<S>),
        )
        .route("/healthz", get(routes_health::handler_healthz))
        .route("/readyz", get(routes_health::handler_readyz::<S>))
        .route("/metrics", get(routes_health::handler_metrics::<S>))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(CatchPanicLayer::new())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            metrics_middleware::<S>,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(1024 * 1024))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .with_state(state)
}

pub async fn run<S: StageStore>(service: StageService<S>, port: u16) -> Result<()> {
    let basis = service.duration_basis();
    let state = AppState::new(service);
    let app = build_router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!(port, ?basis, "construction stage API running");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("construction stage API shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("received SIGINT, shutting down"),
                    _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable, waiting for SIGINT");
                ctrl_c.await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("received SIGINT, shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_path_preserves_collection_routes() {
        assert_eq!(normalize_path("/constructionStages"), "/constructionStages");
        assert_eq!(normalize_path("/metrics"), "/metrics");
    }

    #[test]
    fn normalize_path_collapses_numeric_ids() {
        assert_eq!(
            normalize_path("/constructionStages/42"),
            "/constructionStages/:id"
        );
    }

    #[test]
    fn normalize_path_handles_empty_and_root() {
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "");
    }
}
