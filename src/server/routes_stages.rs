//! Construction stage API: list, read, create, patch, soft delete.

use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;
use tracing::error;

use super::AppState;
use crate::service::StageError;
use crate::stage::StagePayload;
use crate::store::StageStore;

/// Map a service failure onto a status code and `{"error": ...}` body.
fn error_response<S>(state: &AppState<S>, err: StageError) -> Response {
    match err {
        StageError::Validation(e) => {
            state.metrics.record_rejection(e.field.as_str());
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": e.message, "field": e.field.as_str()})),
            )
                .into_response()
        }
        StageError::NotFound(id) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "Construction stage not found", "id": id})),
        )
            .into_response(),
        other => {
            error!(error = %other, "construction stage request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": other.to_string()})),
            )
                .into_response()
        }
    }
}

/// GET /constructionStages
pub(super) async fn handler_stages_list<S: StageStore>(
    State(state): State<Arc<AppState<S>>>,
) -> impl IntoResponse {
    match state.service.list_all().await {
        Ok(stages) => Json(stages).into_response(),
        Err(e) => error_response::<S>(&state, e),
    }
}

/// GET /constructionStages/{id}
pub(super) async fn handler_stage_get<S: StageStore>(
    State(state): State<Arc<AppState<S>>>,
    AxumPath(id): AxumPath<i64>,
) -> impl IntoResponse {
    match state.service.get_by_id(id).await {
        Ok(stage) => Json(stage).into_response(),
        Err(e) => error_response::<S>(&state, e),
    }
}

/// POST /constructionStages: validate, derive duration, insert.
pub(super) async fn handler_stages_create<S: StageStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(payload): Json<StagePayload>,
) -> impl IntoResponse {
    match state.service.create(payload).await {
        Ok(stage) => {
            state.metrics.record_write("create");
            (StatusCode::CREATED, Json(stage)).into_response()
        }
        Err(e) => error_response::<S>(&state, e),
    }
}

/// PATCH /constructionStages/{id}: validate present fields, recalculate, update.
pub(super) async fn handler_stage_patch<S: StageStore>(
    State(state): State<Arc<AppState<S>>>,
    AxumPath(id): AxumPath<i64>,
    Json(payload): Json<StagePayload>,
) -> impl IntoResponse {
    match state.service.patch(id, payload).await {
        Ok(stage) => {
            state.metrics.record_write("patch");
            Json(stage).into_response()
        }
        Err(e) => error_response::<S>(&state, e),
    }
}

/// DELETE /constructionStages/{id}: status becomes DELETED, nothing else changes.
pub(super) async fn handler_stage_delete<S: StageStore>(
    State(state): State<Arc<AppState<S>>>,
    AxumPath(id): AxumPath<i64>,
) -> impl IntoResponse {
    match state.service.delete(id).await {
        Ok(stage) => {
            state.metrics.record_write("delete");
            Json(stage).into_response()
        }
        Err(e) => error_response::<S>(&state, e),
    }
}
