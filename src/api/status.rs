use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::feed::FeedService;

#[derive(Clone)]
pub struct StatusState {
    pub service: Arc<FeedService>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DataStatusResponse {
    /// Whether a fused snapshot has been published
    pub snapshot_loaded: bool,
    /// When the current snapshot was published (RFC 3339)
    pub last_updated: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RefreshResponse {
    pub message: String,
}

/// Report when the published snapshot was last replaced
#[utoipa::path(
    get,
    path = "/api/status",
    responses(
        (status = 200, description = "Snapshot freshness", body = DataStatusResponse)
    ),
    tag = "status"
)]
pub async fn data_status(State(state): State<StatusState>) -> Json<DataStatusResponse> {
    let last_updated = state.service.last_updated().await;

    Json(DataStatusResponse {
        snapshot_loaded: last_updated.is_some(),
        last_updated: last_updated.map(|t| t.to_rfc3339()),
    })
}

/// Start a feed refresh in the background
#[utoipa::path(
    post,
    path = "/api/refresh",
    responses(
        (status = 202, description = "Refresh started", body = RefreshResponse)
    ),
    tag = "status"
)]
pub async fn trigger_refresh(
    State(state): State<StatusState>,
) -> (StatusCode, Json<RefreshResponse>) {
    state.service.trigger_refresh();

    (
        StatusCode::ACCEPTED,
        Json(RefreshResponse {
            message: "Refresh started".to_string(),
        }),
    )
}

pub fn router(service: Arc<FeedService>) -> Router {
    let state = StatusState { service };
    Router::new()
        .route("/status", get(data_status))
        .route("/refresh", post(trigger_refresh))
        .with_state(state)
}
