use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::api::{error::feed_error, ErrorResponse};
use crate::feed::types::VehicleRecord;
use crate::feed::FeedService;

#[derive(Clone)]
pub struct VehiclesState {
    pub service: Arc<FeedService>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VehicleListResponse {
    /// Fused per-vehicle records, in upstream feed order
    pub vehicles: Vec<VehicleRecord>,
    /// When this snapshot was published (RFC 3339)
    pub last_updated: String,
}

/// Get every vehicle from the current snapshot, with delay and route shape
#[utoipa::path(
    get,
    path = "/api/vehicles",
    responses(
        (status = 200, description = "Current fused vehicle list", body = VehicleListResponse),
        (status = 503, description = "No snapshot published yet", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "vehicles"
)]
pub async fn list_vehicles(
    State(state): State<VehiclesState>,
) -> Result<Json<VehicleListResponse>, (StatusCode, Json<ErrorResponse>)> {
    let snapshot = state.service.snapshot().await.map_err(feed_error)?;

    Ok(Json(VehicleListResponse {
        vehicles: snapshot.vehicles.clone(),
        last_updated: snapshot.last_updated.to_rfc3339(),
    }))
}

pub fn router(service: Arc<FeedService>) -> Router {
    let state = VehiclesState { service };
    Router::new()
        .route("/", get(list_vehicles))
        .with_state(state)
}
