use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::feed::FeedService;

#[derive(Clone)]
pub struct HealthState {
    pub service: Arc<FeedService>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Whether the service is running
    pub healthy: bool,
    /// Whether a fused snapshot has been published
    pub snapshot_loaded: bool,
    /// Number of vehicles in the current snapshot
    pub vehicle_count: usize,
    /// Number of shapes in the loaded schedule
    pub shape_count: usize,
    /// Number of trips in the loaded schedule
    pub trip_count: usize,
    /// When the current snapshot was published (RFC 3339)
    pub last_updated: Option<String>,
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service health status", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<HealthState>) -> Json<HealthResponse> {
    let (loaded, vehicle_count, shape_count, trip_count, last_updated) =
        match state.service.snapshot().await {
            Ok(snapshot) => (
                true,
                snapshot.vehicles.len(),
                snapshot.schedule.shapes.len(),
                snapshot.schedule.trips.len(),
                Some(snapshot.last_updated.to_rfc3339()),
            ),
            Err(_) => (false, 0, 0, 0, None),
        };

    Json(HealthResponse {
        healthy: true,
        snapshot_loaded: loaded,
        vehicle_count,
        shape_count,
        trip_count,
        last_updated,
    })
}

pub fn router(service: Arc<FeedService>) -> Router {
    let state = HealthState { service };
    Router::new()
        .route("/", get(health_check))
        .with_state(state)
}
