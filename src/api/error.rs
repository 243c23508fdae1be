use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::feed::error::FeedError;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error description
    pub error: String,
}

/// Map a pipeline error onto an HTTP status with a JSON body. Reads before
/// the first refresh completes surface as 503 rather than 500.
pub fn feed_error(err: FeedError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match err {
        FeedError::NoDataYet => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}
