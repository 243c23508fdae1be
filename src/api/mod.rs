pub mod error;
pub mod health;
pub mod status;
pub mod vehicles;

pub use error::ErrorResponse;

use axum::Router;
use std::sync::Arc;

use crate::feed::FeedService;

pub fn router(service: Arc<FeedService>) -> Router {
    Router::new()
        .nest("/health", health::router(service.clone()))
        .nest("/vehicles", vehicles::router(service.clone()))
        .merge(status::router(service))
}
