pub mod api;
mod config;
mod feed;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use config::Config;
use feed::FeedService;

#[derive(OpenApi)]
#[openapi(
    info(title = "Poznań Live API", version = "0.2.0"),
    paths(
        api::health::health_check,
        api::vehicles::list_vehicles,
        api::status::data_status,
        api::status::trigger_refresh,
    ),
    components(schemas(
        api::ErrorResponse,
        api::health::HealthResponse,
        api::vehicles::VehicleListResponse,
        api::status::DataStatusResponse,
        api::status::RefreshResponse,
        feed::types::VehicleRecord,
        feed::types::Position,
        feed::types::ShapePoint,
    )),
    tags(
        (name = "health", description = "Service health check"),
        (name = "vehicles", description = "Live fused vehicle positions"),
        (name = "status", description = "Snapshot freshness and manual refresh")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .init();

    // Load config
    let config = Config::load("config.yaml").expect("Failed to load config");
    tracing::info!(cache_dir = %config.feeds.cache_dir, "Loaded configuration");

    // Build CORS layer based on config
    let cors_layer = if config.cors_permissive {
        tracing::warn!("CORS: Permissive mode explicitly enabled (all origins allowed) - DO NOT USE IN PRODUCTION");
        CorsLayer::permissive()
    } else if !config.cors_origins.is_empty() {
        tracing::info!(origins = ?config.cors_origins, "CORS: Restricting to configured origins");
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    } else {
        panic!("CORS configuration error: Either set 'cors_origins' with allowed origins, or set 'cors_permissive: true' for development");
    };

    let bind_addr = config.bind_addr.clone();
    let service =
        Arc::new(FeedService::new(config.feeds).expect("Failed to initialize feed service"));

    // Complete one full refresh before accepting requests, so readers never
    // see an empty store after startup.
    service
        .initialize()
        .await
        .expect("Initial feed refresh failed");

    // Build the app
    let app = Router::new()
        .route("/", get(root))
        .nest("/api", api::router(service))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind listener");

    tracing::info!("Server running on http://{bind_addr}");
    tracing::info!("Swagger UI: http://{bind_addr}/swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}

async fn root() -> &'static str {
    "Poznań Live API"
}
