//! Bucketdex REST API
//!
//! HTTP API layer, built with Axum.
//!
//! # Endpoints
//!
//! ## Databases and tables
//! - `GET /api/v1/databases` - List databases
//! - `POST /api/v1/databases` - Create a database
//! - `DELETE /api/v1/databases/:db` - Drop a database
//! - `GET /api/v1/databases/:db/tables` - List tables
//! - `POST /api/v1/databases/:db/tables` - Create a table
//! - `DELETE /api/v1/databases/:db/tables/:table` - Drop a table
//!
//! ## Documents
//! - `POST /api/v1/databases/:db/tables/:table/documents` - Insert
//! - `GET /api/v1/databases/:db/tables/:table/documents/:id` - Fetch
//! - `PUT /api/v1/databases/:db/tables/:table/documents/:id` - Replace
//! - `DELETE /api/v1/databases/:db/tables/:table/documents/:id` - Delete
//!
//! ## Indexes
//! - `GET /api/v1/databases/:db/tables/:table/indexes` - List indexes
//! - `POST /api/v1/databases/:db/tables/:table/indexes` - Create and build
//! - `GET /api/v1/databases/:db/tables/:table/indexes/:name` - Get an index
//! - `DELETE /api/v1/databases/:db/tables/:table/indexes/:name` - Drop
//! - `POST /api/v1/databases/:db/tables/:table/indexes/:name/find` - Lookup
//!
//! ## Index builds
//! - `GET /api/v1/index-builds` - List build progress
//! - `GET /api/v1/index-builds/:id` - One build's progress
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! # Example
//!
//! ```rust,ignore
//! use bucketdex::api::{serve, ApiConfig, AppState};
//! use bucketdex::config::Config;
//! use bucketdex::service::IndexService;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let service = Arc::new(IndexService::from_config(&config).await?);
//!     let api_config = ApiConfig::from(&config.api);
//!
//!     serve(AppState::new(service, api_config.clone()), &api_config).await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{ApiConfig, AppState};

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Databases and tables
        .route(
            "/databases",
            get(routes::databases::list_databases).post(routes::databases::create_database),
        )
        .route(
            "/databases/:db",
            axum::routing::delete(routes::databases::delete_database),
        )
        .route(
            "/databases/:db/tables",
            get(routes::databases::list_tables).post(routes::databases::create_table),
        )
        .route(
            "/databases/:db/tables/:table",
            axum::routing::delete(routes::databases::delete_table),
        )
        // Documents
        .route(
            "/databases/:db/tables/:table/documents",
            post(routes::documents::create_document),
        )
        .route(
            "/databases/:db/tables/:table/documents/:id",
            get(routes::documents::get_document)
                .put(routes::documents::update_document)
                .delete(routes::documents::delete_document),
        )
        // Indexes
        .route(
            "/databases/:db/tables/:table/indexes",
            get(routes::indexes::list_indexes).post(routes::indexes::create_index),
        )
        .route(
            "/databases/:db/tables/:table/indexes/:name",
            get(routes::indexes::get_index).delete(routes::indexes::delete_index),
        )
        .route(
            "/databases/:db/tables/:table/indexes/:name/find",
            post(routes::indexes::find_documents),
        )
        // Build progress
        .route("/index-builds", get(routes::status::list_builds))
        .route("/index-builds/:id", get(routes::status::get_build));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let cors = cors_layer(&state.config.cors_origins);
    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Start the API server
///
/// Running index builds are stopped once the listener has drained.
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let service = Arc::clone(&state.service);
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Bucketdex API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    service.shutdown().await;
    tracing::info!("Bucketdex API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
