//! JSON API over the scan engine.
//!
//! Submissions return as soon as the scan is registered; clients poll the
//! status endpoint to learn how it ended.

mod error;
mod handlers;

pub use self::error::{AppError, AppResult};
use axum::Router;
use axum::extract::{FromRequestParts, Query};
use axum::routing::{get, post};
use std::sync::Arc;
use tally_config::Config;
use tally_engine::Scanner;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// State shared by every request handler.
#[derive(Clone, Debug)]
pub struct AppState {
    pub scanner: Scanner,
    pub config: Arc<Config>,
}
impl AppState {
    pub fn new(scanner: Scanner, config: Config) -> Self {
        Self { scanner, config: Arc::new(config) }
    }
}

/// Query string extractor that rejects malformed parameters with a 422.
#[derive(Debug, FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
pub struct Params<T>(pub T);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/scans", get(handlers::recent_scans))
        .route("/api/scan", post(handlers::submit_local))
        .route("/api/scan/object", post(handlers::submit_object))
        .route("/api/scan/shared", post(handlers::submit_shared))
        .route("/api/scan/{id}", get(handlers::scan_details))
        .route("/api/scan/{id}/status", get(handlers::scan_status))
        .route("/api/scan/{id}/stop", post(handlers::stop_local))
        .route("/api/scan/object/{id}/stop", post(handlers::stop_object))
        .route("/api/scan/shared/{id}/stop", post(handlers::stop_shared))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
