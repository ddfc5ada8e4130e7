//! IPIAL exam-candidate registry.
//!
//! A JSON-document sync server plus the local-first admin client that talks
//! to it: record store, local cache, session guard and sync coordinator.

pub mod api;
pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod session;
pub mod store;
pub mod sync;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use db::Repository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = state.config.body_limit;

    // API routes
    let api_routes = Router::new()
        // Whole document
        .route("/data", get(api::get_data).post(api::replace_data))
        // Candidates
        .route(
            "/candidates",
            get(api::list_candidates).post(api::create_candidate),
        )
        .route(
            "/candidates/{id_number}",
            get(api::get_candidate)
                .put(api::update_candidate)
                .delete(api::delete_candidate),
        )
        // Logs
        .route("/logs", get(api::list_logs).post(api::append_log))
        // Maintenance
        .route("/status", get(api::get_status))
        .route("/reset", post(api::reset_data));

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
