//! Router assembly

use crate::handlers;
use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::post,
    Router,
};
use skirmish_orchestrator::Coordinator;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
}

impl AppState {
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        Self { coordinator }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/admin/start", post(handlers::admin_start))
        .route("/admin/stop", post(handlers::admin_stop))
        .route("/run", post(handlers::run))
        .route("/stopRun", post(handlers::stop_run))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
}
