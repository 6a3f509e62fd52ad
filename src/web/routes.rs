use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

use super::handlers;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .route("/start", post(handlers::start))
        .route("/stop", post(handlers::stop))
        .route("/notice/dismiss", post(handlers::dismiss_notice))
        .route("/preview", get(handlers::preview))
        .route("/snapshot", get(handlers::snapshot))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
