use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    health_handler, redirect_handler, shorten_handler, stats_handler, today_stats_handler,
};
use crate::state::AppState;

/// Single-segment paths served by the router itself. A short code equal to
/// one of these could never be resolved, so the minter must skip them.
pub const RESERVED_CODES: &[&str] = &["health", "shorten", "stats"];

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/shorten", post(shorten_handler))
            .route("/stats", get(stats_handler))
            .route("/stats/today", get(today_stats_handler))
            .route("/{code}", get(redirect_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}
