//! Visage server library logic.

pub mod api;
pub mod background;
pub mod config;
pub mod middleware;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use middleware::RateLimiter;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use visage_voice::{ReplyService, SpeechService};

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Language-model client producing styled replies.
    pub reply: Arc<ReplyService>,
    /// Speech-synthesis client producing audio and viseme timelines.
    pub speech: Arc<SpeechService>,
    /// Rate limiter state.
    pub rate_limiter: RateLimiter,
    /// Chat requests admitted per client address per window.
    pub chat_limit: u32,
    /// Directory where audio artifacts wait for delivery.
    pub audio_dir: PathBuf,
}

/// Maximum request body size (64 KiB). Chat messages are short; anything
/// larger is rejected before JSON parsing.
const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(api::chat_handler))
        .route("/api/audio/{filename}", get(api::audio_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(axum::middleware::from_fn(middleware::rate_limit_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
