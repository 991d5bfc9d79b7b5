//! Route definitions for the chat service
//!
//! The API is deliberately flat: the chat widget talks to three
//! root-level endpoints.

use crate::{handlers, AppState};
use axum::{
    routing::{get, post},
    Router,
};

/// Create chat service routes
pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/chat", post(handlers::chat))
        .route("/clear-history", post(handlers::clear_history))
}
