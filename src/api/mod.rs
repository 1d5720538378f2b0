pub mod chat;
pub mod documents;
pub mod metrics;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat::chat))
        .route("/chat", post(chat::chat))
        .route("/api/documents", post(documents::add_documents))
        .route("/metrics", get(metrics::metrics))
        .route("/health", get(metrics::health))
        .with_state(state)
}
