use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::Error;
use crate::llm::prompt::{sanitize_for_prompt, truncate_to_char_boundary};
use crate::models::{ChatMessage, ChatRequest, ChatResponse};
use crate::state::AppState;

/// POST /api/chat - One retrieval-augmented, guardrailed chat turn.
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("chat", %request_id, turns = req.messages.len());

    let messages = sanitize_messages(req.messages, state.config.chat.max_message_len);

    state
        .orchestrator
        .generate_chat_response(messages)
        .instrument(span)
        .await
        .map(Json)
        .map_err(|e| match e {
            Error::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        })
}

fn sanitize_messages(messages: Vec<ChatMessage>, max_len: usize) -> Vec<ChatMessage> {
    messages
        .into_iter()
        .map(|m| ChatMessage {
            role: m.role.trim().to_lowercase(),
            content: sanitize_for_prompt(&truncate_to_char_boundary(&m.content, max_len)),
        })
        .collect()
}
