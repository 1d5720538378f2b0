//! Per-turn chat pipeline: duplicate guard, query rewrite, retrieval,
//! context gating, answer generation, repeated-answer guard.

pub mod gated;

use std::sync::Arc;

use crate::config::{ChatConfig, RetrievalConfig};
use crate::error::Result;
use crate::llm::prompt::build_answer_prompt;
use crate::llm::query_rewrite::{build_rewrite_prompt, clean_rewritten_query};
use crate::metrics::Metrics;
use crate::models::{ChatMessage, ChatResponse, Conversation};
use crate::search::retriever::Retriever;

pub use gated::{Gated, GatedGenerator};

pub const DUPLICATE_QUESTION_REPLY: &str =
    "It looks like you sent the same message twice. Could you clarify or add more detail \
     (location, budget, number of bedrooms) so I can help further?";

pub const REPEATED_ANSWER_REPLY: &str =
    "I already provided that information above. Would you like me to clarify or expand on it?";

pub const GENERATION_FAILED_REPLY: &str = "Sorry, I encountered an error. Please try again.";

pub struct ChatOrchestrator {
    gated: GatedGenerator,
    retriever: Retriever,
    metrics: Arc<Metrics>,
    chat: ChatConfig,
}

impl ChatOrchestrator {
    pub fn new(
        gated: GatedGenerator,
        retriever: Retriever,
        metrics: Arc<Metrics>,
        chat: ChatConfig,
    ) -> Self {
        Self {
            gated,
            retriever,
            metrics,
            chat,
        }
    }

    fn retrieval(&self) -> &RetrievalConfig {
        self.retriever.config()
    }

    /// Produce the assistant reply for a conversation ending in a user turn.
    ///
    /// Only a malformed conversation is an error; every upstream failure has
    /// a fallback reply.
    pub async fn generate_chat_response(&self, messages: Vec<ChatMessage>) -> Result<ChatResponse> {
        let conversation = Conversation::new(messages)?;
        self.metrics.record_chat_request();

        if let Some((latest, previous)) = conversation.last_two_user_messages() {
            if latest == previous {
                tracing::info!("Duplicate user message; asking for clarification");
                return Ok(ChatResponse::text(DUPLICATE_QUESTION_REPLY));
            }
        }

        let last_user = conversation.last_user_message();
        let transcript = conversation.transcript(self.chat.history_window);

        let query = match self
            .gated
            .call(&build_rewrite_prompt(&transcript, last_user))
            .await
        {
            Ok(blocked @ Gated::Blocked(_)) => return Ok(blocked.into_response()),
            Ok(Gated::Allowed(raw)) => clean_rewritten_query(&raw).unwrap_or_else(|| {
                tracing::warn!("Empty query rewrite, using original message");
                last_user.to_string()
            }),
            Err(e) => {
                tracing::warn!("Query rewrite failed: {e}, using original message");
                last_user.to_string()
            }
        };
        tracing::info!("Search query: {query:?}");

        let retrieval = self.retrieval();
        let results = self
            .retriever
            .retrieve(&query, retrieval.n_results, retrieval.top_k)
            .await;
        let mean = results.mean_score();
        let context = if mean > retrieval.context_threshold {
            Some(results.documents.as_slice())
        } else {
            tracing::info!(
                "Mean retrieval score {mean:.3} <= {:.3}; answering without listing context",
                retrieval.context_threshold
            );
            None
        };

        let prompt = build_answer_prompt(&transcript, context, last_user);
        let generated = match self.gated.call(&prompt).await {
            Ok(Gated::Allowed(text)) => text,
            Ok(blocked @ Gated::Blocked(_)) => return Ok(blocked.into_response()),
            Err(e) => {
                tracing::error!("Chat generation failed: {e}");
                return Ok(ChatResponse::text(GENERATION_FAILED_REPLY));
            }
        };

        if let Some(previous) = conversation.last_assistant_message() {
            if is_repeat(previous, &generated) {
                tracing::info!("Generated answer repeats the previous reply");
                return Ok(ChatResponse::text(REPEATED_ANSWER_REPLY));
            }
        }

        Ok(ChatResponse::text(generated))
    }
}

fn is_repeat(previous: &str, generated: &str) -> bool {
    previous.trim().to_lowercase() == generated.trim().to_lowercase()
}
