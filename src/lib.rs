//! # listing-assistant
//!
//! A retrieval-augmented chat assistant for real-estate listings. Each chat
//! turn is guarded by input/output policy rules around every LLM call and
//! grounded in listing documents pulled from a vector store and reranked.
//!
//! ## Architecture
//!
//! ```text
//!                  ┌──────────────────────┐
//!                  │  messages[] (user)   │
//!                  └──────────┬───────────┘
//!                             │ identical last two user turns?
//!                             │ ──yes──▶ clarification reply
//!                             ▼
//!                  ┌──────────────────────┐
//!                  │ Query rewrite (LLM)  │  policy-gated
//!                  │ fail → raw message   │
//!                  └──────────┬───────────┘
//!                             ▼
//!                  ┌──────────────────────┐
//!                  │ Embed → vector store │  n_results = 20
//!                  └──────────┬───────────┘
//!                             ▼
//!                  ┌──────────────────────┐
//!                  │ Rerank               │
//!                  │ 0.7 semantic         │
//!                  │ 0.2 keyword overlap  │
//!                  │ 0.1 metadata overlap │
//!                  │ dedupe, top_k = 7    │
//!                  └──────────┬───────────┘
//!                             │ mean score > 0.25 ?
//!                             ▼
//!                  ┌──────────────────────┐
//!                  │ Answer (LLM)         │  policy-gated
//!                  │ fail → apology       │
//!                  └──────────┬───────────┘
//!                             │ same as last assistant reply?
//!                             ▼
//!                  ┌──────────────────────┐
//!                  │ {response, []}       │
//!                  └──────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for providers, retrieval weights and chat limits
//! - [`error`] - Collaborator failure reasons
//! - [`models`] - Documents, conversations, retrieval results and wire types
//! - [`policy`] - Guardrail rules (PII, prompt injection, toxicity, hallucination markers)
//! - [`llm::embeddings`] - Embedding via Ollama or OpenAI-compatible APIs
//! - [`llm::generation`] - Completion via Ollama, OpenAI-compatible APIs or Gemini
//! - [`llm::query_rewrite`] - Standalone search query rewriting
//! - [`llm::prompt`] - Prompt assembly and sanitization
//! - [`search::vector`] - In-memory vector store with cosine similarity and disk persistence
//! - [`search::retriever`] - Reranking and deduplication over vector store hits
//! - [`chat`] - Chat orchestrator and the policy-gated generation call
//! - [`metrics`] - Counters and latency histogram in Prometheus text format
//! - [`api`] - Axum HTTP handlers for chat, document ingestion, metrics and health
//! - [`state`] - Shared application state wiring the collaborators together

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod metrics;
pub mod models;
pub mod policy;
pub mod search;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;
