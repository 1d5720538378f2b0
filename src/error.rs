use std::time::Duration;

use thiserror::Error;

/// Failure reasons for the collaborators a chat turn depends on.
///
/// Only `InvalidRequest` is ever surfaced to an HTTP client by the chat
/// endpoint; every other variant has a degraded fallback at its call site.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Vector store query failed: {0}")]
    VectorStore(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, Error>;
