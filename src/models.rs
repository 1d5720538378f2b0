use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};

/// A single metadata value attached to a listing document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Text(String),
    Number(f64),
    Flag(bool),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Flag(b) => write!(f, "{b}"),
        }
    }
}

/// Ordered so that joining the values is deterministic.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// A listing document as held by the vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    /// Metadata values joined with spaces, used for metadata overlap scoring.
    pub fn metadata_text(&self) -> String {
        self.metadata
            .values()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A raw vector store match, most-similar first.
#[derive(Debug, Clone)]
pub struct StoreHit {
    pub document: Document,
    pub similarity: f32,
}

/// A candidate during reranking.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub document: Document,
    /// Position in the store's own ranking; used to keep sorting stable.
    pub store_rank: usize,
    pub semantic: f32,
    pub keyword: f32,
    pub metadata: f32,
    pub combined: f32,
}

/// Reranked, deduplicated retrieval output. The three vectors are parallel.
#[derive(Debug, Clone, Default)]
pub struct RetrievalResult {
    pub documents: Vec<String>,
    pub metadatas: Vec<Metadata>,
    pub scores: Vec<f32>,
}

impl RetrievalResult {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Mean of the combined scores, 0.0 when nothing was retrieved.
    pub fn mean_score(&self) -> f32 {
        if self.scores.is_empty() {
            return 0.0;
        }
        self.scores.iter().sum::<f32>() / self.scores.len() as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl TryFrom<&str> for Role {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        match value {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(Error::InvalidRequest(format!(
                "Unsupported message role: {other:?}"
            ))),
        }
    }
}

/// A single chat turn as it arrives on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

/// A validated conversation: non-empty and ending with a user turn.
#[derive(Debug, Clone)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new(messages: Vec<ChatMessage>) -> Result<Self> {
        if messages.is_empty() {
            return Err(Error::InvalidRequest("messages must not be empty".into()));
        }

        let turns = messages
            .into_iter()
            .map(|m| {
                Ok(Turn {
                    role: Role::try_from(m.role.as_str())?,
                    content: m.content,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if turns.last().map(|t| t.role) != Some(Role::User) {
            return Err(Error::InvalidRequest(
                "the last message must come from the user".into(),
            ));
        }

        Ok(Self { turns })
    }

    pub fn last_user_message(&self) -> &str {
        // Non-empty and user-terminated by construction.
        self.turns.last().map(|t| t.content.as_str()).unwrap_or_default()
    }

    /// The two most recent user messages, newest first.
    pub fn last_two_user_messages(&self) -> Option<(&str, &str)> {
        let mut users = self
            .turns
            .iter()
            .rev()
            .filter(|t| t.role == Role::User)
            .map(|t| t.content.as_str());
        Some((users.next()?, users.next()?))
    }

    pub fn last_assistant_message(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == Role::Assistant)
            .map(|t| t.content.as_str())
    }

    /// The last `window` turns rendered as a `role: content` transcript.
    pub fn transcript(&self, window: usize) -> String {
        let start = self.turns.len().saturating_sub(window);
        self.turns[start..]
            .iter()
            .map(|t| format!("{}: {}", t.role.as_str(), t.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Chat request body.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

/// Structured listing card. Reserved; responses currently never carry any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyCard {
    pub id: String,
    pub summary: String,
}

/// Chat response body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub properties: Vec<PropertyCard>,
}

impl ChatResponse {
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            properties: Vec::new(),
        }
    }
}

/// Document ingestion request.
#[derive(Debug, Clone, Deserialize)]
pub struct AddDocumentsRequest {
    pub documents: Vec<Document>,
}

/// Document ingestion response.
#[derive(Debug, Clone, Serialize)]
pub struct AddDocumentsResponse {
    pub added: usize,
    pub skipped: usize,
    pub total: usize,
}
