use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where the persisted vector index lives
    pub data_dir: PathBuf,
    /// Server bind address
    pub bind_addr: String,
    /// Text generation provider
    pub llm: LlmConfig,
    /// Embedding provider
    pub embedding: EmbeddingConfig,
    /// Reranking weights and retrieval sizes
    pub retrieval: RetrievalConfig,
    /// Per-turn chat pipeline settings
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "ollama", "openai" or "gemini"
    pub provider: String,
    /// Base URL for the generation API
    pub base_url: String,
    /// Model used for query rewriting and answers
    pub chat_model: String,
    /// API key (only needed for cloud providers)
    pub api_key: Option<String>,
    /// Sampling temperature
    pub temperature: f32,
    /// Upper bound on a single generation call, in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "ollama" or "openai"
    pub provider: String,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

/// Combined score = semantic_weight·semantic + keyword_weight·keyword + metadata_weight·metadata,
/// where keyword and metadata overlaps are first multiplied by their scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub semantic_weight: f32,
    pub keyword_weight: f32,
    pub metadata_weight: f32,
    pub keyword_scale: f32,
    pub metadata_scale: f32,
    /// Characters compared when deduplicating candidate texts
    pub dedupe_prefix_chars: usize,
    /// Candidates fetched from the vector store per chat turn
    pub n_results: usize,
    /// Documents kept after reranking per chat turn
    pub top_k: usize,
    /// Retrieved context is used only when the mean score exceeds this
    pub context_threshold: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Messages kept as short-term memory
    pub history_window: usize,
    /// Maximum bytes kept per incoming message
    pub max_message_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            bind_addr: "127.0.0.1:8000".to_string(),
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            chat_model: "llama3.2".to_string(),
            api_key: None,
            temperature: 0.3,
            timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            model: "all-minilm".to_string(),
            api_key: None,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            semantic_weight: 0.7,
            keyword_weight: 0.2,
            metadata_weight: 0.1,
            keyword_scale: 0.2,
            metadata_scale: 0.15,
            dedupe_prefix_chars: 100,
            n_results: 20,
            top_k: 7,
            context_threshold: 0.25,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_window: 10,
            max_message_len: 2000,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, slot: &mut T) {
    if let Ok(val) = std::env::var(key) {
        if let Ok(v) = val.parse() {
            *slot = v;
        } else {
            tracing::warn!("Ignoring unparsable {key}={val}");
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("LISTING_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(addr) = std::env::var("LISTING_BIND_ADDR") {
            config.bind_addr = addr;
        }

        // Generation
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("LLM_CHAT_MODEL") {
            config.llm.chat_model = model;
        }
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            config.llm.api_key = Some(key);
        }
        env_parse("LLM_TEMPERATURE", &mut config.llm.temperature);
        env_parse("LLM_TIMEOUT_SECS", &mut config.llm.timeout_secs);

        // Embeddings
        if let Ok(provider) = std::env::var("EMBED_PROVIDER") {
            config.embedding.provider = provider;
        }
        if let Ok(url) = std::env::var("EMBED_BASE_URL") {
            config.embedding.base_url = url;
        }
        if let Ok(model) = std::env::var("EMBED_MODEL") {
            config.embedding.model = model;
        }
        if let Ok(key) = std::env::var("EMBED_API_KEY") {
            config.embedding.api_key = Some(key);
        }

        // Retrieval
        let r = &mut config.retrieval;
        env_parse("RETRIEVAL_SEMANTIC_WEIGHT", &mut r.semantic_weight);
        env_parse("RETRIEVAL_KEYWORD_WEIGHT", &mut r.keyword_weight);
        env_parse("RETRIEVAL_METADATA_WEIGHT", &mut r.metadata_weight);
        env_parse("RETRIEVAL_KEYWORD_SCALE", &mut r.keyword_scale);
        env_parse("RETRIEVAL_METADATA_SCALE", &mut r.metadata_scale);
        env_parse("RETRIEVAL_DEDUPE_PREFIX_CHARS", &mut r.dedupe_prefix_chars);
        env_parse("RETRIEVAL_N_RESULTS", &mut r.n_results);
        env_parse("RETRIEVAL_TOP_K", &mut r.top_k);
        env_parse("RETRIEVAL_CONTEXT_THRESHOLD", &mut r.context_threshold);

        // Chat
        env_parse("CHAT_HISTORY_WINDOW", &mut config.chat.history_window);
        env_parse("CHAT_MAX_MESSAGE_LEN", &mut config.chat.max_message_len);

        config
    }

    pub fn vector_dir(&self) -> PathBuf {
        self.data_dir.join("vectors")
    }
}
