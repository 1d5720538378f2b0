pub mod embeddings;
pub mod generation;
pub mod prompt;
pub mod query_rewrite;

pub use embeddings::{Embedder, HttpEmbedder};
pub use generation::{Generator, HttpGenerator};
