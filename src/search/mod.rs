pub mod retriever;
pub mod vector;

pub use retriever::Retriever;
pub use vector::{VectorIndex, VectorStore};
