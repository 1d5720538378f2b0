use anyhow::Context;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::models::{Document, StoreHit};

/// Nearest-neighbour lookup over stored listing documents.
pub trait VectorIndex: Send + Sync {
    /// Up to `limit` documents ordered by similarity to `query_embedding`, most similar first.
    fn query(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<StoreHit>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A stored vector entry
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VectorEntry {
    document: Document,
    embedding: Vec<f32>,
}

/// In-memory vector store with disk persistence and cosine similarity search.
pub struct VectorStore {
    entries: RwLock<Vec<VectorEntry>>,
    persist_path: Option<PathBuf>,
}

/// Outcome of adding a batch of documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOutcome {
    pub added: usize,
    pub skipped: usize,
}

impl VectorStore {
    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            persist_path: None,
        }
    }

    pub fn open_or_create(vector_dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(vector_dir)?;
        let persist_path = vector_dir.join("vectors.json");

        let entries: Vec<VectorEntry> = if persist_path.exists() {
            let data = std::fs::read_to_string(&persist_path)
                .context("Failed to read vector store")?;
            serde_json::from_str(&data).context("Failed to parse vector store")?
        } else {
            Vec::new()
        };

        tracing::info!(
            "Vector store loaded {} documents from {}",
            entries.len(),
            persist_path.display()
        );

        Ok(Self {
            entries: RwLock::new(entries),
            persist_path: Some(persist_path),
        })
    }

    /// Add documents. `embeddings` must be parallel with `documents`.
    /// Documents are immutable once stored: ids already present are skipped.
    pub fn add_documents(
        &self,
        documents: Vec<Document>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<AddOutcome> {
        if documents.len() != embeddings.len() {
            return Err(Error::VectorStore(format!(
                "{} documents but {} embeddings",
                documents.len(),
                embeddings.len()
            )));
        }

        let mut entries = self.entries.write();
        let before = entries.len();
        let mut seen: HashSet<String> = entries.iter().map(|e| e.document.id.clone()).collect();
        let mut outcome = AddOutcome {
            added: 0,
            skipped: 0,
        };

        for (document, embedding) in documents.into_iter().zip(embeddings) {
            if !seen.insert(document.id.clone()) {
                tracing::debug!("Skipping already stored document {}", document.id);
                outcome.skipped += 1;
                continue;
            }
            entries.push(VectorEntry {
                document,
                embedding,
            });
            outcome.added += 1;
        }

        if outcome.added > 0 {
            if let Err(e) = self.persist(&entries) {
                entries.truncate(before);
                return Err(e);
            }
        }
        Ok(outcome)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.read().iter().any(|e| e.document.id == id)
    }

    /// Atomic write via temp file + rename.
    fn persist(&self, entries: &[VectorEntry]) -> Result<()> {
        let Some(path) = &self.persist_path else {
            return Ok(());
        };
        let data =
            serde_json::to_string(entries).map_err(|e| Error::VectorStore(e.to_string()))?;
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, data)
            .and_then(|()| std::fs::rename(&tmp_path, path))
            .map_err(|e| Error::VectorStore(format!("Failed to persist vector store: {e}")))
    }
}

impl VectorIndex for VectorStore {
    fn query(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<StoreHit>> {
        let entries = self.entries.read();

        let mut scored: Vec<(f32, &VectorEntry)> = entries
            .iter()
            .map(|e| (cosine_similarity(query_embedding, &e.embedding), e))
            .collect();

        // Stable: equal scores keep insertion order
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        Ok(scored
            .into_iter()
            .map(|(similarity, e)| StoreHit {
                document: e.document.clone(),
                similarity,
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

/// Cosine similarity; 0.0 for empty, mismatched or zero-magnitude vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Metadata;

    fn doc(id: &str, text: &str) -> Document {
        Document {
            id: id.into(),
            text: text.into(),
            metadata: Metadata::new(),
        }
    }

    #[test]
    fn test_cosine_identical() {
        let v = [0.3, 0.4, 0.5];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn test_cosine_zero_vectors_is_zero() {
        let s = cosine_similarity(&[0.0, 0.0, 0.0], &[0.0, 0.0, 0.0]);
        assert_eq!(s, 0.0);
        assert!(!s.is_nan());
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_cosine_empty_and_mismatched() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_query_orders_by_similarity() {
        let store = VectorStore::in_memory();
        store
            .add_documents(
                vec![doc("a", "plot"), doc("b", "house"), doc("c", "flat")],
                vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.7, 0.7]],
            )
            .unwrap();
        let hits = store.query(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document.id, "b");
        assert_eq!(hits[1].document.id, "c");
    }

    #[test]
    fn test_query_empty_store() {
        let store = VectorStore::in_memory();
        assert!(store.query(&[1.0, 0.0], 5).unwrap().is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_duplicate_ids_are_skipped() {
        let store = VectorStore::in_memory();
        store
            .add_documents(vec![doc("a", "first")], vec![vec![1.0]])
            .unwrap();
        let outcome = store
            .add_documents(
                vec![doc("a", "second"), doc("b", "other"), doc("b", "again")],
                vec![vec![1.0], vec![1.0], vec![1.0]],
            )
            .unwrap();
        assert_eq!(outcome, AddOutcome { added: 1, skipped: 2 });
        assert_eq!(store.len(), 2);
        let hits = store.query(&[1.0], 5).unwrap();
        assert_eq!(hits[0].document.text, "first");
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let store = VectorStore::in_memory();
        let err = store.add_documents(vec![doc("a", "x")], vec![]).unwrap_err();
        assert!(matches!(err, Error::VectorStore(_)));
    }

    #[test]
    fn test_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = VectorStore::open_or_create(dir.path()).unwrap();
            store
                .add_documents(vec![doc("a", "3 bed house DHA")], vec![vec![0.1, 0.9]])
                .unwrap();
        }
        let store = VectorStore::open_or_create(dir.path()).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.contains("a"));
        assert!(!dir.path().join("vectors.json.tmp").exists());
    }

    #[test]
    fn test_failed_persist_rolls_back_batch() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open_or_create(dir.path()).unwrap();
        store
            .add_documents(vec![doc("a", "kept")], vec![vec![1.0, 0.0]])
            .unwrap();

        // A directory at the temp path makes the write fail.
        let tmp_path = dir.path().join("vectors.json.tmp");
        std::fs::create_dir(&tmp_path).unwrap();
        let err = store
            .add_documents(vec![doc("b", "lost")], vec![vec![0.0, 1.0]])
            .unwrap_err();
        assert!(matches!(err, Error::VectorStore(_)));
        assert_eq!(store.len(), 1);
        assert!(!store.contains("b"));

        std::fs::remove_dir(&tmp_path).unwrap();
        let outcome = store
            .add_documents(vec![doc("b", "lost")], vec![vec![0.0, 1.0]])
            .unwrap();
        assert_eq!(outcome, AddOutcome { added: 1, skipped: 0 });

        let reopened = VectorStore::open_or_create(dir.path()).unwrap();
        assert_eq!(reopened.len(), 2);
        assert!(reopened.contains("b"));
    }
}
