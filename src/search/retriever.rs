//! Vector retrieval followed by multi-signal reranking and prefix deduplication.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::llm::Embedder;
use crate::models::{RetrievalResult, ScoredCandidate, StoreHit};
use crate::search::vector::{cosine_similarity, VectorIndex};

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            config,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Retrieve up to `top_k` reranked, deduplicated documents for `query`.
    ///
    /// Never fails: embedding or store errors are logged and yield an empty result.
    pub async fn retrieve(&self, query: &str, n_results: usize, top_k: usize) -> RetrievalResult {
        let query = query.trim();
        if query.is_empty() {
            tracing::warn!("Retrieval skipped: empty query");
            return RetrievalResult::default();
        }

        let top_k = top_k.max(1);
        let n_results = if n_results < top_k {
            tracing::warn!("n_results {n_results} < top_k {top_k}; fetching {top_k}");
            top_k
        } else {
            n_results
        };

        match self.try_retrieve(query, n_results, top_k).await {
            Ok(result) => {
                tracing::info!(
                    "Retrieved {} documents (mean score {:.3}) for query {query:?}",
                    result.len(),
                    result.mean_score()
                );
                result
            }
            Err(e) => {
                tracing::warn!("Retrieval failed for query {query:?}: {e}");
                RetrievalResult::default()
            }
        }
    }

    async fn try_retrieve(
        &self,
        query: &str,
        n_results: usize,
        top_k: usize,
    ) -> Result<RetrievalResult> {
        let query_embedding = self.embedder.embed_one(query).await?;
        let hits = self.index.query(&query_embedding, n_results)?;
        let Some(best) = hits.first() else {
            return Ok(RetrievalResult::default());
        };
        tracing::debug!(
            "Vector store returned {} candidates (best similarity {:.3})",
            hits.len(),
            best.similarity
        );

        // Re-embed candidate texts so every semantic score comes from the same model.
        let texts: Vec<String> = hits.iter().map(|h| h.document.text.clone()).collect();
        let candidate_embeddings = self.embedder.embed(&texts).await?;

        let candidates = score_candidates(
            query,
            &query_embedding,
            hits,
            &candidate_embeddings,
            &self.config,
        );
        let selected = rank_and_dedupe(candidates, top_k, self.config.dedupe_prefix_chars);

        let mut result = RetrievalResult {
            documents: Vec::with_capacity(selected.len()),
            metadatas: Vec::with_capacity(selected.len()),
            scores: Vec::with_capacity(selected.len()),
        };
        for c in selected {
            result.scores.push(c.combined);
            result.documents.push(c.document.text);
            result.metadatas.push(c.document.metadata);
        }
        Ok(result)
    }
}

/// Lowercased whitespace tokens as a set.
pub fn tokenize(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Fraction of query tokens present in `text`; 0.0 for an empty query.
pub fn overlap_ratio(query_tokens: &HashSet<String>, text: &str) -> f32 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let text_tokens = tokenize(text);
    let shared = query_tokens.intersection(&text_tokens).count();
    shared as f32 / query_tokens.len() as f32
}

/// Compute component and combined scores for every store hit.
/// `candidate_embeddings` is parallel with `hits`; a missing embedding scores 0.0.
pub fn score_candidates(
    query: &str,
    query_embedding: &[f32],
    hits: Vec<StoreHit>,
    candidate_embeddings: &[Vec<f32>],
    config: &RetrievalConfig,
) -> Vec<ScoredCandidate> {
    let query_tokens = tokenize(query);

    hits.into_iter()
        .enumerate()
        .map(|(store_rank, hit)| {
            let semantic = candidate_embeddings
                .get(store_rank)
                .map_or(0.0, |e| cosine_similarity(query_embedding, e));
            let keyword = overlap_ratio(&query_tokens, &hit.document.text) * config.keyword_scale;
            let metadata = overlap_ratio(&query_tokens, &hit.document.metadata_text())
                * config.metadata_scale;
            let combined = config.semantic_weight * semantic
                + config.keyword_weight * keyword
                + config.metadata_weight * metadata;

            ScoredCandidate {
                document: hit.document,
                store_rank,
                semantic,
                keyword,
                metadata,
                combined,
            }
        })
        .collect()
}

/// Sort by combined score (ties keep store order), then keep the first
/// `top_k` candidates whose text prefixes are distinct.
pub fn rank_and_dedupe(
    mut candidates: Vec<ScoredCandidate>,
    top_k: usize,
    prefix_chars: usize,
) -> Vec<ScoredCandidate> {
    candidates.sort_by(|a, b| {
        b.combined
            .partial_cmp(&a.combined)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.store_rank.cmp(&b.store_rank))
    });

    let mut seen = HashSet::new();
    let mut selected = Vec::with_capacity(top_k);
    for candidate in candidates {
        if selected.len() >= top_k {
            break;
        }
        if seen.insert(dedupe_key(&candidate.document.text, prefix_chars)) {
            selected.push(candidate);
        }
    }
    selected
}

/// First `prefix_chars` characters of the trimmed, lowercased text.
pub fn dedupe_key(text: &str, prefix_chars: usize) -> String {
    text.trim().to_lowercase().chars().take(prefix_chars).collect()
}
