//! Deterministic collaborators for unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::llm::{Embedder, Generator};
use crate::models::StoreHit;
use crate::search::vector::VectorIndex;

const VOCAB: &[&str] = &[
    "house", "flat", "plot", "dha", "gulberg", "bahria", "bed", "sale", "rent", "marla", "lawn",
];

/// Bag-of-words embedder over a small real-estate vocabulary.
pub struct KeywordEmbedder {
    calls: AtomicUsize,
    fail: bool,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn keyword_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    let tokens: Vec<&str> = lower.split_whitespace().collect();
    VOCAB
        .iter()
        .map(|w| tokens.iter().filter(|t| *t == w).count() as f32)
        .collect()
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Embedding("embedding service unavailable".into()));
        }
        Ok(texts.iter().map(|t| keyword_vector(t)).collect())
    }
}

pub struct FailingIndex;

impl VectorIndex for FailingIndex {
    fn query(&self, _query_embedding: &[f32], _limit: usize) -> Result<Vec<StoreHit>> {
        Err(Error::VectorStore("index offline".into()))
    }

    fn len(&self) -> usize {
        0
    }
}

pub enum Scripted {
    Reply(String),
    Fail,
    Hang,
}

/// Generator replaying scripted outcomes in order and recording prompts.
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Scripted>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replies(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Scripted::Reply(r.to_string())).collect())
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        let next = self.script.lock().pop_front();
        match next {
            Some(Scripted::Reply(text)) => Ok(text),
            Some(Scripted::Fail) | None => Err(Error::Generation("quota exceeded".into())),
            Some(Scripted::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(Error::Generation("unreachable".into()))
            }
        }
    }
}
