//! Fake collaborators shared by the integration tests.
#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use kucak_rag::{
    ChatModel, EmbeddingProvider, Filter, GenerationRequest, Match, Namespace, RagError, Result,
    Vector, VectorIndex,
};

pub const DIM: usize = 4;

/// Returns the same embedding for every input.
pub struct FixedEmbedder {
    pub embedding: Vec<f32>,
    pub fail: bool,
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl FixedEmbedder {
    pub fn new() -> Self {
        Self {
            embedding: vec![1.0, 0.0, 0.0, 0.0],
            fail: false,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::new() }
    }

    pub fn stalled(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::new() }
    }
}

#[async_trait]
impl EmbeddingProvider for FixedEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(RagError::Embedding {
                provider: "fake".into(),
                message: "provider unreachable".into(),
            });
        }
        Ok(self.embedding.clone())
    }

    fn dimensions(&self) -> usize {
        DIM
    }

    fn name(&self) -> &str {
        "fake-embedder"
    }
}

/// Returns scripted matches and records every query it receives.
#[derive(Default)]
pub struct ScriptedIndex {
    pub matches: Vec<Match>,
    pub fail: bool,
    pub delay: Option<Duration>,
    pub queries: Mutex<Vec<(Namespace, usize, Option<Filter>)>>,
}

impl ScriptedIndex {
    pub fn returning(matches: Vec<Match>) -> Self {
        Self { matches, ..Self::default() }
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn stalled(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::default() }
    }

    pub fn recorded(&self) -> Vec<(Namespace, usize, Option<Filter>)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorIndex for ScriptedIndex {
    async fn upsert(&self, _namespace: &Namespace, vectors: &[Vector]) -> Result<usize> {
        Ok(vectors.len())
    }

    async fn query(
        &self,
        namespace: &Namespace,
        _vector: &[f32],
        top_k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<Match>> {
        self.queries.lock().unwrap().push((namespace.clone(), top_k, filter.cloned()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(RagError::Index {
                backend: "scripted".into(),
                message: "connection refused".into(),
            });
        }
        Ok(self.matches.iter().take(top_k).cloned().collect())
    }

    async fn delete(&self, _namespace: &Namespace, _ids: &[&str]) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &str {
        "scripted"
    }
}

/// Returns a fixed completion and records every request.
pub struct RecordingModel {
    pub reply: String,
    pub fail: bool,
    pub delay: Option<Duration>,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl RecordingModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            fail: false,
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn stalled(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::replying("late") }
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::replying("") }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ChatModel for RecordingModel {
    fn name(&self) -> &str {
        "recording-model"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(RagError::Generation {
                provider: "recording-model".into(),
                message: "quota exceeded".into(),
            });
        }
        Ok(self.reply.clone())
    }
}
