//! In-memory vector index using cosine similarity.
//!
//! [`InMemoryVectorIndex`] keeps each namespace as an insertion-ordered list
//! behind a `tokio::sync::RwLock`. It is suitable for development, tests, and
//! small knowledge bases that fit in memory.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::Namespace;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::record::{Filter, Match, Vector};

const BACKEND: &str = "InMemory";

/// An in-memory vector index using cosine similarity for search.
///
/// Re-upserting an existing ID overwrites it in place, so ties in score are
/// returned in first-insertion order.
#[derive(Debug, Default)]
pub struct InMemoryVectorIndex {
    namespaces: RwLock<HashMap<Namespace, Vec<Vector>>>,
}

impl InMemoryVectorIndex {
    /// Create a new empty in-memory index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of vectors stored in `namespace`.
    pub async fn len(&self, namespace: &Namespace) -> usize {
        self.namespaces.read().await.get(namespace).map_or(0, Vec::len)
    }

    fn err(message: String) -> RagError {
        RagError::Index { backend: BACKEND.to_string(), message }
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn rank(score: f32) -> f32 {
    if score.is_nan() { f32::NEG_INFINITY } else { score }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn upsert(&self, namespace: &Namespace, vectors: &[Vector]) -> Result<usize> {
        let mut namespaces = self.namespaces.write().await;
        let stored = namespaces.entry(namespace.clone()).or_default();

        let dimension = stored.first().or(vectors.first()).map(|v| v.values.len());
        if let Some(dimension) = dimension {
            if let Some(bad) = vectors.iter().find(|v| v.values.len() != dimension) {
                return Err(Self::err(format!(
                    "vector '{}' has dimension {} but namespace '{namespace}' uses {dimension}",
                    bad.id,
                    bad.values.len()
                )));
            }
        }

        for vector in vectors {
            match stored.iter_mut().find(|existing| existing.id == vector.id) {
                Some(existing) => *existing = vector.clone(),
                None => stored.push(vector.clone()),
            }
        }

        debug!(%namespace, count = vectors.len(), "upserted vectors in memory");
        Ok(vectors.len())
    }

    async fn query(
        &self,
        namespace: &Namespace,
        vector: &[f32],
        top_k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<Match>> {
        if top_k == 0 {
            return Err(Self::err("top_k must be greater than zero".to_string()));
        }

        let namespaces = self.namespaces.read().await;
        let Some(stored) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        if let Some(first) = stored.first() {
            if first.values.len() != vector.len() {
                return Err(Self::err(format!(
                    "query dimension {} does not match namespace '{namespace}' dimension {}",
                    vector.len(),
                    first.values.len()
                )));
            }
        }

        let mut scored: Vec<Match> = stored
            .iter()
            .filter(|v| filter.is_none_or(|f| f.matches(&v.metadata)))
            .map(|v| Match {
                id: v.id.clone(),
                score: cosine_similarity(&v.values, vector),
                metadata: v.metadata.clone(),
            })
            .collect();

        // Stable, so equal scores keep insertion order. NaN scores sink to the end.
        scored.sort_by(|a, b| rank(b.score).total_cmp(&rank(a.score)));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn delete(&self, namespace: &Namespace, ids: &[&str]) -> Result<()> {
        let mut namespaces = self.namespaces.write().await;
        if let Some(stored) = namespaces.get_mut(namespace) {
            stored.retain(|v| !ids.contains(&v.id.as_str()));
        }
        Ok(())
    }

    fn backend(&self) -> &str {
        BACKEND
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Metadata, MetadataValue, PREGNANCY_WEEK_KEY};

    fn passage(id: &str, values: Vec<f32>, week: u32) -> Vector {
        Vector::new(id, values, Metadata::passage("WHO", id).with(PREGNANCY_WEEK_KEY, week))
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn upsert_overwrites_in_place() {
        let index = InMemoryVectorIndex::new();
        let ns = Namespace::mother_health();
        let first = [passage("a", vec![1.0, 0.0], 1), passage("b", vec![1.0, 0.0], 1)];
        index.upsert(&ns, &first).await.unwrap();
        index.upsert(&ns, &[passage("a", vec![1.0, 0.0], 2)]).await.unwrap();

        assert_eq!(index.len(&ns).await, 2);
        let matches = index.query(&ns, &[1.0, 0.0], 5, None).await.unwrap();
        let ids: Vec<&str> = matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(matches[0].metadata.get(PREGNANCY_WEEK_KEY), Some(&MetadataValue::Number(2.0)));
    }

    #[tokio::test]
    async fn rejects_dimension_mismatch() {
        let index = InMemoryVectorIndex::new();
        let ns = Namespace::mother_health();
        index.upsert(&ns, &[passage("a", vec![1.0, 0.0], 1)]).await.unwrap();

        let upsert = index.upsert(&ns, &[passage("b", vec![1.0, 0.0, 0.0], 1)]).await;
        assert!(matches!(upsert, Err(RagError::Index { .. })));
        let query = index.query(&ns, &[1.0], 5, None).await;
        assert!(matches!(query, Err(RagError::Index { .. })));
    }

    #[tokio::test]
    async fn zero_top_k_is_an_error() {
        let index = InMemoryVectorIndex::new();
        let result = index.query(&Namespace::mother_health(), &[1.0], 0, None).await;
        assert!(matches!(result, Err(RagError::Index { .. })));
    }

    #[tokio::test]
    async fn nan_embedding_ranks_last_without_panicking() {
        let index = InMemoryVectorIndex::new();
        let ns = Namespace::mother_health();
        let stored = [
            passage("broken", vec![f32::NAN, 1.0], 1),
            passage("near", vec![1.0, 0.1], 1),
            passage("far", vec![0.0, 1.0], 1),
            passage("broken-too", vec![1.0, f32::NAN], 1),
            passage("exact", vec![1.0, 0.0], 1),
        ];
        index.upsert(&ns, &stored).await.unwrap();

        let matches = index.query(&ns, &[1.0, 0.0], 5, None).await.unwrap();

        let ids: Vec<&str> = matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["exact", "near", "far", "broken", "broken-too"]);
        assert!(matches[3].score.is_nan());
    }

    #[tokio::test]
    async fn unknown_namespace_is_empty() {
        let index = InMemoryVectorIndex::new();
        let matches = index.query(&Namespace::new("nope"), &[1.0], 3, None).await.unwrap();
        assert!(matches.is_empty());
    }
}
