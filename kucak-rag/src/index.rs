//! Vector index trait for namespace-scoped storage and similarity search.

use async_trait::async_trait;

use crate::domain::Namespace;
use crate::error::Result;
use crate::record::{Filter, Match, Vector};

/// A storage backend for embeddings partitioned by [`Namespace`].
///
/// Every operation is namespace-scoped; a query never sees vectors from
/// another namespace. Implementations must be safe to share between
/// concurrent requests.
///
/// # Example
///
/// ```rust,ignore
/// use kucak_rag::{InMemoryVectorIndex, Namespace, VectorIndex};
///
/// let index = InMemoryVectorIndex::new();
/// let ns = Namespace::mother_health();
/// index.upsert(&ns, &vectors).await?;
/// let matches = index.query(&ns, &embedding, 5, None).await?;
/// ```
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or overwrite vectors by ID. Returns the number of vectors written.
    async fn upsert(&self, namespace: &Namespace, vectors: &[Vector]) -> Result<usize>;

    /// Return up to `top_k` vectors most similar to `vector`, ordered by
    /// descending score, restricted to those satisfying `filter` when given.
    ///
    /// Returning fewer than `top_k` matches is not an error. `top_k` must be
    /// positive.
    async fn query(
        &self,
        namespace: &Namespace,
        vector: &[f32],
        top_k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<Match>>;

    /// Delete vectors by ID. Unknown IDs are ignored.
    async fn delete(&self, namespace: &Namespace, ids: &[&str]) -> Result<()>;

    /// A short name used in logs and errors.
    fn backend(&self) -> &str {
        "vector-index"
    }
}
