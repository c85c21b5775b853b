//! The question-embedding collaborator.

use async_trait::async_trait;

use crate::error::Result;

/// Turns a question or passage into a fixed-length vector.
///
/// The same model version must map the same text to the same vector, and
/// every vector it returns has [`dimensions`](EmbeddingProvider::dimensions)
/// entries. One provider is shared by all in-flight requests.
///
/// # Example
///
/// ```rust,ignore
/// use kucak_rag::EmbeddingProvider;
///
/// let embedding = provider.embed("Is coffee safe in the first trimester?").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, one vector per input in input order.
    ///
    /// Falls back to one [`embed`](EmbeddingProvider::embed) call per text.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Length of every vector this provider returns.
    fn dimensions(&self) -> usize;

    /// A short name used in logs and errors.
    fn name(&self) -> &str {
        "embedding"
    }
}
