//! Error types for the `kucak-rag` crate.

use thiserror::Error;

use crate::pipeline::Stage;

/// Errors that can occur in retrieval and answer generation.
#[derive(Debug, Error)]
pub enum RagError {
    /// The embedding provider failed, rejected the input, or timed out.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A vector index backend failed (transport, auth, bad request, dimension mismatch).
    #[error("Vector index error ({backend}): {message}")]
    Index {
        /// The vector index backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// Retrieval from the vector index failed while answering a question.
    #[error("Retrieval failed in namespace '{namespace}': {source}")]
    Retrieval {
        /// The namespace that was being queried.
        namespace: String,
        /// The underlying index failure.
        #[source]
        source: Box<RagError>,
    },

    /// The language model failed, was rate limited, returned nothing, or timed out.
    #[error("Generation error ({provider}): {message}")]
    Generation {
        /// The model that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A retrieved match violates the metadata contract.
    #[error("Data integrity error (match '{id}'): {message}")]
    DataIntegrity {
        /// The ID of the offending match.
        id: String,
        /// A description of the violation.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RagError {
    /// The pipeline stage this error is attributed to, if it came out of
    /// [`RagPipeline::answer`](crate::RagPipeline::answer).
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Embedding { .. } => Some(Stage::Embedding),
            Self::Retrieval { .. } => Some(Stage::Retrieving),
            Self::DataIntegrity { .. } => Some(Stage::ContextBuilt),
            Self::Generation { .. } => Some(Stage::Generating),
            Self::Index { .. } | Self::Config(_) => None,
        }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn retrieval_keeps_index_cause() {
        let err = RagError::Retrieval {
            namespace: "mother_health".into(),
            source: Box::new(RagError::Index {
                backend: "pinecone".into(),
                message: "401 Unauthorized".into(),
            }),
        };

        assert_eq!(err.stage(), Some(Stage::Retrieving));
        let cause = err.source().map(ToString::to_string).unwrap_or_default();
        assert!(cause.contains("401 Unauthorized"));
        assert!(err.to_string().contains("mother_health"));
    }

    #[test]
    fn raw_index_errors_have_no_stage() {
        let err = RagError::Index { backend: "InMemory".into(), message: "boom".into() };
        assert_eq!(err.stage(), None);
    }
}
