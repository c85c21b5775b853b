//! # kucak-rag
//!
//! Retrieval-and-grounding pipeline for the Kucak-AI maternal and infant
//! health assistant.
//!
//! A question is embedded, the nearest passages are retrieved from the
//! namespace of its [`Domain`], the passages are formatted into a grounding
//! context, and a domain-specific prompt is sent to a [`ChatModel`]. Phrases
//! in the generated answer trigger advisories from an [`ActionRules`] table.
//!
//! ## Feature flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `openai` | [`openai::OpenAIEmbeddingProvider`] and [`openai::OpenAIChatModel`] |
//! | `pinecone` | [`PineconeIndex`](pinecone::PineconeIndex) vector index |
//!
//! Both are enabled by default. [`InMemoryVectorIndex`] is always available.

pub mod actions;
pub mod config;
pub mod context;
pub mod domain;
pub mod embedding;
pub mod error;
pub mod index;
pub mod inmemory;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod record;
pub mod session;

#[cfg(feature = "openai")]
pub mod openai;
#[cfg(feature = "pinecone")]
pub mod pinecone;

pub use actions::{ActionRule, ActionRules};
pub use config::{RagConfig, RagConfigBuilder};
pub use context::{NO_CONTEXT, build_context};
pub use domain::{Domain, DomainFilters, Namespace};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use index::VectorIndex;
pub use inmemory::InMemoryVectorIndex;
pub use llm::{ChatMessage, ChatModel, GenerationRequest, Role};
pub use pipeline::{RagPipeline, RagPipelineBuilder, Stage};
pub use prompt::{PromptComposer, PromptMessages};
pub use record::{Answer, Filter, Match, Metadata, MetadataValue, Vector};
pub use session::{ChatSession, ChatType};
