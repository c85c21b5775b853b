//! Retrieval orchestrator.
//!
//! The [`RagPipeline`] answers one question by composing an
//! [`EmbeddingProvider`], a [`VectorIndex`], and a [`ChatModel`]:
//!
//! `embed → query → build context → compose prompt → generate → extract actions`
//!
//! Each request is independent; the pipeline holds no per-request state and
//! can be shared across tasks behind an `Arc`.
//!
//! # Example
//!
//! ```rust,ignore
//! use kucak_rag::{Domain, DomainFilters, InMemoryVectorIndex, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(embedder))
//!     .vector_index(Arc::new(InMemoryVectorIndex::new()))
//!     .chat_model(Arc::new(model))
//!     .build()?;
//!
//! let answer = pipeline
//! let filters = DomainFilters::pregnancy_week(20);
//! let answer = pipeline
//!     .answer("What exercise is safe at 20 weeks?", Domain::Pregnancy, &filters)
//!     .await?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::actions::ActionRules;
use crate::config::RagConfig;
use crate::context;
use crate::domain::{Domain, DomainFilters, Namespace};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::llm::{ChatModel, GenerationRequest};
use crate::prompt::{PromptComposer, PromptMessages};
use crate::record::{Answer, Filter, Match};

/// The stages one request moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Embedding,
    Retrieving,
    ContextBuilt,
    Prompting,
    Generating,
    ActionExtraction,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Embedding => "embedding",
            Self::Retrieving => "retrieving",
            Self::ContextBuilt => "context_built",
            Self::Prompting => "prompting",
            Self::Generating => "generating",
            Self::ActionExtraction => "action_extraction",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Await `fut`, mapping an elapsed deadline to `on_timeout`.
async fn bounded<T, F, E>(deadline: Duration, fut: F, on_timeout: E) -> Result<T>
where
    F: Future<Output = Result<T>>,
    E: FnOnce() -> RagError,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout()),
    }
}

/// The retrieval-and-grounding pipeline.
///
/// Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_index: Arc<dyn VectorIndex>,
    chat_model: Arc<dyn ChatModel>,
    composer: PromptComposer,
    action_rules: ActionRules,
    namespaces: HashMap<Domain, Namespace>,
}

impl fmt::Debug for RagPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RagPipeline")
            .field("config", &self.config)
            .field("embedding_provider", &self.embedding_provider.name())
            .field("vector_index", &self.vector_index.backend())
            .field("chat_model", &self.chat_model.name())
            .field("namespaces", &self.namespaces)
            .finish()
    }
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the action rule table.
    pub fn action_rules(&self) -> &ActionRules {
        &self.action_rules
    }

    /// The namespace queried for `domain`.
    pub fn namespace_for(&self, domain: Domain) -> Namespace {
        self.namespaces.get(&domain).cloned().unwrap_or_else(|| domain.default_namespace())
    }

    /// Answer `question` using passages from the namespace of `domain`.
    ///
    /// Either every stage succeeds and an [`Answer`] is returned, or exactly
    /// one error identifying the failed stage is returned.
    ///
    /// # Errors
    ///
    /// - [`RagError::Embedding`] if the question cannot be embedded
    /// - [`RagError::Retrieval`] if the index query fails or times out
    /// - [`RagError::DataIntegrity`] if a match has no passage text
    /// - [`RagError::Generation`] if the model fails, times out, or returns nothing
    pub async fn answer(
        &self,
        question: &str,
        domain: Domain,
        filters: &DomainFilters,
    ) -> Result<Answer> {
        let namespace = self.namespace_for(domain);
        info!(%domain, %namespace, ?filters, "answering question");

        let result = self.run(question, domain, filters, &namespace).await;
        match &result {
            Ok(answer) => info!(
                stage = %Stage::Done,
                references = answer.references().len(),
                actions = answer.suggested_actions().len(),
                "answer ready"
            ),
            Err(e) => {
                let stage = e.stage().map(|s| s.to_string()).unwrap_or_default();
                error!(%stage, error = %e, "answer failed");
            }
        }
        result
    }

    async fn run(
        &self,
        question: &str,
        domain: Domain,
        filters: &DomainFilters,
        namespace: &Namespace,
    ) -> Result<Answer> {
        debug!(stage = %Stage::Embedding, "embedding question");
        let embedding = self.embed(question).await?;

        debug!(stage = %Stage::Retrieving, dims = embedding.len(), "querying index");
        let matches = self.retrieve(namespace, &embedding, filters.to_filter(domain)).await?;

        let context = context::build_context(&matches)?;
        debug!(stage = %Stage::ContextBuilt, matches = matches.len(), "context built");

        let prompt = self.composer.compose(question, &context, domain, filters);
        debug!(stage = %Stage::Prompting, "prompt composed");

        debug!(stage = %Stage::Generating, model = self.chat_model.name(), "generating answer");
        let text = self.generate(prompt).await?;

        let suggested_actions = self.action_rules.extract(&text);
        let actions = suggested_actions.len();
        debug!(stage = %Stage::ActionExtraction, actions, "actions extracted");

        Ok(Answer::new(text, context::references(&matches), suggested_actions))
    }

    async fn embed(&self, question: &str) -> Result<Vec<f32>> {
        let provider = self.embedding_provider.name();
        let deadline = self.config.embedding_timeout;
        let embed = self.embedding_provider.embed(question);
        bounded(deadline, embed, || RagError::Embedding {
            provider: provider.to_string(),
            message: format!("timed out after {deadline:?}"),
        })
        .await
        .map_err(|e| match e {
            e @ RagError::Embedding { .. } => e,
            other => {
                RagError::Embedding { provider: provider.to_string(), message: other.to_string() }
            }
        })
    }

    async fn retrieve(
        &self,
        namespace: &Namespace,
        embedding: &[f32],
        filter: Option<Filter>,
    ) -> Result<Vec<Match>> {
        let deadline = self.config.query_timeout;
        let backend = self.vector_index.backend().to_string();
        let top_k = self.config.top_k;
        let query = self.vector_index.query(namespace, embedding, top_k, filter.as_ref());
        bounded(deadline, query, || RagError::Index {
            backend,
            message: format!("query timed out after {deadline:?}"),
        })
        .await
        .map_err(|e| RagError::Retrieval { namespace: namespace.to_string(), source: Box::new(e) })
    }

    async fn generate(&self, prompt: PromptMessages) -> Result<String> {
        let provider = self.chat_model.name();
        let deadline = self.config.generation_timeout;
        let request = GenerationRequest {
            messages: prompt.into_messages(),
            temperature: self.config.temperature,
            max_output_tokens: self.config.max_output_tokens,
        };

        let text = bounded(deadline, self.chat_model.generate(request), || RagError::Generation {
            provider: provider.to_string(),
            message: format!("timed out after {deadline:?}"),
        })
        .await
        .map_err(|e| match e {
            e @ RagError::Generation { .. } => e,
            other => {
                RagError::Generation { provider: provider.to_string(), message: other.to_string() }
            }
        })?;

        if text.trim().is_empty() {
            return Err(RagError::Generation {
                provider: provider.to_string(),
                message: "empty completion".to_string(),
            });
        }
        Ok(text)
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `config`, `embedding_provider`, `vector_index` and `chat_model` are
/// required. Action rules default to [`ActionRules::default`] and namespaces
/// to [`Domain::default_namespace`].
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_index: Option<Arc<dyn VectorIndex>>,
    chat_model: Option<Arc<dyn ChatModel>>,
    action_rules: Option<ActionRules>,
    namespaces: HashMap<Domain, Namespace>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector index backend.
    pub fn vector_index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.vector_index = Some(index);
        self
    }

    /// Set the chat model used for generation.
    pub fn chat_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.chat_model = Some(model);
        self
    }

    /// Replace the default action rule table.
    pub fn action_rules(mut self, rules: ActionRules) -> Self {
        self.action_rules = Some(rules);
        self
    }

    /// Query `namespace` instead of the default one for `domain`.
    pub fn namespace(mut self, domain: Domain, namespace: Namespace) -> Self {
        self.namespaces.insert(domain, namespace);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a required field is missing or the
    /// configuration is invalid.
    pub fn build(self) -> Result<RagPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::Config("config is required".to_string()))?;
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let vector_index = self
            .vector_index
            .ok_or_else(|| RagError::Config("vector_index is required".to_string()))?;
        let chat_model =
            self.chat_model.ok_or_else(|| RagError::Config("chat_model is required".to_string()))?;

        Ok(RagPipeline {
            config,
            embedding_provider,
            vector_index,
            chat_model,
            composer: PromptComposer::new(),
            action_rules: self.action_rules.unwrap_or_default(),
            namespaces: self.namespaces,
        })
    }
}
