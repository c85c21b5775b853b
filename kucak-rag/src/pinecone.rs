//! Pinecone vector index backend.
//!
//! Provides [`PineconeIndex`] which implements [`VectorIndex`] over the
//! Pinecone data-plane REST API, plus [`PineconeIndex::create_index`] for
//! creating the index with the metadata fields used for filtering.
//!
//! This module is only available when the `pinecone` feature is enabled.
//!
//! # Example
//!
//! ```rust,ignore
//! use kucak_rag::pinecone::{PineconeConfig, PineconeIndex};
//!
//! let host = "https://kucak-ai-health-abc123.svc.pinecone.io";
//! let index = PineconeIndex::new(PineconeConfig::new(api_key, host))?;
//! let matches = index.query(&Namespace::mother_health(), &embedding, 5, Some(&filter)).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, error, info, warn};

use crate::domain::Namespace;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::record::{
    BABY_AGE_WEEKS_KEY, Filter, Match, Metadata, MetadataValue, PREGNANCY_WEEK_KEY, Vector,
};

/// The Pinecone control-plane endpoint.
pub const PINECONE_CONTROL_PLANE: &str = "https://api.pinecone.io";

/// API version sent with every request.
const API_VERSION: &str = "2024-07";

/// Maximum number of vectors per upsert request.
const UPSERT_BATCH_SIZE: usize = 100;

const BACKEND: &str = "pinecone";

/// Connection settings for one Pinecone index.
#[derive(Debug, Clone, PartialEq)]
pub struct PineconeConfig {
    pub api_key: String,
    /// The index host, e.g. `https://kucak-ai-health-abc123.svc.us-east-1.pinecone.io`.
    pub host: String,
    /// Per-request timeout applied by the HTTP client.
    pub timeout: Duration,
}

impl PineconeConfig {
    pub fn new(api_key: impl Into<String>, host: impl Into<String>) -> Self {
        let host = host.into();
        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host
        } else {
            format!("https://{host}")
        };
        Self {
            api_key: api_key.into(),
            host: host.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read `PINECONE_API_KEY` and `PINECONE_INDEX_HOST`.
    pub fn from_env() -> std::result::Result<Self, String> {
        let api_key = std::env::var("PINECONE_API_KEY")
            .map_err(|_| "PINECONE_API_KEY environment variable not set".to_string())?;
        let host = std::env::var("PINECONE_INDEX_HOST")
            .map_err(|_| "PINECONE_INDEX_HOST environment variable not set".to_string())?;
        Ok(Self::new(api_key, host))
    }
}

/// Parameters for creating a Pinecone index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexSpec {
    pub name: String,
    pub dimension: usize,
    pub metric: String,
    /// Pod environment, e.g. `us-east-1-aws`.
    pub environment: String,
    pub pod_type: String,
    /// Metadata fields indexed for filtering.
    pub indexed_fields: Vec<String>,
}

impl IndexSpec {
    /// A 1536-dimension cosine index with `pregnancy_week` and `baby_age_weeks` indexed.
    pub fn health(name: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dimension: 1536,
            metric: "cosine".to_string(),
            environment: environment.into(),
            pod_type: "p1.x1".to_string(),
            indexed_fields: vec![PREGNANCY_WEEK_KEY.to_string(), BABY_AGE_WEEKS_KEY.to_string()],
        }
    }

    fn to_request(&self) -> Value {
        json!({
            "name": self.name,
            "dimension": self.dimension,
            "metric": self.metric,
            "spec": {
                "pod": {
                    "environment": self.environment,
                    "pod_type": self.pod_type,
                    "metadata_config": { "indexed": self.indexed_fields },
                }
            }
        })
    }
}

// ── Pinecone API request/response types ────────────────────────────

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<WireVector<'a>>,
    namespace: &'a str,
}

#[derive(Serialize)]
struct WireVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: &'a Metadata,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    namespace: &'a str,
    vector: &'a [f32],
    top_k: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Value>,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<WireMatch>,
}

#[derive(Deserialize)]
struct WireMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Map<String, Value>,
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    ids: &'a [&'a str],
    namespace: &'a str,
}

#[derive(Deserialize)]
struct DescribeIndexResponse {
    host: String,
}

/// Render an equality filter in Pinecone's filter language.
fn filter_to_json(filter: &Filter) -> Value {
    let mut condition = Map::new();
    condition.insert("$eq".to_string(), json!(filter.value));
    let mut root = Map::new();
    root.insert(filter.field.clone(), Value::Object(condition));
    Value::Object(root)
}

/// Convert Pinecone metadata, skipping values with no [`MetadataValue`] form.
fn metadata_from_json(id: &str, raw: Map<String, Value>) -> Metadata {
    raw.into_iter()
        .filter_map(|(key, value)| {
            let converted = match value {
                Value::String(s) => Some(MetadataValue::String(s)),
                Value::Number(n) => n.as_f64().map(MetadataValue::Number),
                Value::Bool(b) => Some(MetadataValue::Bool(b)),
                _ => None,
            };
            if converted.is_none() {
                debug!(match_id = id, key = %key, "skipping unsupported metadata value");
            }
            converted.map(|v| (key, v))
        })
        .collect()
}

/// Split `vectors` into upsert requests of at most [`UPSERT_BATCH_SIZE`] vectors.
fn upsert_requests<'a>(namespace: &'a Namespace, vectors: &'a [Vector]) -> Vec<UpsertRequest<'a>> {
    vectors
        .chunks(UPSERT_BATCH_SIZE)
        .map(|batch| UpsertRequest {
            vectors: batch
                .iter()
                .map(|v| WireVector { id: &v.id, values: &v.values, metadata: &v.metadata })
                .collect(),
            namespace: namespace.as_str(),
        })
        .collect()
}

/// Convert a query response into at most `top_k` matches, keeping server order.
fn into_matches(namespace: &Namespace, response: QueryResponse, top_k: usize) -> Vec<Match> {
    let returned = response.matches.len();
    if returned > top_k {
        warn!(%namespace, returned, top_k, "pinecone returned more than top_k matches");
    }
    response
        .matches
        .into_iter()
        .take(top_k)
        .map(|m| {
            let metadata = metadata_from_json(&m.id, m.metadata);
            Match { id: m.id, score: m.score, metadata }
        })
        .collect()
}

/// A [`VectorIndex`] backed by [Pinecone](https://www.pinecone.io/).
///
/// Namespaces map directly onto Pinecone namespaces; one pooled HTTP client
/// is shared by all requests.
pub struct PineconeIndex {
    client: reqwest::Client,
    config: PineconeConfig,
}

impl PineconeIndex {
    /// Create a client for the index at `config.host`.
    pub fn new(config: PineconeConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Self::err("API key must not be empty".into()));
        }
        let client = Self::http_client(config.timeout)?;
        Ok(Self { client, config })
    }

    /// Create the index described by `spec` if it does not exist yet and
    /// return its data-plane host.
    pub async fn create_index(api_key: &str, spec: &IndexSpec) -> Result<String> {
        let client = Self::http_client(Duration::from_secs(30))?;
        let describe_url = format!("{PINECONE_CONTROL_PLANE}/indexes/{}", spec.name);

        let response = client
            .get(&describe_url)
            .header("Api-Key", api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .send()
            .await
            .map_err(|e| Self::err(format!("describe index failed: {e}")))?;

        if response.status().is_success() {
            let described: DescribeIndexResponse = response
                .json()
                .await
                .map_err(|e| Self::err(format!("failed to parse index description: {e}")))?;
            debug!(index = %spec.name, "pinecone index already exists, skipping creation");
            return Ok(described.host);
        }
        if response.status() != reqwest::StatusCode::NOT_FOUND {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::err(format!("describe index returned {status}: {body}")));
        }

        info!(index = %spec.name, dimension = spec.dimension, "creating pinecone index");
        let created: DescribeIndexResponse = Self::send(
            client
                .post(format!("{PINECONE_CONTROL_PLANE}/indexes"))
                .header("Api-Key", api_key)
                .header("X-Pinecone-API-Version", API_VERSION)
                .json(&spec.to_request()),
        )
        .await?;
        Ok(created.host)
    }

    fn http_client(timeout: Duration) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Self::err(format!("failed to build HTTP client: {e}")))
    }

    fn err(message: String) -> RagError {
        RagError::Index { backend: BACKEND.to_string(), message }
    }

    async fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        let request = self
            .client
            .post(format!("{}{path}", self.config.host))
            .header("Api-Key", &self.config.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(body);
        Self::send(request).await
    }

    async fn send<R: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<R> {
        let response = request.send().await.map_err(|e| {
            error!(backend = BACKEND, error = %e, "request failed");
            Self::err(format!("request failed: {e}"))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(backend = BACKEND, %status, "API error");
            return Err(Self::err(format!("API returned {status}: {body}")));
        }

        response.json().await.map_err(|e| Self::err(format!("failed to parse response: {e}")))
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(&self, namespace: &Namespace, vectors: &[Vector]) -> Result<usize> {
        let mut written = 0;
        for request in upsert_requests(namespace, vectors) {
            let response: UpsertResponse = self.post("/vectors/upsert", &request).await?;
            written += response.upserted_count;
        }

        debug!(%namespace, count = written, "upserted vectors to pinecone");
        Ok(written)
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

        let request = QueryRequest {
            namespace: namespace.as_str(),
            vector,
            top_k,
            filter: filter.map(filter_to_json),
            include_metadata: true,
            include_values: false,
        };
        let response: QueryResponse = self.post("/query", &request).await?;

        let matches = into_matches(namespace, response, top_k);
        debug!(%namespace, count = matches.len(), "queried pinecone");
        Ok(matches)
    }

    async fn delete(&self, namespace: &Namespace, ids: &[&str]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let request = DeleteRequest { ids, namespace: namespace.as_str() };
        let _: Value = self.post("/vectors/delete", &request).await?;

        debug!(%namespace, count = ids.len(), "deleted vectors from pinecone");
        Ok(())
    }

    fn backend(&self) -> &str {
        BACKEND
    }
}
