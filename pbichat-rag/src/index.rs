//! Hosted vector index client
//!
//! Thin typed wrapper over the nearest-neighbor index service. The index is
//! populated ahead of time by a separate ingestion process; this client only
//! queries it.

use crate::types::{RagError, RagResult, RetrievedPassage};
use async_trait::async_trait;
use pbichat_core::IndexConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Nearest-neighbor lookup seam used by the pipeline
#[async_trait]
pub trait PassageIndex: Send + Sync {
    /// Return up to `top_k` passages ordered by decreasing similarity
    async fn query(&self, vector: &[f32], top_k: usize) -> RagResult<Vec<RetrievedPassage>>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<IndexMatch>,
}

#[derive(Debug, Deserialize)]
struct IndexMatch {
    #[serde(default)]
    score: f32,
    metadata: Option<MatchMetadata>,
}

#[derive(Debug, Deserialize)]
struct MatchMetadata {
    text: Option<String>,
    source: Option<String>,
}

/// HTTP client for the hosted vector index
pub struct HttpVectorIndex {
    http: reqwest::Client,
    config: IndexConfig,
}

impl HttpVectorIndex {
    pub fn new(config: IndexConfig) -> RagResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::Search(format!("Failed to build HTTP client: {}", e)))?;

        info!("Created vector index client for {}", config.endpoint);

        Ok(Self { http, config })
    }
}

#[async_trait]
impl PassageIndex for HttpVectorIndex {
    async fn query(&self, vector: &[f32], top_k: usize) -> RagResult<Vec<RetrievedPassage>> {
        let body = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            namespace: self.config.namespace.as_deref(),
        };

        let mut request = self.http.post(&self.config.endpoint).json(&body);
        if let Some(api_key) = &self.config.api_key {
            request = request.header("Api-Key", api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RagError::Search(format!("Index query failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(RagError::Search(format!(
                "Index query returned status {}",
                response.status()
            )));
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| RagError::Search(format!("Invalid index response: {}", e)))?;

        let total = parsed.matches.len();

        // Matches without text metadata are unusable for prompting;
        // drop them instead of failing the request.
        let passages: Vec<RetrievedPassage> = parsed
            .matches
            .into_iter()
            .filter_map(|m| {
                let metadata = m.metadata?;
                let text = metadata.text?;
                Some(RetrievedPassage {
                    text,
                    source: metadata.source,
                    score: m.score,
                })
            })
            .take(top_k)
            .collect();

        if passages.len() < total {
            warn!(
                "Dropped {} index matches missing text metadata",
                total - passages.len()
            );
        }

        debug!("Index returned {} usable passages", passages.len());
        Ok(passages)
    }
}
