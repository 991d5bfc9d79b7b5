//! Embedding generation
//!
//! Converts a query string into a fixed-dimension vector using a hosted
//! embedding API. Dimensionality is fixed by the configured model and must
//! match the hosted index (checked at index-build time, not here).

use crate::types::{RagError, RagResult};
use async_trait::async_trait;
use pbichat_core::EmbeddingConfig;
use siumai::prelude::*;
use tracing::{debug, info};

/// Text-to-vector seam used by the pipeline
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> RagResult<Vec<f32>>;
}

/// Siumai-backed embedding client
pub struct SiumaiEmbedder {
    client: Box<dyn LlmClient>,
    config: EmbeddingConfig,
}

impl SiumaiEmbedder {
    /// Create and initialize the embedding client
    pub async fn new(config: EmbeddingConfig) -> RagResult<Self> {
        match config.provider.as_str() {
            "openai" => {
                let api_key = config
                    .api_key
                    .clone()
                    .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                    .ok_or_else(|| RagError::Config("OpenAI API key not found".to_string()))?;

                let client = LlmBuilder::new()
                    .openai()
                    .api_key(&api_key)
                    .model(&config.model)
                    .build()
                    .await
                    .map_err(|e| {
                        RagError::Embedding(format!("Failed to create OpenAI client: {}", e))
                    })?;

                info!(
                    "Initialized embedding client - Model: {}, Dimensions: {}",
                    config.model, config.dimension
                );

                Ok(Self {
                    client: Box::new(client),
                    config,
                })
            }
            provider => Err(RagError::Config(format!(
                "Unsupported embedding provider: {}",
                provider
            ))),
        }
    }

    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }
}

#[async_trait]
impl Embedder for SiumaiEmbedder {
    async fn embed(&self, text: &str) -> RagResult<Vec<f32>> {
        let embedding_client = self.client.as_embedding_capability().ok_or_else(|| {
            RagError::Config(format!(
                "Provider {} does not support embeddings",
                self.config.provider
            ))
        })?;

        let response = embedding_client
            .embed(vec![text.to_string()])
            .await
            .map_err(|e| RagError::Embedding(format!("Embedding generation failed: {}", e)))?;

        let vector = response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding("Empty embedding response".to_string()))?;

        debug!("Generated query embedding ({} dims)", vector.len());
        Ok(vector)
    }
}
