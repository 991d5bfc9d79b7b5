//! Configuration management
//!
//! Serde-backed configuration for the chat service, loadable from a TOML
//! file with sensible defaults and environment-variable friendly gaps
//! (API keys may be left unset and resolved from the environment).

use crate::error::{ErrorContext, PbichatError, PbichatResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider type (openai, anthropic, ollama)
    pub provider: String,
    /// Model name
    pub model: String,
    /// API key (optional, can be set via environment)
    pub api_key: Option<String>,
    /// Base URL for custom providers
    pub base_url: Option<String>,
    /// Temperature for generation
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding provider (openai)
    pub provider: String,
    /// Embedding model name
    pub model: String,
    /// API key for embedding service
    pub api_key: Option<String>,
    /// Dimension of embeddings (must match the hosted index)
    pub dimension: usize,
}

/// Hosted vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Query endpoint of the hosted nearest-neighbor index
    pub endpoint: String,
    /// API key sent with index requests
    pub api_key: Option<String>,
    /// Optional namespace within the index
    pub namespace: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of top passages to retrieve
    pub top_k: usize,
}

/// Session history configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Sliding-window bound on turns kept per session
    pub max_turns: usize,
}

/// Complete service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Answer generation model
    #[serde(default = "default_generation_llm")]
    pub generation: LlmConfig,
    /// Query rewriting model (low randomness, short output)
    #[serde(default = "default_rewrite_llm")]
    pub rewrite: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    /// Bound on each external call made by the pipeline
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

fn default_generation_llm() -> LlmConfig {
    LlmConfig {
        provider: "openai".to_string(),
        model: "gpt-4o-mini".to_string(),
        api_key: None,
        base_url: None,
        temperature: 0.7,
        max_tokens: Some(2048),
    }
}

fn default_rewrite_llm() -> LlmConfig {
    LlmConfig {
        provider: "openai".to_string(),
        model: "gpt-4o-mini".to_string(),
        api_key: None,
        base_url: None,
        temperature: 0.0,
        max_tokens: Some(256),
    }
}

fn default_call_timeout_secs() -> u64 {
    30
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            api_key: None,
            dimension: 1536,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8100/query".to_string(),
            api_key: None,
            namespace: None,
            timeout_secs: 15,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 10 }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_turns: 20 }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            generation: default_generation_llm(),
            rewrite: default_rewrite_llm(),
            embedding: EmbeddingConfig::default(),
            index: IndexConfig::default(),
            retrieval: RetrievalConfig::default(),
            history: HistoryConfig::default(),
            call_timeout_secs: default_call_timeout_secs(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> PbichatResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PbichatError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: ServiceConfig = toml::from_str(&content).map_err(|e| PbichatError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> PbichatResult<()> {
        if self.embedding.dimension == 0 {
            return Err(PbichatError::Config {
                message: "Embedding dimension must be greater than 0".to_string(),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set embedding.dimension to a positive value"),
            });
        }

        if self.retrieval.top_k == 0 {
            return Err(PbichatError::Config {
                message: "Retrieval top_k must be greater than 0".to_string(),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set retrieval.top_k to a positive value"),
            });
        }

        if self.history.max_turns == 0 {
            return Err(PbichatError::Config {
                message: "History max_turns must be greater than 0".to_string(),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set history.max_turns to a positive value"),
            });
        }

        if self.index.endpoint.is_empty() {
            return Err(PbichatError::Config {
                message: "Index endpoint must not be empty".to_string(),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set index.endpoint to the hosted index query URL"),
            });
        }

        Ok(())
    }
}
