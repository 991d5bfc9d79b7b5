//! Application state shared across request handlers

use crate::{WebConfig, WebError, WebResult};
use pbichat_core::ServiceConfig;
use pbichat_rag::RagPipeline;
use std::sync::Arc;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Web server configuration
    pub config: WebConfig,
    /// The RAG chat pipeline
    pub pipeline: Arc<RagPipeline>,
}

impl AppState {
    /// Build state with a pipeline wired to the configured hosted services
    pub async fn new(config: WebConfig) -> WebResult<Self> {
        let service_config = match &config.config_path {
            Some(path) => {
                info!("Loading service configuration from {}", path);
                ServiceConfig::from_file(path).map_err(|e| WebError::Config(e.to_string()))?
            }
            None => ServiceConfig::default(),
        };

        let pipeline = RagPipeline::from_config(service_config)
            .await
            .map_err(|e| WebError::Pipeline(e.to_string()))?;

        Ok(Self {
            config,
            pipeline: Arc::new(pipeline),
        })
    }

    /// Build state around an existing pipeline (used by tests)
    pub fn with_pipeline(config: WebConfig, pipeline: RagPipeline) -> Self {
        Self {
            config,
            pipeline: Arc::new(pipeline),
        }
    }
}
