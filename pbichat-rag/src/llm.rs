//! LLM client integration using siumai
//!
//! This module provides the `ChatModel` seam used by the rewriter and the
//! answer generator, plus the siumai-backed implementation that supports
//! multiple hosted providers.

use crate::types::{RagError, RagResult, Turn, TurnRole};
use async_trait::async_trait;
use pbichat_core::LlmConfig;
use siumai::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

/// A conversational model invoked with a system instruction and turns
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one chat completion over the given history
    async fn chat(&self, system_prompt: &str, turns: &[Turn]) -> RagResult<String>;

    /// Short human-readable description for logs
    fn describe(&self) -> String;
}

/// Unified siumai-backed chat model
pub struct SiumaiChatModel {
    client: Box<dyn LlmClient>,
    config: LlmConfig,
}

impl SiumaiChatModel {
    /// Create a new chat model from provider configuration
    pub async fn new(config: LlmConfig) -> RagResult<Self> {
        let client = Self::build_client(&config).await?;

        info!(
            "Created LLM client for provider: {} with model: {}",
            config.provider, config.model
        );

        Ok(Self { client, config })
    }

    /// Build the appropriate siumai client based on configuration
    async fn build_client(config: &LlmConfig) -> RagResult<Box<dyn LlmClient>> {
        match config.provider.as_str() {
            "openai" => {
                let api_key = config
                    .api_key
                    .clone()
                    .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                    .ok_or_else(|| RagError::Config("OpenAI API key not found".to_string()))?;

                let mut builder = LlmBuilder::new()
                    .openai()
                    .api_key(&api_key)
                    .model(&config.model)
                    .temperature(config.temperature);

                if let Some(max_tokens) = config.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }

                if let Some(base_url) = &config.base_url {
                    builder = builder.base_url(base_url);
                }

                let client = builder
                    .build()
                    .await
                    .map_err(|e| RagError::Llm(format!("Failed to build OpenAI client: {}", e)))?;

                Ok(Box::new(client))
            }
            "anthropic" => {
                let api_key = config
                    .api_key
                    .clone()
                    .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
                    .ok_or_else(|| RagError::Config("Anthropic API key not found".to_string()))?;

                let mut builder = LlmBuilder::new()
                    .anthropic()
                    .api_key(&api_key)
                    .model(&config.model)
                    .temperature(config.temperature);

                if let Some(max_tokens) = config.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }

                let client = builder.build().await.map_err(|e| {
                    RagError::Llm(format!("Failed to build Anthropic client: {}", e))
                })?;

                Ok(Box::new(client))
            }
            "ollama" => {
                let base_url = config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| "http://localhost:11434".to_string());

                let mut builder = LlmBuilder::new()
                    .ollama()
                    .model(&config.model)
                    .base_url(&base_url)
                    .temperature(config.temperature);

                if let Some(max_tokens) = config.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }

                let client = builder
                    .build()
                    .await
                    .map_err(|e| RagError::Llm(format!("Failed to build Ollama client: {}", e)))?;

                Ok(Box::new(client))
            }
            provider => Err(RagError::Config(format!(
                "Unsupported LLM provider: {}",
                provider
            ))),
        }
    }

    /// Map conversation turns onto siumai chat messages
    fn build_messages(system_prompt: &str, turns: &[Turn]) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(turns.len() + 1);
        messages.push(system!(system_prompt));

        for turn in turns {
            match turn.role {
                TurnRole::User => messages.push(user!(&turn.content)),
                TurnRole::Model => messages.push(assistant!(&turn.content)),
            }
        }

        messages
    }
}

#[async_trait]
impl ChatModel for SiumaiChatModel {
    async fn chat(&self, system_prompt: &str, turns: &[Turn]) -> RagResult<String> {
        let start_time = Instant::now();

        debug!("Generating response over {} turns", turns.len());

        let messages = Self::build_messages(system_prompt, turns);

        let response = self
            .client
            .chat(messages)
            .await
            .map_err(|e| RagError::Llm(format!("LLM generation failed: {}", e)))?;

        let generation_time = start_time.elapsed();

        if let Some(content) = response.content_text() {
            debug!(
                "Generated response in {:?} ({} chars)",
                generation_time,
                content.len()
            );
            Ok(content.to_string())
        } else {
            Err(RagError::Llm("No text content in LLM response".to_string()))
        }
    }

    fn describe(&self) -> String {
        format!(
            "{}/{} (temp: {:.1})",
            self.config.provider, self.config.model, self.config.temperature
        )
    }
}
