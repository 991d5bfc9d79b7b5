//! Type definitions for the RAG chat pipeline

use serde::{Deserialize, Serialize};

/// Role of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Model => "model",
        }
    }
}

/// One message within a session's conversation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
}

impl Turn {
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn model<S: Into<String>>(content: S) -> Self {
        Self {
            role: TurnRole::Model,
            content: content.into(),
        }
    }
}

/// A passage returned by the hosted vector index
///
/// Ephemeral: produced by a search, consumed while assembling the prompt
/// for the same request, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedPassage {
    /// Original chunk text
    pub text: String,
    /// Source metadata (document name, page), if the index recorded any
    pub source: Option<String>,
    /// Similarity score reported by the index
    pub score: f32,
}

/// Successful outcome of one orchestrated exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatOutcome {
    /// The generated answer (or the canned not-found text)
    pub answer: String,
    /// The standalone query actually used for retrieval
    pub transformed_query: String,
}

/// Error types for the RAG pipeline
#[derive(Debug, thiserror::Error)]
pub enum RagError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector search error: {0}")]
    Search(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Core error: {0}")]
    Core(Box<pbichat_core::PbichatError>),
}

impl From<pbichat_core::PbichatError> for RagError {
    fn from(err: pbichat_core::PbichatError) -> Self {
        RagError::Core(Box::new(err))
    }
}

pub type RagResult<T> = Result<T, RagError>;
