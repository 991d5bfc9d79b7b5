//! Unified error handling system
//!
//! Provides structured error types with context, recovery suggestions, and proper error chaining

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

pub type PbichatResult<T> = Result<T, PbichatError>;

/// Error context providing additional information for debugging and recovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Timestamp when error occurred
    pub timestamp: DateTime<Utc>,
    /// Component where error originated
    pub component: String,
    /// Operation being performed when error occurred
    pub operation: Option<String>,
    /// Additional metadata
    pub metadata: std::collections::HashMap<String, String>,
    /// Recovery suggestions
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
            metadata: std::collections::HashMap::new(),
            recovery_suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.recovery_suggestions.push(suggestion.to_string());
        self
    }
}

/// Main error type for the pbichat system
#[derive(Error, Debug)]
pub enum PbichatError {
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
        context: ErrorContext,
    },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Operation timeout: {operation}")]
    Timeout {
        operation: String,
        duration_ms: u64,
        context: ErrorContext,
    },

    #[error("LLM error: {message}")]
    Llm {
        message: String,
        provider: Option<String>,
        model: Option<String>,
        context: ErrorContext,
    },

    #[error("Embedding error: {message}")]
    Embedding {
        message: String,
        provider: Option<String>,
        context: ErrorContext,
    },

    #[error("Vector search error: {message}")]
    Search {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PbichatError {
    /// Get the error context
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            PbichatError::Config { context, .. } => Some(context),
            PbichatError::Validation { context, .. } => Some(context),
            PbichatError::Network { context, .. } => Some(context),
            PbichatError::Timeout { context, .. } => Some(context),
            PbichatError::Llm { context, .. } => Some(context),
            PbichatError::Embedding { context, .. } => Some(context),
            PbichatError::Search { context, .. } => Some(context),
            PbichatError::Internal { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Check if error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            PbichatError::Network { .. } => true,
            PbichatError::Timeout { .. } => true,
            PbichatError::Config { .. } => false,
            PbichatError::Validation { .. } => false,
            _ => false,
        }
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        match self {
            PbichatError::Internal { .. } => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Internal error occurred"
                );
            }
            PbichatError::Config { .. } | PbichatError::Validation { .. } => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Configuration or validation error"
                );
            }
            PbichatError::Network { .. } | PbichatError::Timeout { .. } => {
                warn!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Network or timeout error (may be recoverable)"
                );
            }
            _ => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Error occurred"
                );
            }
        }
    }
}

/// Convenience macros for creating errors with context
#[macro_export]
macro_rules! config_error {
    ($msg:expr, $component:expr) => {
        PbichatError::Config {
            message: $msg.to_string(),
            source: None,
            context: ErrorContext::new($component)
                .with_suggestion("Check your configuration file"),
        }
    };
    ($msg:expr, $component:expr, $source:expr) => {
        PbichatError::Config {
            message: $msg.to_string(),
            source: Some(Box::new($source)),
            context: ErrorContext::new($component)
                .with_suggestion("Check your configuration file"),
        }
    };
}

#[macro_export]
macro_rules! validation_error {
    ($msg:expr, $field:expr, $component:expr) => {
        PbichatError::Validation {
            message: $msg.to_string(),
            field: Some($field.to_string()),
            context: ErrorContext::new($component)
                .with_suggestion("Check the field value and format"),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_builder_accumulates_fields() {
        let context = ErrorContext::new("history")
            .with_operation("trim")
            .with_metadata("session_id", "abc")
            .with_suggestion("Lower the history bound");

        assert_eq!(context.component, "history");
        assert_eq!(context.operation.as_deref(), Some("trim"));
        assert_eq!(context.metadata.get("session_id").unwrap(), "abc");
        assert_eq!(context.recovery_suggestions.len(), 1);
    }

    #[test]
    fn timeout_errors_are_recoverable() {
        let err = PbichatError::Timeout {
            operation: "embed".to_string(),
            duration_ms: 5000,
            context: ErrorContext::new("pipeline"),
        };
        assert!(err.is_recoverable());

        let err = validation_error!("question must not be empty", "question", "handlers");
        assert!(!err.is_recoverable());
    }
}
