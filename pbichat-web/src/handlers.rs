//! HTTP request handlers for the chat service

use crate::AppState;
use axum::{extract::State, http::StatusCode, response::Json, Json as JsonExtractor};
use pbichat_rag::RagError;
use serde::{Deserialize, Serialize};
use tracing::error;

/// Session used when the client does not supply one
const DEFAULT_SESSION_ID: &str = "default";

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    message: String,
    timestamp: chrono::DateTime<chrono::Utc>,
    version: String,
}

/// Chat request
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub question: Option<String>,
    pub session_id: Option<String>,
}

/// Chat response; exactly one of the variants is serialized, and the
/// `success` flag tells clients which one they got
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ChatResponse {
    #[serde(rename_all = "camelCase")]
    Success {
        success: bool,
        response: String,
        transformed_query: String,
    },
    Failure {
        success: bool,
        error: String,
    },
}

impl ChatResponse {
    fn success(response: String, transformed_query: String) -> Self {
        ChatResponse::Success {
            success: true,
            response,
            transformed_query,
        }
    }

    fn failure<S: Into<String>>(error: S) -> Self {
        ChatResponse::Failure {
            success: false,
            error: error.into(),
        }
    }
}

/// History clearing request
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearHistoryRequest {
    pub session_id: Option<String>,
}

/// History clearing response
#[derive(Serialize)]
pub struct ClearHistoryResponse {
    pub success: bool,
    pub message: String,
}

fn session_id_or_default(session_id: Option<&str>) -> String {
    match session_id.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => DEFAULT_SESSION_ID.to_string(),
    }
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        message: "Power BI chat service is running".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Answer a question within a chat session
///
/// Pipeline failures are reported in the JSON body, not as transport
/// errors; only request validation produces a 400.
pub async fn chat(
    State(state): State<AppState>,
    JsonExtractor(request): JsonExtractor<ChatRequest>,
) -> (StatusCode, Json<ChatResponse>) {
    let question = match request.question.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => q.to_string(),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ChatResponse::failure("Question must be a non-empty string")),
            );
        }
    };

    let session_id = session_id_or_default(request.session_id.as_deref());

    match state.pipeline.ask(&session_id, &question).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(ChatResponse::success(outcome.answer, outcome.transformed_query)),
        ),
        Err(RagError::Validation(message)) => {
            (StatusCode::BAD_REQUEST, Json(ChatResponse::failure(message)))
        }
        Err(e) => {
            error!("Chat exchange failed for session {}: {}", session_id, e);
            (StatusCode::OK, Json(ChatResponse::failure(e.to_string())))
        }
    }
}

/// Drop a session's history; clearing an unknown session is a success
pub async fn clear_history(
    State(state): State<AppState>,
    JsonExtractor(request): JsonExtractor<ClearHistoryRequest>,
) -> Json<ClearHistoryResponse> {
    let session_id = session_id_or_default(request.session_id.as_deref());

    state.pipeline.clear_history(&session_id).await;

    Json(ClearHistoryResponse {
        success: true,
        message: format!("Chat history cleared for session: {}", session_id),
    })
}
