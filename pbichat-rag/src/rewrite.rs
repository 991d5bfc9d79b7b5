//! Standalone query rewriting
//!
//! Turns a follow-up question into a self-contained one using the session
//! history. This stage is fail-open: any failure of the underlying call
//! degrades to the original question instead of blocking the pipeline.

use crate::llm::ChatModel;
use crate::types::Turn;
use pbichat_core::with_timeout;
use std::sync::Arc;
use tracing::{debug, warn};

/// Fixed rewriting instruction
const REWRITE_INSTRUCTION: &str = "Given the chat history and the latest user question, \
rephrase the follow-up question into a complete, standalone question that can be \
understood without the chat history. Do not answer the question. \
Output only the rewritten question.";

/// Rewrites follow-up questions into standalone queries
pub struct QueryRewriter {
    model: Arc<dyn ChatModel>,
    call_timeout_ms: u64,
}

impl QueryRewriter {
    pub fn new(model: Arc<dyn ChatModel>, call_timeout_ms: u64) -> Self {
        Self {
            model,
            call_timeout_ms,
        }
    }

    /// Rewrite `question` against `history`; returns the original question
    /// on any failure or empty result
    pub async fn rewrite(&self, question: &str, history: &[Turn]) -> String {
        let mut turns = history.to_vec();
        turns.push(Turn::user(question));

        let call = self.model.chat(REWRITE_INSTRUCTION, &turns);
        let outcome = match with_timeout(call, self.call_timeout_ms, "rewrite_query").await {
            Ok(result) => result,
            Err(e) => {
                warn!("Query rewriting timed out, using original question: {}", e);
                return question.trim().to_string();
            }
        };

        match outcome {
            Ok(rewritten) => {
                let rewritten = rewritten.trim();
                if rewritten.is_empty() {
                    warn!("Query rewriting returned empty text, using original question");
                    question.trim().to_string()
                } else {
                    debug!("Rewrote question to: {}", rewritten);
                    rewritten.to_string()
                }
            }
            Err(e) => {
                warn!("Query rewriting failed, using original question: {}", e);
                question.trim().to_string()
            }
        }
    }
}
