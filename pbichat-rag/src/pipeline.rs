//! RAG chat pipeline
//!
//! Orchestrates one question/answer exchange: rewrite the question into a
//! standalone query, embed it, search the hosted index, generate an answer
//! grounded in the retrieved passages, and update the session history.

use crate::embeddings::Embedder;
use crate::history::SessionHistoryStore;
use crate::index::PassageIndex;
use crate::llm::ChatModel;
use crate::rewrite::QueryRewriter;
use crate::types::{ChatOutcome, RagError, RagResult, RetrievedPassage, Turn};
use pbichat_core::{log_operation_start, log_operation_success, with_timeout, ServiceConfig};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Answer returned without calling the generator when retrieval is empty.
/// Skipping the LLM here avoids paying for an answer the context cannot
/// support.
pub const NOT_FOUND_ANSWER: &str =
    "I could not find the answer to your question in the provided document.";

/// Fixed persona for the answer generator; `{context}` is interpolated
/// with the retrieved passages.
const ANSWER_INSTRUCTION: &str = "You are an expert on Microsoft Power BI. \
Answer the user's question using ONLY the context provided below. \
If the answer is not present in the context, say that you could not find \
the answer in the provided document. Use clear, structured formatting \
(headings, bullet points, numbered steps) where it helps readability.\n\n\
Context:\n{context}";

/// Complete per-request RAG pipeline
pub struct RagPipeline {
    rewriter: QueryRewriter,
    answer_model: Arc<dyn ChatModel>,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn PassageIndex>,
    history: SessionHistoryStore,
    config: ServiceConfig,
}

impl RagPipeline {
    /// Assemble a pipeline from its collaborators
    pub fn new(
        config: ServiceConfig,
        rewrite_model: Arc<dyn ChatModel>,
        answer_model: Arc<dyn ChatModel>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn PassageIndex>,
    ) -> Self {
        let call_timeout_ms = config.call_timeout_secs * 1000;

        Self {
            rewriter: QueryRewriter::new(rewrite_model, call_timeout_ms),
            answer_model,
            embedder,
            index,
            history: SessionHistoryStore::new(),
            config,
        }
    }

    /// Build a pipeline backed by the hosted services named in the config
    pub async fn from_config(config: ServiceConfig) -> RagResult<Self> {
        config.validate()?;

        let rewrite_model: Arc<dyn ChatModel> =
            Arc::new(crate::llm::SiumaiChatModel::new(config.rewrite.clone()).await?);
        let answer_model: Arc<dyn ChatModel> =
            Arc::new(crate::llm::SiumaiChatModel::new(config.generation.clone()).await?);
        let embedder: Arc<dyn Embedder> =
            Arc::new(crate::embeddings::SiumaiEmbedder::new(config.embedding.clone()).await?);
        let index: Arc<dyn PassageIndex> =
            Arc::new(crate::index::HttpVectorIndex::new(config.index.clone())?);

        info!(
            "RAG pipeline ready: answers via {}, top-{} retrieval",
            answer_model.describe(),
            config.retrieval.top_k
        );

        Ok(Self::new(
            config,
            rewrite_model,
            answer_model,
            embedder,
            index,
        ))
    }

    /// Ask a question within a session and produce an answer
    pub async fn ask(&self, session_id: &str, question: &str) -> RagResult<ChatOutcome> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::Validation(
                "Question must be a non-empty string".to_string(),
            ));
        }

        log_operation_start!("chat_exchange", session_id = session_id);
        let start_time = Instant::now();
        let call_timeout_ms = self.config.call_timeout_secs * 1000;

        // Rewriting never fails the pipeline; it degrades to the original
        // question.
        let history = self.history.get_or_create(session_id).await;
        let transformed_query = self.rewriter.rewrite(question, &history).await;

        let vector = match with_timeout(
            self.embedder.embed(&transformed_query),
            call_timeout_ms,
            "embed_query",
        )
        .await
        {
            Ok(result) => result?,
            Err(e) => return Err(RagError::Embedding(e.to_string())),
        };

        let passages = match with_timeout(
            self.index.query(&vector, self.config.retrieval.top_k),
            call_timeout_ms,
            "index_query",
        )
        .await
        {
            Ok(result) => result?,
            Err(e) => return Err(RagError::Search(e.to_string())),
        };

        info!(
            "Retrieved {} passages for session {} in {:?}",
            passages.len(),
            session_id,
            start_time.elapsed()
        );

        if passages.is_empty() {
            warn!("No usable passages retrieved, returning canned answer");
            self.history
                .append(session_id, Turn::user(transformed_query.clone()))
                .await;
            self.history
                .append(session_id, Turn::model(NOT_FOUND_ANSWER))
                .await;
            self.history
                .trim(session_id, self.config.history.max_turns)
                .await;

            return Ok(ChatOutcome {
                answer: NOT_FOUND_ANSWER.to_string(),
                transformed_query,
            });
        }

        // The rewritten question becomes part of the session before
        // generation so the model sees it as the latest user turn. If
        // generation fails the turn stays: the question was genuinely
        // asked, only the answer is missing.
        self.history
            .append(session_id, Turn::user(transformed_query.clone()))
            .await;
        let turns = self.history.get_or_create(session_id).await;

        let context = prepare_context(&passages);
        let system_prompt = ANSWER_INSTRUCTION.replace("{context}", &context);

        debug!("Prepared context block ({} chars)", context.len());

        let answer = match with_timeout(
            self.answer_model.chat(&system_prompt, &turns),
            call_timeout_ms,
            "generate_answer",
        )
        .await
        {
            Ok(result) => result?,
            Err(e) => return Err(RagError::Llm(e.to_string())),
        };

        self.history
            .append(session_id, Turn::model(answer.clone()))
            .await;
        self.history
            .trim(session_id, self.config.history.max_turns)
            .await;

        log_operation_success!(
            "chat_exchange",
            session_id = session_id,
            total_time_ms = start_time.elapsed().as_millis() as u64
        );

        Ok(ChatOutcome {
            answer,
            transformed_query,
        })
    }

    /// Drop a session's history entirely (idempotent)
    pub async fn clear_history(&self, session_id: &str) {
        self.history.clear(session_id).await;
    }

    /// Access to the session history store (used by tests and diagnostics)
    pub fn history(&self) -> &SessionHistoryStore {
        &self.history
    }

    /// Get current configuration
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

/// Join passages into the prompt context block, preserving retrieval order
fn prepare_context(passages: &[RetrievedPassage]) -> String {
    let mut context_parts = Vec::with_capacity(passages.len());

    for (i, passage) in passages.iter().enumerate() {
        let content = match &passage.source {
            Some(source) => format!("[Source {}: {}]\n{}", i + 1, source, passage.text),
            None => format!("[Source {}]\n{}", i + 1, passage.text),
        };
        context_parts.push(content);
    }

    context_parts.join("\n\n---\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedModel {
        reply: RagResult<String>,
        calls: AtomicUsize,
    }

    impl ScriptedModel {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err(RagError::Llm("simulated outage".to_string())),
                calls: AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn chat(&self, _system_prompt: &str, _turns: &[Turn]) -> RagResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(s) => Ok(s.clone()),
                Err(_) => Err(RagError::Llm("simulated outage".to_string())),
            }
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> RagResult<Vec<f32>> {
            Ok(vec![0.1, 0.2, 0.3])
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> RagResult<Vec<f32>> {
            Err(RagError::Embedding("simulated outage".to_string()))
        }
    }

    struct FixedIndex(Vec<RetrievedPassage>);

    #[async_trait]
    impl PassageIndex for FixedIndex {
        async fn query(&self, _vector: &[f32], top_k: usize) -> RagResult<Vec<RetrievedPassage>> {
            Ok(self.0.iter().take(top_k).cloned().collect())
        }
    }

    fn passages(texts: &[&str]) -> Vec<RetrievedPassage> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| RetrievedPassage {
                text: text.to_string(),
                source: Some("powerbi-guide.pdf".to_string()),
                score: 1.0 - i as f32 * 0.1,
            })
            .collect()
    }

    fn pipeline_with(
        rewrite: Arc<ScriptedModel>,
        answer: Arc<ScriptedModel>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn PassageIndex>,
    ) -> RagPipeline {
        RagPipeline::new(ServiceConfig::default(), rewrite, answer, embedder, index)
    }

    #[tokio::test]
    async fn first_exchange_appends_user_and_model_turns() {
        let answer = ScriptedModel::ok("DAX is a formula language for Power BI.");
        let pipeline = pipeline_with(
            ScriptedModel::ok("What is DAX?"),
            answer.clone(),
            Arc::new(FixedEmbedder),
            Arc::new(FixedIndex(passages(&[
                "DAX is a formula language...",
                "Used for calculated columns...",
            ]))),
        );

        let outcome = pipeline.ask("s1", "What is DAX?").await.unwrap();
        assert_eq!(outcome.answer, "DAX is a formula language for Power BI.");
        assert_eq!(outcome.transformed_query, "What is DAX?");

        let turns = pipeline.history().get_or_create("s1").await;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0], Turn::user("What is DAX?"));
        assert_eq!(turns[1].role, crate::types::TurnRole::Model);
    }

    #[tokio::test]
    async fn empty_retrieval_short_circuits_without_generator_call() {
        let answer = ScriptedModel::ok("should never be used");
        let pipeline = pipeline_with(
            ScriptedModel::ok("What is DAX?"),
            answer.clone(),
            Arc::new(FixedEmbedder),
            Arc::new(FixedIndex(vec![])),
        );

        let outcome = pipeline.ask("s1", "What is DAX?").await.unwrap();
        assert_eq!(outcome.answer, NOT_FOUND_ANSWER);
        assert_eq!(answer.call_count(), 0);

        // The rewritten question and the canned answer still land in history
        let turns = pipeline.history().get_or_create("s1").await;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].content, NOT_FOUND_ANSWER);
    }

    #[tokio::test]
    async fn rewriter_failure_degrades_to_original_question() {
        let pipeline = pipeline_with(
            ScriptedModel::failing(),
            ScriptedModel::ok("An answer."),
            Arc::new(FixedEmbedder),
            Arc::new(FixedIndex(passages(&["Some passage"]))),
        );

        let outcome = pipeline.ask("s1", "and measures?").await.unwrap();
        assert_eq!(outcome.transformed_query, "and measures?");
        assert_eq!(outcome.answer, "An answer.");
    }

    #[tokio::test]
    async fn embedding_failure_aborts_without_touching_history() {
        let pipeline = pipeline_with(
            ScriptedModel::ok("What is DAX?"),
            ScriptedModel::ok("unused"),
            Arc::new(FailingEmbedder),
            Arc::new(FixedIndex(passages(&["Some passage"]))),
        );

        let result = pipeline.ask("s1", "What is DAX?").await;
        assert!(matches!(result, Err(RagError::Embedding(_))));
        assert_eq!(pipeline.history().len("s1").await, 0);
    }

    #[tokio::test]
    async fn generator_failure_leaves_the_user_turn() {
        let pipeline = pipeline_with(
            ScriptedModel::ok("What is DAX?"),
            ScriptedModel::failing(),
            Arc::new(FixedEmbedder),
            Arc::new(FixedIndex(passages(&["Some passage"]))),
        );

        let result = pipeline.ask("s1", "What is DAX?").await;
        assert!(matches!(result, Err(RagError::Llm(_))));

        let turns = pipeline.history().get_or_create("s1").await;
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0], Turn::user("What is DAX?"));
    }

    #[tokio::test]
    async fn history_never_exceeds_the_configured_bound() {
        let mut config = ServiceConfig::default();
        config.history.max_turns = 4;

        let pipeline = RagPipeline::new(
            config,
            ScriptedModel::ok("standalone question"),
            ScriptedModel::ok("an answer"),
            Arc::new(FixedEmbedder),
            Arc::new(FixedIndex(passages(&["Some passage"]))),
        );

        for i in 0..6 {
            pipeline
                .ask("s1", &format!("question {}", i))
                .await
                .unwrap();
        }

        let turns = pipeline.history().get_or_create("s1").await;
        assert_eq!(turns.len(), 4);
        // Most recent exchange survives in order
        assert_eq!(turns[2], Turn::user("standalone question"));
        assert_eq!(turns[3], Turn::model("an answer"));
    }

    #[tokio::test]
    async fn blank_question_is_rejected_before_any_call() {
        let rewrite = ScriptedModel::ok("unused");
        let pipeline = pipeline_with(
            rewrite.clone(),
            ScriptedModel::ok("unused"),
            Arc::new(FixedEmbedder),
            Arc::new(FixedIndex(vec![])),
        );

        let result = pipeline.ask("s1", "   ").await;
        assert!(matches!(result, Err(RagError::Validation(_))));
        assert_eq!(rewrite.call_count(), 0);
        assert_eq!(pipeline.history().session_count().await, 0);
    }

    #[test]
    fn context_preserves_retrieval_order_and_separator() {
        let context = prepare_context(&passages(&["first passage", "second passage"]));
        let first = context.find("first passage").unwrap();
        let second = context.find("second passage").unwrap();
        assert!(first < second);
        assert!(context.contains("\n\n---\n\n"));
        assert!(context.contains("[Source 1: powerbi-guide.pdf]"));
    }
}
