//! Pbichat RAG - retrieval-augmented chat pipeline
//!
//! This crate integrates with siumai to answer Power BI questions from an
//! indexed documentation corpus: question rewriting, query embedding,
//! vector search against a hosted index, and grounded answer generation,
//! with bounded per-session conversation history.

pub mod embeddings;
pub mod history;
pub mod index;
pub mod llm;
pub mod pipeline;
pub mod rewrite;
pub mod types;

pub use embeddings::{Embedder, SiumaiEmbedder};
pub use history::SessionHistoryStore;
pub use index::{HttpVectorIndex, PassageIndex};
pub use llm::{ChatModel, SiumaiChatModel};
pub use pipeline::{RagPipeline, NOT_FOUND_ANSWER};
pub use rewrite::QueryRewriter;
pub use types::{ChatOutcome, RagError, RagResult, RetrievedPassage, Turn, TurnRole};

// Re-export commonly used types from siumai
pub use siumai::prelude::LlmClient;
