//! RAG (Retrieval-Augmented Generation) answering system.
//!
//! Provides natural language answering over the collection using LLM synthesis.

pub mod ask;
pub mod types;

pub use ask::{build_context, QueryPipeline};
pub use types::{AnswerOptions, RetrievedContexts};
