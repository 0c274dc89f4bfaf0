//! Retrieval-augmented generation over a vector store.
//!
//! Documents are chunked, embedded and upserted under deterministic ids;
//! questions are embedded, matched against the stored points and answered
//! by a language model from the retrieved contexts.

pub mod chunker;
pub mod embeddings;
pub mod ingest;
pub mod lancedb_index;
pub mod memory_index;
pub mod parser;
pub mod qdrant_index;
pub mod rag;
pub mod services;
pub mod triggers;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use chunker::{chunk_text, Chunker};
pub use embeddings::{EmbeddingClient, EmbeddingProvider};
pub use ingest::{build_points, ChunkedDocument, IngestStage, IngestionPipeline};
pub use rag::{AnswerOptions, QueryPipeline};
pub use services::{
    collection_stats, ingestion_from_config, open_index, CollectionStats, RagServices,
};
pub use triggers::{Event, Trigger};
pub use types::{
    Chunk, CollectionTarget, Document, IngestOutcome, Point, PointPayload, QueryOutcome,
    SearchResult,
};
pub use vector_index::{point_id, UpsertAtomicity, VectorIndex};
