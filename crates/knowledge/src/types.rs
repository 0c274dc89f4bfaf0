//! Knowledge system type definitions.

use ragline_core::config::{Distance, StoreSettings};
use serde::{Deserialize, Serialize};

/// The collection a pipeline reads from and writes to.
///
/// The dimension is not stored here; it always comes from the embedding client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionTarget {
    pub name: String,
    pub distance: Distance,
}

impl CollectionTarget {
    pub fn new(name: impl Into<String>, distance: Distance) -> Self {
        Self {
            name: name.into(),
            distance,
        }
    }

    pub fn from_settings(settings: &StoreSettings) -> Self {
        Self::new(settings.collection.clone(), settings.distance)
    }
}

/// A loaded source document.
///
/// Immutable once loaded; `source_id` is the stable external identifier
/// (file path or URL) that every derived point refers back to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub source_id: String,
    pub text: String,
}

impl Document {
    pub fn new(source_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            text: text.into(),
        }
    }
}

/// An ordered fragment of a document's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position within the document's chunk sequence
    pub index: u32,

    /// Back-reference to the owning document
    pub source_id: String,

    pub text: String,
}

/// Payload attached to a stored point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointPayload {
    pub source: String,
    pub text: String,

    /// Chunk position, when the point was written by the ingestion pipeline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<u32>,
}

/// A persisted `(id, vector, payload)` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: PointPayload,
}

/// A ranked hit returned by a vector search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub text: String,
    pub source: String,

    /// Similarity under the collection's metric (higher is closer)
    pub score: f32,
}

/// Result of ingesting one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestOutcome {
    /// Number of chunks written to the store
    pub ingested: usize,
}

/// Result of answering one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub answer: String,

    /// Contributing sources, first occurrence order
    pub sources: Vec<String>,

    /// Number of contexts supplied to the model
    pub num_contexts: usize,
}
