//! Document ingestion: `Loaded → Chunked → Embedded → Upserted`.
//!
//! The pipeline is split in two re-runnable steps so an external orchestrator
//! can checkpoint between them:
//!
//! 1. [`IngestionPipeline::load_and_chunk`] reads a document and returns a
//!    serializable [`ChunkedDocument`].
//! 2. [`IngestionPipeline::embed_and_upsert`] embeds the chunks and writes
//!    them under deterministic ids.
//!
//! Re-running step 2 (or both) overwrites the same points instead of adding
//! new ones.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ragline_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::chunker::Chunker;
use crate::embeddings::EmbeddingClient;
use crate::parser;
use crate::types::{Chunk, CollectionTarget, Document, IngestOutcome, Point, PointPayload};
use crate::vector_index::{point_id, VectorIndex};

/// Pipeline stage reached by an ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStage {
    Loaded,
    Chunked,
    Embedded,
    Upserted,
}

impl IngestStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loaded => "loaded",
            Self::Chunked => "chunked",
            Self::Embedded => "embedded",
            Self::Upserted => "upserted",
        }
    }
}

/// Output of the load-and-chunk step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkedDocument {
    pub source_id: String,
    pub chunks: Vec<Chunk>,
}

impl ChunkedDocument {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Orchestrates chunker, embedding client and vector index for one document.
#[derive(Clone)]
pub struct IngestionPipeline {
    chunker: Chunker,
    embedder: EmbeddingClient,
    index: Arc<dyn VectorIndex>,
    target: CollectionTarget,
}

impl IngestionPipeline {
    pub fn new(
        chunker: Chunker,
        embedder: EmbeddingClient,
        index: Arc<dyn VectorIndex>,
        target: CollectionTarget,
    ) -> Self {
        Self {
            chunker,
            embedder,
            index,
            target,
        }
    }

    /// Ingest the document at `path`, running both steps.
    pub async fn run(&self, path: &Path, source_id: Option<&str>) -> AppResult<IngestOutcome> {
        let chunked = self.load_and_chunk(path, source_id).await?;
        self.embed_and_upsert(&chunked).await
    }

    /// Ingest an already loaded document.
    pub async fn ingest_document(&self, document: &Document) -> AppResult<IngestOutcome> {
        let chunked = self.chunk(document);
        self.embed_and_upsert(&chunked).await
    }

    /// Load and chunk the document at `path`.
    ///
    /// Parsing runs on the blocking pool; PDF extraction is CPU-bound.
    pub async fn load_and_chunk(
        &self,
        path: &Path,
        source_id: Option<&str>,
    ) -> AppResult<ChunkedDocument> {
        let owned_path: PathBuf = path.to_path_buf();
        let owned_source = source_id.map(str::to_string);

        let document = tokio::task::spawn_blocking(move || {
            parser::load_document(&owned_path, owned_source.as_deref())
        })
        .await
        .map_err(|e| AppError::Other(format!("Document loader task failed: {}", e)))??;

        log_stage(&document.source_id, IngestStage::Loaded, document.text.len());
        Ok(self.chunk(&document))
    }

    /// Chunk a loaded document.
    pub fn chunk(&self, document: &Document) -> ChunkedDocument {
        let chunks = self.chunker.split(&document.source_id, &document.text);
        log_stage(&document.source_id, IngestStage::Chunked, chunks.len());

        ChunkedDocument {
            source_id: document.source_id.clone(),
            chunks,
        }
    }

    /// Embed the chunks and upsert them.
    ///
    /// A document without chunks finishes with `ingested: 0` and writes nothing.
    pub async fn embed_and_upsert(&self, chunked: &ChunkedDocument) -> AppResult<IngestOutcome> {
        if chunked.is_empty() {
            tracing::info!(
                source_id = %chunked.source_id,
                "Document produced no chunks, nothing to ingest"
            );
            return Ok(IngestOutcome { ingested: 0 });
        }

        let texts: Vec<String> = chunked.chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        log_stage(&chunked.source_id, IngestStage::Embedded, vectors.len());

        let points = build_points(&chunked.chunks, vectors)?;

        self.index
            .ensure_collection(
                &self.target.name,
                self.embedder.dimensions(),
                self.target.distance,
            )
            .await?;
        self.index.upsert(&self.target.name, &points).await?;
        log_stage(&chunked.source_id, IngestStage::Upserted, points.len());

        Ok(IngestOutcome {
            ingested: points.len(),
        })
    }
}

/// Pair chunks with their vectors under deterministic ids.
pub fn build_points(chunks: &[Chunk], vectors: Vec<Vec<f32>>) -> AppResult<Vec<Point>> {
    if chunks.len() != vectors.len() {
        return Err(AppError::EmbeddingProvider(format!(
            "expected {} embeddings, got {}",
            chunks.len(),
            vectors.len()
        )));
    }

    Ok(chunks
        .iter()
        .zip(vectors)
        .map(|(chunk, vector)| Point {
            id: point_id(&chunk.source_id, chunk.index),
            vector,
            payload: PointPayload {
                source: chunk.source_id.clone(),
                text: chunk.text.clone(),
                chunk_index: Some(chunk.index),
            },
        })
        .collect())
}

fn log_stage(source_id: &str, stage: IngestStage, count: usize) {
    tracing::info!(source_id, stage = stage.as_str(), count, "Ingestion stage reached");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_index::MemoryIndex;
    use crate::embeddings::providers::mock::MockProvider;
    use ragline_core::config::{ChunkUnit, Distance};
    use tempfile::TempDir;

    fn pipeline(index: Arc<MemoryIndex>) -> IngestionPipeline {
        let embedder = EmbeddingClient::new(Arc::new(MockProvider::new(16)), 16, 8).unwrap();
        IngestionPipeline::new(
            Chunker::new(ChunkUnit::Word, 4, 1).unwrap(),
            embedder,
            index,
            CollectionTarget::new("docs", Distance::Cosine),
        )
    }

    fn chunk(index: u32, text: &str) -> Chunk {
        Chunk {
            index,
            source_id: "doc1".to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_build_points_uses_deterministic_ids() {
        let points = build_points(
            &[chunk(0, "first"), chunk(1, "second")],
            vec![vec![1.0], vec![2.0]],
        )
        .unwrap();

        assert_eq!(points[0].id, "ac3bc37d-f169-5f73-842f-b277e90123ad");
        assert_eq!(points[1].id, "2102f41f-82a4-5909-a638-d8a95138cf65");
        assert_eq!(points[1].payload.source, "doc1");
        assert_eq!(points[1].payload.text, "second");
        assert_eq!(points[1].payload.chunk_index, Some(1));
    }

    #[test]
    fn test_build_points_rejects_misaligned_vectors() {
        let result = build_points(&[chunk(0, "only")], vec![]);
        assert!(matches!(result, Err(AppError::EmbeddingProvider(_))));
    }

    #[tokio::test]
    async fn test_load_and_chunk_defaults_source_to_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.txt");
        std::fs::write(&path, "one two three four five six seven").unwrap();

        let index = Arc::new(MemoryIndex::new());
        let chunked = pipeline(index.clone())
            .load_and_chunk(&path, None)
            .await
            .unwrap();

        assert_eq!(chunked.source_id, path.to_string_lossy());
        assert!(chunked.chunks.len() > 1);
        assert_eq!(index.count("docs").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_chunked_document_survives_serialization() {
        let index = Arc::new(MemoryIndex::new());
        let pipeline = pipeline(index.clone());
        let chunked = pipeline.chunk(&Document::new("doc1", "alpha beta gamma delta epsilon"));

        let json = serde_json::to_string(&chunked).unwrap();
        let restored: ChunkedDocument = serde_json::from_str(&json).unwrap();

        let outcome = pipeline.embed_and_upsert(&restored).await.unwrap();
        assert_eq!(outcome.ingested, chunked.chunks.len());
        assert_eq!(index.count("docs").await.unwrap() as usize, outcome.ingested);
    }

    #[tokio::test]
    async fn test_missing_file_is_document_error() {
        let index = Arc::new(MemoryIndex::new());
        let result = pipeline(index)
            .run(Path::new("/definitely/not/here.txt"), None)
            .await;
        assert!(matches!(result, Err(AppError::Document(_))));
    }
}
