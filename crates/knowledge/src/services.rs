//! Process-wide service wiring.
//!
//! Clients are built once at startup and shared by reference with every
//! pipeline invocation; nothing here is re-created per call.

use std::path::Path;
use std::sync::Arc;

use ragline_core::config::{StoreBackend, StoreSettings};
use ragline_core::{AppConfig, AppResult};
use ragline_llm::LlmClient;
use serde::Serialize;

use crate::chunker::Chunker;
use crate::embeddings::EmbeddingClient;
use crate::ingest::IngestionPipeline;
use crate::lancedb_index::LanceDbIndex;
use crate::memory_index::MemoryIndex;
use crate::qdrant_index::QdrantIndex;
use crate::rag::{AnswerOptions, QueryPipeline};
use crate::triggers::{Event, Trigger};
use crate::types::{CollectionTarget, IngestOutcome, QueryOutcome};
use crate::vector_index::{UpsertAtomicity, VectorIndex};

/// Point count and guarantees of the configured collection.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionStats {
    pub backend: String,
    pub collection: String,
    pub points: u64,
    pub upsert_atomicity: UpsertAtomicity,
}

/// Open the configured vector index.
pub async fn open_index(
    settings: &StoreSettings,
    api_key: Option<String>,
) -> AppResult<Arc<dyn VectorIndex>> {
    let index: Arc<dyn VectorIndex> = match settings.backend {
        StoreBackend::Qdrant => Arc::new(QdrantIndex::from_settings(settings, api_key)?),
        StoreBackend::LanceDb => Arc::new(LanceDbIndex::from_settings(settings).await?),
        StoreBackend::Memory => Arc::new(MemoryIndex::new()),
    };

    tracing::debug!(
        backend = index.backend_name(),
        collection = %settings.collection,
        "Opened vector index"
    );
    Ok(index)
}

/// Collection stats through a bare index handle.
pub async fn collection_stats(
    index: &dyn VectorIndex,
    target: &CollectionTarget,
) -> AppResult<CollectionStats> {
    Ok(CollectionStats {
        backend: index.backend_name().to_string(),
        collection: target.name.clone(),
        points: index.count(&target.name).await?,
        upsert_atomicity: index.upsert_atomicity(),
    })
}

/// Build only the ingestion side; no language model client is needed.
pub async fn ingestion_from_config(config: &AppConfig) -> AppResult<IngestionPipeline> {
    config.validate()?;

    let chunker = Chunker::from_settings(&config.chunking)?;
    let embedder =
        EmbeddingClient::from_settings(&config.embedding, config.embedding_api_key())?;
    let index = open_index(&config.store, config.store_api_key()).await?;

    Ok(IngestionPipeline::new(
        chunker,
        embedder,
        index,
        CollectionTarget::from_settings(&config.store),
    ))
}

/// The shared clients and the two pipelines built on them.
#[derive(Clone)]
pub struct RagServices {
    ingestion: IngestionPipeline,
    query: QueryPipeline,
    index: Arc<dyn VectorIndex>,
    target: CollectionTarget,
}

impl RagServices {
    /// Build every client from configuration.
    pub async fn from_config(config: &AppConfig) -> AppResult<Self> {
        config.validate()?;

        let chunker = Chunker::from_settings(&config.chunking)?;
        let embedder =
            EmbeddingClient::from_settings(&config.embedding, config.embedding_api_key())?;
        let index = open_index(&config.store, config.store_api_key()).await?;
        let llm = ragline_llm::create_client(&config.llm, config.llm_api_key())?;

        tracing::info!(
            embedding_provider = embedder.provider_name(),
            embedding_model = embedder.model_name(),
            dimensions = embedder.dimensions(),
            backend = index.backend_name(),
            llm_provider = llm.provider_name(),
            "Services ready"
        );

        Ok(Self::new(
            chunker,
            embedder,
            index,
            llm,
            CollectionTarget::from_settings(&config.store),
            AnswerOptions::from_settings(&config.llm),
            config.query.default_top_k,
        ))
    }

    pub fn new(
        chunker: Chunker,
        embedder: EmbeddingClient,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn LlmClient>,
        target: CollectionTarget,
        options: AnswerOptions,
        default_top_k: usize,
    ) -> Self {
        let ingestion =
            IngestionPipeline::new(chunker, embedder.clone(), index.clone(), target.clone());
        let query = QueryPipeline::new(
            embedder,
            index.clone(),
            llm,
            target.clone(),
            options,
            default_top_k,
        );

        Self {
            ingestion,
            query,
            index,
            target,
        }
    }

    pub fn ingestion(&self) -> &IngestionPipeline {
        &self.ingestion
    }

    pub async fn ingest(&self, path: &Path, source_id: Option<&str>) -> AppResult<IngestOutcome> {
        self.ingestion.run(path, source_id).await
    }

    pub async fn ask(&self, question: &str, top_k: Option<i64>) -> AppResult<QueryOutcome> {
        self.query.ask(question, top_k).await
    }

    pub async fn stats(&self) -> AppResult<CollectionStats> {
        collection_stats(self.index.as_ref(), &self.target).await
    }

    /// Remove every point from the configured collection.
    pub async fn reset(&self) -> AppResult<()> {
        self.index.reset_collection(&self.target.name).await
    }

    /// Run the pipeline an event names and return its JSON result.
    pub async fn handle_event(&self, event: &Event) -> AppResult<serde_json::Value> {
        let trigger = Trigger::from_event(event)?;
        tracing::info!(event = %event.name, "Handling event");

        let result = match trigger {
            Trigger::Ingest(request) => {
                let outcome = self
                    .ingest(&request.pdf_path, request.source.as_deref())
                    .await?;
                serde_json::to_value(outcome)?
            }
            Trigger::Query(request) => {
                let outcome = self.ask(&request.question, request.top_k).await?;
                serde_json::to_value(outcome)?
            }
        };

        Ok(result)
    }
}
