//! Cross-module tests and the fakes they share.

mod scenarios;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ragline_core::config::{ChunkUnit, Distance};
use ragline_core::AppResult;
use ragline_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};

use crate::chunker::Chunker;
use crate::embeddings::providers::mock::MockProvider;
use crate::embeddings::{EmbeddingClient, EmbeddingProvider};
use crate::memory_index::MemoryIndex;
use crate::rag::AnswerOptions;
use crate::services::RagServices;
use crate::types::CollectionTarget;

/// Embedding provider that records every batch.
///
/// Texts with a registered vector get it; anything else falls back to the
/// trigram mock so unregistered texts still embed deterministically.
#[derive(Debug)]
pub(crate) struct RecordingEmbedder {
    dimensions: usize,
    vectors: HashMap<String, Vec<f32>>,
    fallback: MockProvider,
    pub batches: Mutex<Vec<Vec<String>>>,
}

impl RecordingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            vectors: HashMap::new(),
            fallback: MockProvider::new(dimensions),
            batches: Mutex::new(Vec::new()),
        }
    }

    pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
        assert_eq!(vector.len(), self.dimensions);
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        self.vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.fallback.embed_text(text))
    }

    pub fn call_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }
}

#[async_trait]
impl EmbeddingProvider for RecordingEmbedder {
    fn provider_name(&self) -> &str {
        "recording"
    }

    fn model_name(&self) -> &str {
        "recording-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.batches.lock().unwrap().push(texts.to_vec());
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }
}

/// Language model that records requests and returns a fixed answer.
#[derive(Debug, Default)]
pub(crate) struct RecordingLlm {
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl RecordingLlm {
    /// Content of the last user message sent.
    pub fn last_user_message(&self) -> Option<String> {
        self.requests
            .lock()
            .unwrap()
            .last()
            .and_then(|r| r.messages.last())
            .map(|m| m.content.clone())
    }
}

#[async_trait]
impl LlmClient for RecordingLlm {
    fn provider_name(&self) -> &str {
        "recording"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(LlmResponse {
            content: "recorded answer".to_string(),
            model: request.model.clone(),
            usage: LlmUsage::new(10, 2),
        })
    }
}

/// Services wired to fakes and a fresh in-memory index.
pub(crate) struct Harness {
    pub services: RagServices,
    pub embedder: Arc<RecordingEmbedder>,
    pub llm: Arc<RecordingLlm>,
    pub index: Arc<MemoryIndex>,
}

pub(crate) fn harness(embedder: RecordingEmbedder, chunker: Chunker) -> Harness {
    let dimensions = embedder.dimensions;
    let embedder = Arc::new(embedder);
    let llm = Arc::new(RecordingLlm::default());
    let index = Arc::new(MemoryIndex::new());

    let client = EmbeddingClient::new(embedder.clone(), dimensions, 16).unwrap();
    let services = RagServices::new(
        chunker,
        client,
        index.clone(),
        llm.clone(),
        CollectionTarget::new("docs", Distance::Cosine),
        AnswerOptions {
            model: "test-model".to_string(),
            temperature: 0.0,
            max_tokens: 128,
        },
        5,
    );

    Harness {
        services,
        embedder,
        llm,
        index,
    }
}

pub(crate) fn sentence_chunker(chunk_size: usize, overlap: usize) -> Chunker {
    Chunker::new(ChunkUnit::Sentence, chunk_size, overlap).unwrap()
}
