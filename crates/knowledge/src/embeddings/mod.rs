//! Embedding client.
//!
//! Wraps a provider with batching and output validation. The client is
//! built once per process and shared; it holds no mutable state, so
//! concurrent pipeline invocations can use it freely.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};

use ragline_core::config::EmbeddingSettings;
use ragline_core::{AppError, AppResult};
use std::sync::Arc;

/// Batches texts through an [`EmbeddingProvider`] and validates the results.
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    provider: Arc<dyn EmbeddingProvider>,
    dimensions: usize,
    batch_size: usize,
}

impl EmbeddingClient {
    /// Create a client for `provider`.
    ///
    /// Fails with `AppError::Config` if `dimensions` or `batch_size` is zero
    /// or the provider was built for a different dimension.
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        dimensions: usize,
        batch_size: usize,
    ) -> AppResult<Self> {
        if dimensions == 0 {
            return Err(AppError::Config(
                "embedding dimensions must be greater than zero".to_string(),
            ));
        }
        if batch_size == 0 {
            return Err(AppError::Config(
                "embedding batch_size must be greater than zero".to_string(),
            ));
        }
        if provider.dimensions() != dimensions {
            return Err(AppError::Config(format!(
                "provider '{}' produces {}-dimensional vectors, configuration expects {}",
                provider.provider_name(),
                provider.dimensions(),
                dimensions
            )));
        }

        Ok(Self {
            provider,
            dimensions,
            batch_size,
        })
    }

    /// Build the configured provider and wrap it.
    pub fn from_settings(
        settings: &EmbeddingSettings,
        api_key: Option<String>,
    ) -> AppResult<Self> {
        let provider = create_provider(settings, api_key)?;
        Self::new(provider, settings.dimensions, settings.batch_size)
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Embed `texts`, returning one vector per input in input order.
    ///
    /// Fails with `EmbeddingProvider` if a batch comes back short or long,
    /// and with `DimensionMismatch` if any vector has the wrong length.
    pub async fn embed(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::info!(
            texts = texts.len(),
            provider = self.provider.provider_name(),
            model = self.provider.model_name(),
            "Embedding texts"
        );

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let vectors = self.provider.embed_batch(batch).await?;

            if vectors.len() != batch.len() {
                return Err(AppError::EmbeddingProvider(format!(
                    "provider returned {} embeddings for a batch of {}",
                    vectors.len(),
                    batch.len()
                )));
            }

            if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimensions) {
                return Err(AppError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: bad.len(),
                });
            }

            embeddings.extend(vectors);
        }

        tracing::debug!(
            "Generated {} embeddings of dimension {}",
            embeddings.len(),
            self.dimensions
        );

        Ok(embeddings)
    }

    /// Embed a single text.
    pub async fn embed_one(&self, text: &str) -> AppResult<Vec<f32>> {
        self.embed(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| AppError::EmbeddingProvider("No embedding returned".to_string()))
    }
}
