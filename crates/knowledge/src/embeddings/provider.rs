//! Embedding provider trait and factory.

use ragline_core::config::EmbeddingSettings;
use ragline_core::{AppError, AppResult};
use std::sync::Arc;

use super::providers::{gemini::GeminiProvider, mock::MockProvider, ollama::OllamaProvider};

/// Trait for embedding providers.
///
/// One call embeds one batch; the result must be positionally aligned with
/// the input. Batch sizing and output validation live in `EmbeddingClient`.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "mock", "gemini", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;
}

/// Create an embedding provider based on configuration.
pub fn create_provider(
    settings: &EmbeddingSettings,
    api_key: Option<String>,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match settings.provider.to_lowercase().as_str() {
        "mock" => Ok(Arc::new(MockProvider::new(settings.dimensions))),

        "gemini" => {
            let api_key = api_key.ok_or_else(|| {
                AppError::Config(format!(
                    "Gemini embedding provider requires an API key (set {})",
                    settings.api_key_env
                ))
            })?;
            Ok(Arc::new(GeminiProvider::new(settings, api_key)?))
        }

        "ollama" => Ok(Arc::new(OllamaProvider::new(settings)?)),

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: gemini, ollama, mock",
            settings.provider
        ))),
    }
}
