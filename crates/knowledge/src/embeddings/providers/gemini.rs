//! Gemini embedding provider.
//!
//! Calls the `batchEmbedContents` REST method, one request entry per text,
//! with `outputDimensionality` set to the configured dimension.

use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use ragline_core::config::EmbeddingSettings;
use ragline_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use super::{http_client, map_decode_error, map_request_error};

const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini embedding provider
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    /// Model name without the `models/` prefix (e.g., "gemini-embedding-001")
    model: String,
    dimensions: usize,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    output_dimensionality: usize,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

impl GeminiProvider {
    pub fn new(settings: &EmbeddingSettings, api_key: impl Into<String>) -> AppResult<Self> {
        let timeout = settings.timeout();
        let base_url = settings
            .endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_GEMINI_URL.to_string());
        let model = settings
            .model
            .strip_prefix("models/")
            .unwrap_or(&settings.model)
            .to_string();

        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model,
            dimensions: settings.dimensions,
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:batchEmbedContents", self.base_url, self.model)
    }

    fn build_request<'a>(
        &self,
        model_path: &'a str,
        texts: &'a [String],
    ) -> BatchEmbedRequest<'a> {
        BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest {
                    model: model_path,
                    content: Content {
                        parts: [Part {
                            text: text.as_str(),
                        }],
                    },
                    output_dimensionality: self.dimensions,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiProvider {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "gemini", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model_path = format!("models/{}", self.model);
        let request = self.build_request(&model_path, texts);

        debug!("Sending batch embedding request");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_request_error(e, "gemini batchEmbedContents", self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::EmbeddingProvider(format!(
                "Gemini API error ({}): {}",
                status, error_text
            )));
        }

        let body: BatchEmbedResponse = response
            .json()
            .await
            .map_err(|e| map_decode_error(e, "gemini batchEmbedContents", self.timeout))?;

        Ok(body.embeddings.into_iter().map(|e| e.values).collect())
    }
}
