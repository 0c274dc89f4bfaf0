//! Embedding provider implementations.

pub mod gemini;
pub mod mock;
pub mod ollama;

use ragline_core::AppError;
use std::time::Duration;

/// Map a reqwest failure to the error taxonomy.
pub(crate) fn map_request_error(
    err: reqwest::Error,
    operation: &str,
    timeout: Duration,
) -> AppError {
    if err.is_timeout() {
        AppError::timeout(operation, timeout)
    } else {
        AppError::EmbeddingProvider(format!("{} request failed: {}", operation, err))
    }
}

/// Map a failure while reading or decoding a response body.
pub(crate) fn map_decode_error(
    err: reqwest::Error,
    operation: &str,
    timeout: Duration,
) -> AppError {
    if err.is_timeout() {
        AppError::timeout(operation, timeout)
    } else {
        AppError::EmbeddingProvider(format!("Failed to parse {} response: {}", operation, err))
    }
}

/// Build an HTTP client with the configured request timeout.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::EmbeddingProvider(format!("Failed to build HTTP client: {}", e)))
}
