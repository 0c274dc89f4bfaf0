//! Chat completion providers.

pub mod ollama;
pub mod openai;

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

use ragline_core::AppError;
use std::time::Duration;

/// Map a reqwest failure to the error taxonomy.
pub(crate) fn map_transport_error(
    err: reqwest::Error,
    operation: &str,
    timeout: Duration,
) -> AppError {
    if err.is_timeout() {
        AppError::timeout(operation, timeout)
    } else {
        AppError::Llm(format!("{} request failed: {}", operation, err))
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
        AppError::Llm(format!("Failed to parse {} response: {}", operation, err))
    }
}
