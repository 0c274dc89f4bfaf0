//! Error types for ragline.
//!
//! A single error enum covers every failure the ingestion and query
//! pipelines can surface. Each variant belongs to one kind in the error
//! taxonomy, and that kind decides whether an external orchestrator should
//! retry the step.

use std::time::Duration;
use thiserror::Error;

/// Unified error type for ragline.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Invalid chunking, dimension or provider configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport, auth or quota failure at the embedding provider
    #[error("Embedding provider error: {0}")]
    EmbeddingProvider(String),

    /// The embedding provider returned a vector of the wrong length
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The vector store could not be reached
    #[error("Vector store unavailable: {0}")]
    StoreUnavailable(String),

    /// A collection exists with an incompatible dimension or metric
    #[error("Schema conflict: {0}")]
    SchemaConflict(String),

    /// Bad caller input (e.g. a non-positive top_k)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An external call exceeded its configured timeout
    #[error("Timed out after {}s: {operation}", after.as_secs_f64())]
    Timeout { operation: String, after: Duration },

    /// Language model errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// A document could not be read or parsed
    #[error("Document error: {0}")]
    Document(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Build a timeout error for the named operation.
    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        AppError::Timeout {
            operation: operation.into(),
            after,
        }
    }

    /// Stable taxonomy name, used in user-visible failure payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "ConfigurationError",
            AppError::EmbeddingProvider(_) => "EmbeddingProviderError",
            AppError::DimensionMismatch { .. } => "DimensionMismatchError",
            AppError::StoreUnavailable(_) => "StoreUnavailableError",
            AppError::SchemaConflict(_) => "SchemaConflictError",
            AppError::InvalidArgument(_) => "InvalidArgumentError",
            AppError::Timeout { .. } => "TimeoutError",
            AppError::Llm(_) => "LanguageModelError",
            AppError::Document(_) => "DocumentError",
            AppError::Io(_) => "IoError",
            AppError::Serialization(_) => "SerializationError",
            AppError::Other(_) => "Error",
        }
    }

    /// Whether a retry of the same step can succeed without operator action.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::EmbeddingProvider(_)
                | AppError::StoreUnavailable(_)
                | AppError::Timeout { .. }
                | AppError::Llm(_)
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_kinds_are_retryable() {
        assert!(AppError::EmbeddingProvider("quota".into()).is_retryable());
        assert!(AppError::StoreUnavailable("refused".into()).is_retryable());
        assert!(AppError::timeout("embed", Duration::from_secs(3)).is_retryable());
        assert!(AppError::Llm("503".into()).is_retryable());
    }

    #[test]
    fn test_fatal_kinds_are_not_retryable() {
        assert!(!AppError::Config("overlap".into()).is_retryable());
        assert!(!AppError::DimensionMismatch {
            expected: 3,
            actual: 4
        }
        .is_retryable());
        assert!(!AppError::SchemaConflict("dim".into()).is_retryable());
        assert!(!AppError::InvalidArgument("top_k".into()).is_retryable());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(AppError::Config(String::new()).kind(), "ConfigurationError");
        assert_eq!(
            AppError::InvalidArgument(String::new()).kind(),
            "InvalidArgumentError"
        );
        assert_eq!(
            AppError::timeout("search", Duration::from_secs(1)).kind(),
            "TimeoutError"
        );
    }

    #[test]
    fn test_display_messages() {
        let err = AppError::DimensionMismatch {
            expected: 768,
            actual: 3072,
        };
        assert_eq!(err.to_string(), "Dimension mismatch: expected 768, got 3072");

        let err = AppError::timeout("qdrant upsert", Duration::from_millis(1500));
        assert_eq!(err.to_string(), "Timed out after 1.5s: qdrant upsert");
    }
}
