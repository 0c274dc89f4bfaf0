//! LLM provider factory.
//!
//! Builds the configured chat client once so every query reuses the same
//! HTTP connection pool.

use crate::client::LlmClient;
use crate::providers::{ollama::DEFAULT_OLLAMA_URL, openai, OllamaClient, OpenAiClient};
use crate::types::ProviderType;
use ragline_core::config::LlmSettings;
use ragline_core::{AppError, AppResult};
use std::sync::Arc;

/// Create an LLM client from settings.
///
/// # Arguments
/// * `settings` - Provider, endpoint and timeout settings
/// * `api_key` - API key, required by the hosted providers
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or a required
/// API key is missing.
pub fn create_client(
    settings: &LlmSettings,
    api_key: Option<String>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider = ProviderType::parse(&settings.provider).ok_or_else(|| {
        AppError::Config(format!("Unknown LLM provider: {}", settings.provider))
    })?;

    let timeout = settings.timeout();

    match provider {
        ProviderType::Ollama => {
            let base_url = settings.endpoint.as_deref().unwrap_or(DEFAULT_OLLAMA_URL);
            Ok(Arc::new(OllamaClient::with_base_url(base_url, timeout)?))
        }
        ProviderType::OpenAI | ProviderType::Groq => {
            let api_key = api_key.ok_or_else(|| {
                AppError::Config(format!(
                    "{} provider requires an API key (set {})",
                    provider.as_str(),
                    settings.api_key_env
                ))
            })?;

            let default_url = match provider {
                ProviderType::Groq => openai::GROQ_BASE_URL,
                _ => openai::OPENAI_BASE_URL,
            };
            let base_url = settings.endpoint.as_deref().unwrap_or(default_url);

            Ok(Arc::new(OpenAiClient::new(
                provider.as_str(),
                base_url,
                api_key,
                timeout,
            )?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(provider: &str) -> LlmSettings {
        LlmSettings {
            provider: provider.to_string(),
            ..LlmSettings::default()
        }
    }

    #[test]
    fn test_create_ollama_client() {
        let client = create_client(&settings("ollama"), None).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_create_groq_client() {
        let client = create_client(&settings("groq"), Some("key".to_string())).unwrap();
        assert_eq!(client.provider_name(), "groq");
    }

    #[test]
    fn test_hosted_provider_requires_api_key() {
        match create_client(&settings("groq"), None) {
            Err(AppError::Config(msg)) => assert!(msg.contains("GROQ_API_KEY")),
            other => panic!("Expected config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_unknown_provider() {
        let result = create_client(&settings("unknown"), None);
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
