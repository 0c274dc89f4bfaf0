//! OpenAI-compatible chat completion provider.
//!
//! Works against any server exposing `POST {base}/chat/completions`,
//! including Groq (the default) and OpenAI itself.

use crate::client::{LlmClient, LlmMessage, LlmRequest, LlmResponse, LlmUsage};
use crate::providers::{map_decode_error, map_transport_error};
use ragline_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Groq's OpenAI-compatible endpoint.
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// OpenAI's public endpoint.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [LlmMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Client for OpenAI-compatible chat completion APIs.
pub struct OpenAiClient {
    name: String,
    base_url: String,
    api_key: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAiClient {
    /// Create a client for the given base URL.
    ///
    /// `name` is reported by `provider_name` (e.g. "groq").
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AppError::Config(
                "OpenAI-compatible provider requires an API key".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Llm(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            timeout,
            client,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn convert_response(
        &self,
        response: ChatResponse,
        requested_model: &str,
    ) -> AppResult<LlmResponse> {
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::Llm("Completion contained no choices".to_string()))?;

        let usage = response
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        let model = if response.model.is_empty() {
            requested_model.to_string()
        } else {
            response.model
        };

        Ok(LlmResponse {
            content,
            model,
            usage,
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!(provider = %self.name, model = %request.model, "Sending chat completion request");

        let body = ChatRequest {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: false,
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport_error(e, "chat completion", self.timeout))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "{} API error ({}): {}",
                self.name, status, error_text
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| map_decode_error(e, "chat completion", self.timeout))?;

        let response = self.convert_response(chat, &request.model)?;
        tracing::debug!(
            total_tokens = response.usage.total_tokens,
            "Received chat completion"
        );

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenAiClient {
        OpenAiClient::new("groq", GROQ_BASE_URL, "test-key", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_requires_api_key() {
        let result = OpenAiClient::new("groq", GROQ_BASE_URL, "  ", Duration::from_secs(5));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_completions_url() {
        let client = OpenAiClient::new(
            "openai",
            "https://api.openai.com/v1/",
            "k",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            client.completions_url(),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let request = LlmRequest::new("openai/gpt-oss-20b")
            .with_system("sys")
            .with_user("question")
            .with_temperature(0.2);
        let body = ChatRequest {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: false,
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "openai/gpt-oss-20b");
        assert_eq!(json["messages"][1]["role"], "user");
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_convert_response() {
        let raw: ChatResponse = serde_json::from_str(
            r#"{"model":"openai/gpt-oss-20b","choices":[{"index":0,"message":{"role":"assistant","content":"Dubai is a city."}}],"usage":{"prompt_tokens":20,"completion_tokens":5,"total_tokens":25}}"#,
        )
        .unwrap();

        let response = client().convert_response(raw, "fallback").unwrap();
        assert_eq!(response.content, "Dubai is a city.");
        assert_eq!(response.model, "openai/gpt-oss-20b");
        assert_eq!(response.usage.total_tokens, 25);
    }

    #[tokio::test]
    async fn test_stalled_response_body_is_timeout() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 64\r\n\r\n{\"choices\":",
                )
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let client = OpenAiClient::new(
            "groq",
            format!("http://{}", addr),
            "test-key",
            Duration::from_secs(1),
        )
        .unwrap();
        let request = LlmRequest::new("openai/gpt-oss-20b").with_user("question");

        let err = client.complete(&request).await.unwrap_err();
        assert!(matches!(err, AppError::Timeout { .. }));
    }

    #[test]
    fn test_empty_choices_is_llm_error() {
        let raw: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        let result = client().convert_response(raw, "m");
        assert!(matches!(result, Err(AppError::Llm(_))));
    }
}
