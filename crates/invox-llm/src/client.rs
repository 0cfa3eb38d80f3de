//! OpenAI-compatible chat-completions client.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ServiceError;
use crate::{CompletionService, Result};

/// Default API base for the Groq OpenAI-compatible endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";

/// Default extraction model.
pub const DEFAULT_MODEL: &str = "openai/gpt-oss-120b";

/// Default request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default output token ceiling.
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Chat-completions client for an OpenAI-compatible endpoint.
///
/// Sampling is deterministic (`temperature` 0) unless overridden.
pub struct GroqClient {
    api_base: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl GroqClient {
    /// Create a client for the default endpoint and model.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: 0.0,
            client,
        })
    }

    /// Override the API base URL.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Override the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the output token ceiling.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Override the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// The configured model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, system: &str, user: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: 1.0,
        };

        debug!("requesting completion from {} ({})", url, self.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let reply: ChatResponse = response.json().await?;
        let choice = reply
            .choices
            .into_iter()
            .next()
            .ok_or(ServiceError::EmptyReply)?;

        Ok(choice.message.content.unwrap_or_default())
    }
}

impl CompletionService for GroqClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        self.chat(system, user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_defaults() {
        let client = GroqClient::new("key").unwrap();
        assert_eq!(client.api_base, DEFAULT_API_BASE);
        assert_eq!(client.model, DEFAULT_MODEL);
        assert_eq!(client.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(client.temperature, 0.0);
    }

    #[test]
    fn test_client_builders() {
        let client = GroqClient::new("key")
            .unwrap()
            .with_api_base("http://localhost:8080/v1/")
            .with_model("test-model")
            .with_max_tokens(512)
            .with_temperature(0.2);
        assert_eq!(client.api_base, "http://localhost:8080/v1/");
        assert_eq!(client.model(), "test-model");
        assert_eq!(client.max_tokens, 512);
        assert_eq!(client.temperature, 0.2);
    }

    #[tokio::test]
    async fn test_invalid_base_url_is_an_error() {
        let client = GroqClient::new("key")
            .unwrap()
            .with_api_base("not a url");
        let result = client.complete("system", "user").await;
        assert!(matches!(result, Err(ServiceError::Http(_))));
    }
}
