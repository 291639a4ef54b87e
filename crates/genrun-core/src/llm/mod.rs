//! Model backend abstractions and the OpenAI-compatible client.
//!
//! The backend is an opaque prompt-to-text collaborator behind the
//! `CompletionProvider` trait, so orchestration logic never depends on a
//! concrete provider and tests can substitute a mock.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::errors::AgentError;

pub mod extractor;
pub mod prompts;

pub use extractor::extract_code_files;

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// One round trip: system + user prompt in, completion text out.
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: &str,
    ) -> Result<String, AgentError>;
}

/// Client for any OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    api_base: String,
}

impl OpenAiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_base: "https://api.openai.com/v1".to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: String) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: &str,
    ) -> Result<String, AgentError> {
        let body = json!({
            "model": model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt },
            ],
        });

        let url = format!("{}/chat/completions", self.api_base);
        log::debug!("requesting completion from {} with model {}", url, model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AgentError::Llm(format!(
                "completion request failed with HTTP {}: {}",
                status, detail
            )));
        }

        let payload: Value = response.json().await?;
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                AgentError::Llm("completion response has no message content".to_string())
            })?;

        if content.is_empty() {
            return Err(AgentError::Llm("completion returned empty content".to_string()));
        }

        Ok(content.to_string())
    }
}
