//! OpenAI-compatible chat-completions client implementing `LanguageModel`.
//!
//! Performs a single request per call and classifies failures; retrying is
//! the scorer's job.

use crate::config::toml_config::ScoringConfig;
use crate::core::{LanguageModel, ModelError, Prompt};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

pub struct OpenAiModel {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
}

impl OpenAiModel {
    pub fn new(api_key: String, config: &ScoringConfig) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            top_p: config.top_p,
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    async fn complete(&self, prompt: &Prompt) -> Result<String, ModelError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.profile_context,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.listing,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: self.top_p,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout
                } else {
                    ModelError::Http(e)
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ModelError::RateLimited {
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(if status.is_server_error() {
                ModelError::Unavailable {
                    status: status.as_u16(),
                    message,
                }
            } else {
                ModelError::Api {
                    status: status.as_u16(),
                    message,
                }
            });
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ModelError::Timeout
            } else {
                ModelError::Http(e)
            }
        })?;
        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| ModelError::Malformed(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(ModelError::EmptyContent)?;

        tracing::debug!(reply = %content, "Model reply received");
        Ok(content)
    }
}
