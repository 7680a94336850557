//! Minimal local Ollama adapter (`/api/chat`). No authentication; the host
//! is validated as `http[s]://` at construction time (see `create_client`).

use super::{ChatMessage, ChatParams, ChatRole, LlmClient};
use crate::error::{Result, SubgenError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub struct OllamaClient {
    client: reqwest::Client,
    model: String,
    base_url: String,
}

impl OllamaClient {
    pub fn new(model: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            model,
            base_url,
        }
    }
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<WireMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct OllamaResponse {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

fn truncated_body(body: &str) -> &str {
    let limit = 1024;
    if body.len() <= limit {
        body
    } else {
        &body[..limit]
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn chat(&self, messages: &[ChatMessage], params: &ChatParams) -> Result<String> {
        let wire_messages = messages
            .iter()
            .map(|m| WireMessage {
                role: match m.role {
                    ChatRole::System => "system",
                    ChatRole::User => "user",
                },
                content: m.content.clone(),
            })
            .collect();

        let request = OllamaRequest {
            model: self.model.clone(),
            messages: wire_messages,
            stream: false,
            options: OllamaOptions {
                temperature: params.temperature,
            },
        };

        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .timeout(params.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| SubgenError::Api(format!("ollama request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SubgenError::Api(format!("failed to read ollama response: {e}")))?;

        if !status.is_success() {
            return Err(SubgenError::Api(format!(
                "ollama API error ({status}): {}",
                truncated_body(&body)
            )));
        }

        let parsed: OllamaResponse = serde_json::from_str(&body)
            .map_err(|e| SubgenError::Api(format!("failed to parse ollama response: {e}")))?;

        Ok(parsed.message.content)
    }

    fn name(&self) -> &'static str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn requires_auth(&self) -> bool {
        false
    }
}
