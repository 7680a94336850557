//! OpenAI-compatible chat-completions adapter. Same HTTP-JSON shape as the
//! teacher's Whisper multipart client, but a plain JSON POST since chat
//! completions carry no binary payload. Also usable against any
//! OpenAI-compatible cloud recognizer host via `base_url`.

use super::{ChatMessage, ChatParams, ChatRole, LlmClient};
use crate::error::{Result, SubgenError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
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
impl LlmClient for OpenAiClient {
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

        let request = ChatRequest {
            model: self.model.clone(),
            messages: wire_messages,
            temperature: params.temperature,
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .timeout(params.timeout)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| SubgenError::Api(format!("openai request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SubgenError::Api(format!("failed to read openai response: {e}")))?;

        if !status.is_success() {
            if let Ok(api_error) = serde_json::from_str::<ApiErrorBody>(&body) {
                return Err(SubgenError::Api(format!(
                    "openai API error ({status}): {}",
                    truncated_body(&api_error.error.message)
                )));
            }
            return Err(SubgenError::Api(format!(
                "openai API error ({status}): {}",
                truncated_body(&body)
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| SubgenError::Api(format!("failed to parse openai response: {e}")))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_reports_model_and_name() {
        let client = OpenAiClient::new(
            "key".to_string(),
            "gpt-4o-mini".to_string(),
            "https://api.openai.com/v1".to_string(),
        );
        assert_eq!(client.name(), "openai");
        assert_eq!(client.model(), "gpt-4o-mini");
    }
}
