//! Gemini `generateContent` adapter. Request/response shape carried over
//! almost verbatim from the teacher's `translate/gemini.rs`, generalized to
//! the uniform `LlmClient::chat` interface.

use super::{ChatMessage, ChatParams, ChatRole, LlmClient};
use crate::error::{Result, SubgenError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Deserialize, Debug)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiError>,
}

#[derive(Deserialize, Debug)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Deserialize, Debug)]
struct GeminiResponseContent {
    parts: Option<Vec<GeminiResponsePart>>,
}

#[derive(Deserialize, Debug)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GeminiError {
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
impl LlmClient for GeminiClient {
    async fn chat(&self, messages: &[ChatMessage], params: &ChatParams) -> Result<String> {
        let system = messages
            .iter()
            .filter(|m| m.role == ChatRole::System)
            .map(|m| m.content.clone())
            .collect::<Vec<_>>()
            .join("\n\n");
        let user = messages
            .iter()
            .filter(|m| m.role == ChatRole::User)
            .map(|m| m.content.clone())
            .collect::<Vec<_>>()
            .join("\n\n");

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: user }],
            }],
            system_instruction: if system.is_empty() {
                None
            } else {
                Some(GeminiContent {
                    parts: vec![GeminiPart { text: system }],
                })
            },
            generation_config: GenerationConfig {
                temperature: params.temperature,
            },
        };

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .timeout(params.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| SubgenError::Api(format!("gemini request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SubgenError::Api(format!("failed to read gemini response: {e}")))?;

        if !status.is_success() {
            return Err(SubgenError::Api(format!(
                "gemini API error ({status}): {}",
                truncated_body(&body)
            )));
        }

        let parsed: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| SubgenError::Api(format!("failed to parse gemini response: {e}")))?;

        if let Some(error) = parsed.error {
            return Err(SubgenError::Api(format!("gemini error: {}", error.message)));
        }

        Ok(parsed
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .and_then(|p| p.into_iter().next())
            .and_then(|p| p.text)
            .unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
