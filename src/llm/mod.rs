//! LLM Client Contract: a uniform `Chat` interface over whichever provider
//! the config selects, plus the credential resolver shared by translation
//! and proofreading. Grounded in the teacher's `translate/gemini.rs` and
//! `transcribe/gemini.rs` HTTP-JSON request/response plumbing, generalized
//! behind one trait so `translate::batch` and `proofread` never depend on a
//! concrete provider.

pub mod credentials;
pub mod gemini;
pub mod ollama;
pub mod openai;
pub mod response;

use crate::config::{Config, LlmProvider};
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// One turn in a chat-completion request. `system` carries rules/instructions,
/// `user` carries the batch payload; providers that don't distinguish roles
/// (e.g. a bare completion API) concatenate them in `role` order.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    System,
    User,
}

#[derive(Debug, Clone)]
pub struct ChatParams {
    /// Deterministic by default, per §4.8 (0.0-0.3 range).
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for ChatParams {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Uniform provider adapter: `Chat`, `Name`, `Model`, `RequiresAuth`.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat(&self, messages: &[ChatMessage], params: &ChatParams) -> Result<String>;
    fn name(&self) -> &'static str;
    fn model(&self) -> &str;
    fn requires_auth(&self) -> bool {
        true
    }
}

/// Build the configured LLM client, resolving its credential through
/// `credentials::resolve` and validating `base_url`/host as `http[s]://`.
pub fn create_client(config: &Config, explicit_api_key: Option<&str>) -> Result<Box<dyn LlmClient>> {
    let api_key = credentials::resolve(
        explicit_api_key,
        credentials::env_var_for(config.translation.provider),
        config.translation.api_key.as_deref(),
    )?;

    match config.translation.provider {
        LlmProvider::Gemini => {
            let model = config
                .translation
                .model
                .clone()
                .unwrap_or_else(|| "gemini-2.0-flash".to_string());
            Ok(Box::new(gemini::GeminiClient::new(api_key, model)))
        }
        LlmProvider::Openai => {
            let model = config
                .translation
                .model
                .clone()
                .unwrap_or_else(|| "gpt-4o-mini".to_string());
            let base_url = config
                .translation
                .base_url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
            credentials::validate_http_url(&base_url)?;
            Ok(Box::new(openai::OpenAiClient::new(api_key, model, base_url)))
        }
        LlmProvider::Ollama => {
            let model = config
                .translation
                .model
                .clone()
                .unwrap_or_else(|| "llama3".to_string());
            let base_url = config
                .translation
                .base_url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string());
            credentials::validate_http_url(&base_url)?;
            Ok(Box::new(ollama::OllamaClient::new(model, base_url)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client_defaults_gemini_model() {
        let mut config = Config::default();
        config.translation.api_key = Some("key".to_string());
        let client = create_client(&config, None).unwrap();
        assert_eq!(client.name(), "gemini");
        assert_eq!(client.model(), "gemini-2.0-flash");
    }

    #[test]
    fn test_create_client_rejects_bad_ollama_host() {
        let mut config = Config::default();
        config.translation.provider = LlmProvider::Ollama;
        config.translation.base_url = Some("not-a-url".to_string());
        assert!(create_client(&config, None).is_err());
    }
}
