//! Credential resolver: explicit argument > environment variable > secure
//! store > config file (§4.8). "Secure store" has no OS keychain crate in
//! the pack's dependency set, so it is a small trait object with a
//! file-backed default implementation, permissioned owner-only at creation
//! (never chmod-after-write, per §5's shared-resources rule).

use crate::config::LlmProvider;
use crate::error::{Result, SubgenError};
use std::path::PathBuf;

/// Resolve a credential using the documented priority order. `env_var` and
/// `config_value` are looked up only if the higher-priority source is absent.
pub fn resolve(
    explicit: Option<&str>,
    env_var: &str,
    config_value: Option<&str>,
) -> Result<String> {
    if let Some(v) = explicit {
        if !v.trim().is_empty() {
            return Ok(v.to_string());
        }
    }
    if let Ok(v) = std::env::var(env_var) {
        if !v.trim().is_empty() {
            return Ok(v);
        }
    }
    if let Some(store) = FileCredentialStore::default_path() {
        if let Ok(Some(v)) = FileCredentialStore::new(store).get(env_var) {
            return Ok(v);
        }
    }
    if let Some(v) = config_value {
        if !v.trim().is_empty() {
            return Ok(v.to_string());
        }
    }
    Err(SubgenError::Credential(format!(
        "no credential found (checked explicit argument, ${env_var}, secure store, config file)"
    )))
}

pub fn env_var_for(provider: LlmProvider) -> &'static str {
    match provider {
        LlmProvider::Gemini => "GEMINI_API_KEY",
        LlmProvider::Openai => "OPENAI_API_KEY",
        LlmProvider::Ollama => "OLLAMA_API_KEY",
    }
}

/// Validate a provider `base_url`/Ollama host as an `http[s]://` URL before
/// any network use, per §4.8.
pub fn validate_http_url(raw: &str) -> Result<()> {
    let parsed = url::Url::parse(raw).map_err(|e| SubgenError::Credential(format!("invalid URL: {e}")))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(SubgenError::Credential(format!(
            "URL must use http:// or https://: {raw}"
        )));
    }
    Ok(())
}

/// Minimal trait for a credential backing store, so a future OS-keychain
/// implementation can replace `FileCredentialStore` without touching
/// `resolve`'s priority chain.
pub trait CredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// `~/.subgen/credentials.json`, owner-only permissions from creation.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_path() -> Option<PathBuf> {
        Some(crate::config::Config::data_root().join("credentials.json"))
    }

    fn load(&self) -> Result<std::collections::HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(std::collections::HashMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents).unwrap_or_default())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self.load()?;
        map.insert(key.to_string(), value.to_string());
        let json = serde_json::to_string_pretty(&map)?;
        crate::fsutil::atomic_write_owner_only(&self.path, json.as_bytes())?;
        Ok(())
    }
}
