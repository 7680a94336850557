use crate::error::{Result, SubgenError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Srt,
    Vtt,
    Ass,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Srt => write!(f, "srt"),
            OutputFormat::Vtt => write!(f, "vtt"),
            OutputFormat::Ass => write!(f, "ass"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "srt" => Ok(OutputFormat::Srt),
            "vtt" => Ok(OutputFormat::Vtt),
            "ass" => Ok(OutputFormat::Ass),
            _ => Err(format!("Unknown format: {s}. Use 'srt', 'vtt', or 'ass'")),
        }
    }
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Srt => "srt",
            OutputFormat::Vtt => "vtt",
            OutputFormat::Ass => "ass",
        }
    }
}

/// Recognizer provider selector. `Cloud` covers any HTTP cloud ASR endpoint
/// (OpenAI-compatible or Gemini); `Binary` spawns a local recognizer process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecognizerKind {
    Cloud,
    Binary,
}

/// LLM provider selector shared by translation and proofreading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Openai,
    Gemini,
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperSection {
    #[serde(default = "default_recognizer_kind")]
    pub kind: RecognizerKind,
    pub model: Option<String>,
    pub binary_path: Option<PathBuf>,
}

fn default_recognizer_kind() -> RecognizerKind {
    RecognizerKind::Cloud
}

impl Default for WhisperSection {
    fn default() -> Self {
        Self {
            kind: default_recognizer_kind(),
            model: None,
            binary_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationSection {
    #[serde(default = "default_llm_provider")]
    pub provider: LlmProvider,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    #[serde(default)]
    pub sentence_aware: bool,
}

fn default_llm_provider() -> LlmProvider {
    LlmProvider::Gemini
}

impl Default for TranslationSection {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: None,
            api_key: None,
            base_url: None,
            sentence_aware: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSection {
    pub default_format: OutputFormat,
    #[serde(default)]
    pub bilingual: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StylesSection {
    pub default_preset: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedSection {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Deprecated alias for `translation.api_key`, kept for backward compatibility.
    pub llm_api_key: Option<String>,
}

fn default_concurrency() -> usize {
    4
}

impl Default for AdvancedSection {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            llm_api_key: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub whisper: WhisperSection,
    #[serde(default)]
    pub translation: TranslationSection,
    #[serde(default)]
    pub output: OutputSection,
    #[serde(default)]
    pub styles: StylesSection,
    #[serde(default)]
    pub advanced: AdvancedSection,
}

impl Config {
    /// Load config from `~/.subgen/config.yaml`, falling back to defaults if
    /// the file is absent, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                config = serde_yaml::from_str(&contents).map_err(|e| {
                    SubgenError::Config(format!("{}: {e}", config_path.display()))
                })?;
            }
        }

        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            config.translation.api_key.get_or_insert(key);
        }
        if let Ok(key) = std::env::var("SUBGEN_API_KEY") {
            config.translation.api_key = Some(key);
        }
        if let Ok(format) = std::env::var("SUBGEN_DEFAULT_FORMAT") {
            if let Ok(f) = format.parse() {
                config.output.default_format = f;
            }
        }
        if let Ok(concurrency) = std::env::var("SUBGEN_CONCURRENCY") {
            if let Ok(c) = concurrency.parse() {
                config.advanced.concurrency = c;
            }
        }

        if config.translation.api_key.is_none() {
            if let Some(legacy) = config.advanced.llm_api_key.clone() {
                tracing::warn!("llm.* config keys are deprecated, use translation.*");
                config.translation.api_key = Some(legacy);
            }
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.advanced.concurrency == 0 {
            return Err(SubgenError::Config(
                "advanced.concurrency must be greater than 0".to_string(),
            ));
        }

        if let Some(base_url) = &self.translation.base_url {
            url::Url::parse(base_url).map_err(|e| {
                SubgenError::Config(format!("translation.base_url: {e}"))
            })?;
        }

        Ok(())
    }

    /// Root of SubGen's persisted state: `~/.subgen/`.
    pub fn data_root() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".subgen")
    }

    fn config_file_path() -> Option<PathBuf> {
        Some(Self::data_root().join("config.yaml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!("srt".parse::<OutputFormat>().unwrap(), OutputFormat::Srt);
        assert_eq!("vtt".parse::<OutputFormat>().unwrap(), OutputFormat::Vtt);
        assert_eq!("ass".parse::<OutputFormat>().unwrap(), OutputFormat::Ass);
        assert!("txt".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_format_extension() {
        assert_eq!(OutputFormat::Srt.extension(), "srt");
        assert_eq!(OutputFormat::Vtt.extension(), "vtt");
        assert_eq!(OutputFormat::Ass.extension(), "ass");
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.output.default_format, OutputFormat::Srt);
        assert_eq!(config.advanced.concurrency, 4);
    }

    #[test]
    fn test_validate_zero_concurrency() {
        let mut config = Config::default();
        config.advanced.concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_legacy_llm_api_key_alias() {
        let yaml = "advanced:\n  llm_api_key: legacy-key\n";
        let mut config: Config = serde_yaml::from_str(yaml).unwrap();
        if config.translation.api_key.is_none() {
            config.translation.api_key = config.advanced.llm_api_key.clone();
        }
        assert_eq!(config.translation.api_key.as_deref(), Some("legacy-key"));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let mut config = Config::default();
        config.translation.base_url = Some("not-a-url".to_string());
        assert!(config.validate().is_err());
    }
}
