//! LLM provider configuration and its validation rules.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Ollama,
    OpenRouter,
    Deepseek,
    Gemini,
}

impl LlmProvider {
    pub const ALL: [LlmProvider; 4] = [
        LlmProvider::Ollama,
        LlmProvider::OpenRouter,
        LlmProvider::Deepseek,
        LlmProvider::Gemini,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LlmProvider::Ollama => "ollama",
            LlmProvider::OpenRouter => "openrouter",
            LlmProvider::Deepseek => "deepseek",
            LlmProvider::Gemini => "gemini",
        }
    }

    /// Hosted providers authenticate with an API key; Ollama runs locally.
    pub fn requires_api_key(self) -> bool {
        !matches!(self, LlmProvider::Ollama)
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ConfigError::UnknownProvider(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Provider must be one of: ollama, openrouter, deepseek, gemini (got {0:?})")]
    UnknownProvider(String),
    #[error("Model name must not be empty")]
    EmptyModel,
    #[error("API key is required for {0}")]
    MissingApiKey(LlmProvider),
    #[error("Temperature must be between 0.0 and 2.0 (got {0})")]
    TemperatureOutOfRange(f64),
    #[error("Max tokens must be between 100 and 8000 (got {0})")]
    MaxTokensOutOfRange(u32),
    #[error("KB similarity threshold must be between 0.0 and 1.0 (got {0})")]
    KbThresholdOutOfRange(f64),
    #[error("KB max documents must be between 1 and 10 (got {0})")]
    KbMaxDocsOutOfRange(u32),
    #[error("Invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

pub const TEMPERATURE_RANGE: (f64, f64) = (0.0, 2.0);
pub const MAX_TOKENS_RANGE: (u32, u32) = (100, 8000);
pub const KB_THRESHOLD_RANGE: (f64, f64) = (0.0, 1.0);
pub const KB_MAX_DOCS_RANGE: (u32, u32) = (1, 10);

pub fn check_kb_threshold(threshold: f64) -> Result<(), ConfigError> {
    if threshold.is_finite() && (KB_THRESHOLD_RANGE.0..=KB_THRESHOLD_RANGE.1).contains(&threshold)
    {
        Ok(())
    } else {
        Err(ConfigError::KbThresholdOutOfRange(threshold))
    }
}

pub fn check_kb_max_docs(max_docs: u32) -> Result<(), ConfigError> {
    if (KB_MAX_DOCS_RANGE.0..=KB_MAX_DOCS_RANGE.1).contains(&max_docs) {
        Ok(())
    } else {
        Err(ConfigError::KbMaxDocsOutOfRange(max_docs))
    }
}

/// Settings the backend uses to reach an LLM. Field names match the
/// backend's configuration schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(alias = "llm_provider")]
    pub provider: LlmProvider,
    #[serde(alias = "model_name", alias = "modelName")]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub temperature: f64,
    #[serde(alias = "maxTokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub kb_enabled: bool,
    #[serde(default = "default_kb_threshold")]
    pub kb_threshold: f64,
    #[serde(default = "default_kb_max_docs")]
    pub kb_max_docs: u32,
}

fn default_kb_threshold() -> f64 {
    0.7
}

fn default_kb_max_docs() -> u32 {
    5
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Ollama,
            model: "llama2".to_string(),
            base_url: None,
            api_key: None,
            temperature: 0.7,
            max_tokens: 2048,
            kb_enabled: false,
            kb_threshold: default_kb_threshold(),
            kb_max_docs: default_kb_max_docs(),
        }
    }
}

impl LlmConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel);
        }
        let has_key = self
            .api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty());
        if self.provider.requires_api_key() && !has_key {
            return Err(ConfigError::MissingApiKey(self.provider));
        }
        if !self.temperature.is_finite()
            || !(TEMPERATURE_RANGE.0..=TEMPERATURE_RANGE.1).contains(&self.temperature)
        {
            return Err(ConfigError::TemperatureOutOfRange(self.temperature));
        }
        if !(MAX_TOKENS_RANGE.0..=MAX_TOKENS_RANGE.1).contains(&self.max_tokens) {
            return Err(ConfigError::MaxTokensOutOfRange(self.max_tokens));
        }
        check_kb_threshold(self.kb_threshold)?;
        check_kb_max_docs(self.kb_max_docs)?;
        if let Some(base_url) = self.base_url.as_deref() {
            url::Url::parse(base_url).map_err(|err| ConfigError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: err.to_string(),
            })?;
        }
        Ok(())
    }

    /// API key suitable for display: last four characters only.
    pub fn masked_api_key(&self) -> Option<String> {
        let key = self.api_key.as_deref()?;
        let chars: Vec<char> = key.chars().collect();
        if chars.len() <= 4 {
            return Some("****".to_string());
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        Some(format!("****{tail}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(LlmConfig::default().validate(), Ok(()));
    }

    #[test]
    fn cloud_providers_need_api_key() {
        let mut config = LlmConfig {
            provider: LlmProvider::Gemini,
            ..LlmConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::MissingApiKey(LlmProvider::Gemini))
        );
        config.api_key = Some("   ".to_string());
        assert!(config.validate().is_err());
        config.api_key = Some("sk-1234567".to_string());
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.masked_api_key().as_deref(), Some("****4567"));
    }

    #[test]
    fn numeric_ranges_are_enforced() {
        let config = LlmConfig {
            temperature: 2.5,
            ..LlmConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::TemperatureOutOfRange(2.5)));

        let config = LlmConfig {
            max_tokens: 50,
            ..LlmConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::MaxTokensOutOfRange(50)));

        let config = LlmConfig {
            kb_max_docs: 11,
            ..LlmConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::KbMaxDocsOutOfRange(11)));
    }

    #[test]
    fn base_url_must_parse() {
        let config = LlmConfig {
            base_url: Some("not a url".to_string()),
            ..LlmConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn provider_parsing_is_case_insensitive() {
        assert_eq!("OpenRouter".parse::<LlmProvider>(), Ok(LlmProvider::OpenRouter));
        assert!("claude".parse::<LlmProvider>().is_err());
    }

    #[test]
    fn decodes_dashboard_field_names() {
        let config: LlmConfig = serde_json::from_str(
            r#"{"provider":"ollama","model_name":"llama2","temperature":0.7,"max_tokens":2048}"#,
        )
        .unwrap();
        assert_eq!(config, LlmConfig::default());
    }
}
