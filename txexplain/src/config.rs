//! Explainer configuration.
//!
//! Every field has a serde default, so a partial JSON document (or `{}`)
//! yields a working configuration.

use crate::cache::CacheConfig;
use crate::errors::{ExplainerError, LlmError};
use crate::observability::LoggingConfig;
use crate::pipeline::PipelineConfig;
use serde::{Deserialize, Serialize};

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_max_tool_rounds() -> usize {
    1
}

fn default_explorer_fallback() -> String {
    "https://etherscan.io".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_timeout_seconds() -> u64 {
    60
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplainerConfig {
    /// Chat model id.
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Output token cap per model turn.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Tool-calling rounds allowed before the model's content is final.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
    /// Reject dependencies on unregistered stages.
    #[serde(default)]
    pub strict_dependencies: bool,
    /// LLM transport settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Cache TTLs.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Explorer used for links when the network is unknown.
    #[serde(default = "default_explorer_fallback")]
    pub explorer_fallback: String,
    /// Log filter and format.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for ExplainerConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_tool_rounds: default_max_tool_rounds(),
            strict_dependencies: false,
            llm: LlmConfig::default(),
            cache: CacheConfig::default(),
            explorer_fallback: default_explorer_fallback(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ExplainerConfig {
    /// Parses a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ExplainerError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the number of tool-calling rounds.
    #[must_use]
    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    /// Enables or disables strict dependency checking.
    #[must_use]
    pub fn with_strict_dependencies(mut self, strict: bool) -> Self {
        self.strict_dependencies = strict;
        self
    }

    /// Sets the LLM transport settings.
    #[must_use]
    pub fn with_llm(mut self, llm: LlmConfig) -> Self {
        self.llm = llm;
        self
    }

    /// Engine options derived from this configuration.
    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            strict_dependencies: self.strict_dependencies,
        }
    }
}

/// LLM transport settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API base URL, without `/chat/completions`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Inline API key. Prefer `api_key_env`.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Per-request timeout.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            api_key_env: default_api_key_env(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl LlmConfig {
    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets an inline API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Returns the inline key, else the key from `api_key_env`.
    pub fn resolve_api_key(&self) -> Result<String, LlmError> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LlmError::AuthFailed {
                provider: format!("env var '{}' not set", self.api_key_env),
            })
    }
}
