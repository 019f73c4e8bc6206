//! Configuration types for multi-provider support.
//!
//! This module provides types for defining multiple named model providers
//! in configuration files.

use crate::llm::{ModelConfig, ModelError, Provider, ReasoningEffort};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Root configuration structure for acton-model.
///
/// This structure maps directly to the TOML configuration file format:
///
/// ```toml
/// default_provider = "glm"
///
/// [providers.claude]
/// type = "anthropic"
/// model = "claude-sonnet-4-5"
/// reasoning_effort = "medium"
///
/// [providers.glm]
/// type = "zai"
/// model = "glm-5"
/// thinking_type = "enabled"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelFileConfig {
    /// The name of the provider to use when none is specified.
    ///
    /// If not set and only one provider is defined, that provider
    /// becomes the default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<String>,

    /// Named provider configurations, keyed by a name of the user's choosing.
    #[serde(default)]
    pub providers: BTreeMap<String, NamedModelConfig>,
}

impl ModelFileConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named provider to the configuration.
    #[must_use]
    pub fn with_provider(mut self, name: impl Into<String>, config: NamedModelConfig) -> Self {
        self.providers.insert(name.into(), config);
        self
    }

    /// Sets the default provider name.
    #[must_use]
    pub fn with_default_provider(mut self, name: impl Into<String>) -> Self {
        self.default_provider = Some(name.into());
        self
    }

    /// Returns the effective default provider name.
    ///
    /// Returns the explicitly set default, or if exactly one provider
    /// is defined, returns that provider's name.
    #[must_use]
    pub fn effective_default(&self) -> Option<&str> {
        if let Some(ref name) = self.default_provider {
            return Some(name.as_str());
        }

        if self.providers.len() == 1 {
            return self.providers.keys().next().map(String::as_str);
        }

        None
    }

    /// Returns true if the configuration has no providers defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Builds the runtime configuration for `name`, or for the default
    /// provider when `name` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an invalid-config error if the provider does not exist, no
    /// default can be chosen, or the provider's settings are invalid.
    pub fn model_config(&self, name: Option<&str>) -> Result<ModelConfig, ModelError> {
        let name = match name.or_else(|| self.effective_default()) {
            Some(name) => name,
            None => {
                return Err(ModelError::invalid_config(
                    "default_provider",
                    "several providers are defined; set default_provider or pick one by name",
                ))
            }
        };
        let named = self.providers.get(name).ok_or_else(|| {
            ModelError::invalid_config(
                "providers",
                format!("no provider named '{}' is configured", name),
            )
        })?;
        named.to_model_config()
    }
}

/// Configuration for a single named provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedModelConfig {
    /// The provider tag: "openai", "anthropic", "openrouter", "zai",
    /// "ollama", or any other tag for an OpenAI-compatible server.
    #[serde(rename = "type")]
    pub provider_type: String,

    /// The model to use (e.g., "claude-sonnet-4-5", "gpt-5.2", "glm-5").
    pub model: String,

    /// Direct API key value (discouraged - use api_key_env instead).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Custom base URL for the API.
    ///
    /// Required for custom OpenAI-compatible endpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// "low", "medium" or "high".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,

    /// OpenAI-compatible `thinking.type` (e.g., "enabled").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_type: Option<String>,

    /// Maximum tokens to generate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Time-to-first-byte timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_byte_timeout_secs: Option<u64>,

    /// Total stream timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_timeout_secs: Option<u64>,

    /// Transient retry limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// Whether to stream responses. Defaults to true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

impl NamedModelConfig {
    /// Creates a configuration for `provider_type` and `model` with
    /// everything else defaulted.
    #[must_use]
    pub fn new(provider_type: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider_type: provider_type.into(),
            model: model.into(),
            api_key: None,
            api_key_env: None,
            base_url: None,
            reasoning_effort: None,
            thinking_type: None,
            max_tokens: None,
            temperature: None,
            first_byte_timeout_secs: None,
            stream_timeout_secs: None,
            max_retries: None,
            stream: None,
        }
    }

    /// Creates a new Anthropic provider configuration.
    #[must_use]
    pub fn anthropic(model: impl Into<String>) -> Self {
        Self::new("anthropic", model).with_api_key_env("ANTHROPIC_API_KEY")
    }

    /// Creates a new OpenAI provider configuration.
    #[must_use]
    pub fn openai(model: impl Into<String>) -> Self {
        Self::new("openai", model).with_api_key_env("OPENAI_API_KEY")
    }

    /// Creates a new Z.ai provider configuration.
    #[must_use]
    pub fn zai(model: impl Into<String>) -> Self {
        Self::new("zai", model).with_api_key_env("ZAI_API_KEY")
    }

    /// Creates a new Ollama provider configuration.
    #[must_use]
    pub fn ollama(model: impl Into<String>) -> Self {
        Self::new("ollama", model).with_base_url("http://localhost:11434/v1")
    }

    /// Sets the API key environment variable.
    #[must_use]
    pub fn with_api_key_env(mut self, env_var: impl Into<String>) -> Self {
        self.api_key_env = Some(env_var.into());
        self
    }

    /// Sets a direct API key (discouraged).
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the reasoning effort.
    #[must_use]
    pub fn with_reasoning_effort(mut self, effort: impl Into<String>) -> Self {
        self.reasoning_effort = Some(effort.into());
        self
    }

    /// Sets the maximum tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    /// Resolves the API key from environment or direct value.
    ///
    /// Resolution order:
    /// 1. `api_key_env` - read from environment variable
    /// 2. The provider's standard env var (ANTHROPIC_API_KEY, ZAI_API_KEY, ...)
    /// 3. `api_key` - direct value in config (discouraged)
    /// 4. Empty string (for Ollama/local providers)
    #[must_use]
    pub fn resolve_api_key(&self) -> String {
        let standard_env = Provider::from_tag(&self.provider_type).api_key_env();
        let from_env = self
            .api_key_env
            .as_deref()
            .into_iter()
            .chain(standard_env)
            .find_map(|var| std::env::var(var).ok().filter(|key| !key.is_empty()));

        from_env
            .or_else(|| self.api_key.clone())
            .unwrap_or_default()
    }

    /// Converts this file configuration to a runtime [`ModelConfig`].
    ///
    /// This resolves environment variables and applies defaults.
    ///
    /// # Errors
    ///
    /// Returns an invalid-config error for an unknown reasoning effort or a
    /// configuration that fails validation.
    pub fn to_model_config(&self) -> Result<ModelConfig, ModelError> {
        let provider = Provider::from_tag(&self.provider_type);
        let mut config = ModelConfig::new(provider, &self.model, self.resolve_api_key());

        if let Some(ref url) = self.base_url {
            config = config.with_base_url(url);
        }
        if let Some(ref effort) = self.reasoning_effort {
            config = config.with_reasoning_effort(effort.parse::<ReasoningEffort>()?);
        }
        if let Some(ref thinking_type) = self.thinking_type {
            config = config.with_thinking_type(thinking_type);
        }
        if let Some(tokens) = self.max_tokens {
            config = config.with_max_tokens(tokens);
        }
        if let Some(temperature) = self.temperature {
            config = config.with_temperature(temperature);
        }
        if let Some(secs) = self.first_byte_timeout_secs {
            config = config.with_first_byte_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.stream_timeout_secs {
            config = config.with_stream_timeout(Duration::from_secs(secs));
        }
        if let Some(retries) = self.max_retries {
            config = config.with_max_retries(retries);
        }
        if let Some(stream) = self.stream {
            config = config.with_streaming(stream);
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_file_config_default_is_empty() {
        let config = ModelFileConfig::default();
        assert!(config.is_empty());
        assert!(config.default_provider.is_none());
    }

    #[test]
    fn effective_default_single_provider() {
        let config =
            ModelFileConfig::new().with_provider("local", NamedModelConfig::ollama("qwen2.5:7b"));

        assert_eq!(config.effective_default(), Some("local"));
    }

    #[test]
    fn effective_default_explicit() {
        let config = ModelFileConfig::new()
            .with_provider("local", NamedModelConfig::ollama("qwen2.5:7b"))
            .with_provider("claude", NamedModelConfig::anthropic("claude-sonnet-4-5"))
            .with_default_provider("claude");

        assert_eq!(config.effective_default(), Some("claude"));
    }

    #[test]
    fn effective_default_multiple_no_explicit() {
        let config = ModelFileConfig::new()
            .with_provider("local", NamedModelConfig::ollama("qwen2.5:7b"))
            .with_provider("claude", NamedModelConfig::anthropic("claude-sonnet-4-5"));

        assert!(config.effective_default().is_none());
        assert!(config.model_config(None).unwrap_err().is_configuration());
    }

    #[test]
    fn model_config_unknown_name_is_error() {
        let config =
            ModelFileConfig::new().with_provider("local", NamedModelConfig::ollama("qwen2.5:7b"));

        let err = config.model_config(Some("missing")).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn to_model_config_applies_overrides() {
        let mut named = NamedModelConfig::new("vllm", "qwen3")
            .with_api_key("direct-key")
            .with_base_url("http://gpu-box:8000/v1")
            .with_reasoning_effort("HIGH")
            .with_max_tokens(2048);
        named.first_byte_timeout_secs = Some(30);
        named.max_retries = Some(1);
        named.stream = Some(false);

        let config = named.to_model_config().unwrap();

        assert_eq!(config.provider, Provider::Custom("vllm".to_string()));
        assert_eq!(config.api_key, "direct-key");
        assert_eq!(config.base_url, "http://gpu-box:8000/v1");
        assert_eq!(config.reasoning_effort, Some(ReasoningEffort::High));
        assert_eq!(config.max_tokens, Some(2048));
        assert_eq!(config.first_byte_timeout, Duration::from_secs(30));
        assert_eq!(config.retry.max_retries, 1);
        assert!(!config.stream);
    }

    #[test]
    fn to_model_config_uses_provider_default_url() {
        let config = NamedModelConfig::zai("glm-5").to_model_config().unwrap();
        assert_eq!(config.base_url, "https://api.z.ai/api/coding/paas/v4");
    }

    #[test]
    fn to_model_config_rejects_unknown_effort() {
        let err = NamedModelConfig::ollama("m")
            .with_reasoning_effort("maximum")
            .to_model_config()
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn custom_provider_without_base_url_is_rejected() {
        assert!(NamedModelConfig::new("mystery", "m").to_model_config().is_err());
    }

    #[test]
    fn resolve_api_key_falls_back_to_direct_value() {
        let config = NamedModelConfig::new("vllm", "m")
            .with_api_key_env("ACTON_MODEL_TEST_UNSET_KEY_VAR")
            .with_api_key("direct-key");

        assert_eq!(config.resolve_api_key(), "direct-key");
    }

    #[test]
    fn config_serialization_roundtrip() {
        let config = ModelFileConfig::new()
            .with_provider("glm", NamedModelConfig::zai("glm-5"))
            .with_default_provider("glm");

        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: ModelFileConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(deserialized, config);
    }
}
