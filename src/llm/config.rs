//! Model client configuration.
//!
//! [`ModelConfig`] is the request configuration shared by every `complete()`
//! call a model makes: which vendor and model to talk to, the credential,
//! reasoning settings, timeouts, retry limits and the two optional callbacks.

use crate::llm::error::ModelError;
use crate::llm::streaming::DeltaKind;
use crate::messages::ToolDefinition;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// `max_tokens` sent to Anthropic when none is configured. Must stay above
/// the largest thinking budget.
pub const DEFAULT_ANTHROPIC_MAX_TOKENS: u32 = 32_000;

/// The wire protocol a provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderFamily {
    /// `/chat/completions` with role/content messages
    OpenAICompatible,
    /// `/messages` with a separate system prompt
    Anthropic,
}

/// A known provider, or a custom OpenAI-compatible one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Provider {
    /// api.openai.com
    OpenAI,
    /// api.anthropic.com
    Anthropic,
    /// openrouter.ai
    OpenRouter,
    /// api.z.ai
    Zai,
    /// A local Ollama server
    Ollama,
    /// Any other OpenAI-compatible endpoint, by tag
    Custom(String),
}

impl Provider {
    /// Resolves a provider tag such as `"openai"` or `"zai"`.
    ///
    /// Unknown tags become [`Provider::Custom`] and are treated as
    /// OpenAI-compatible.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "openai" => Self::OpenAI,
            "anthropic" => Self::Anthropic,
            "openrouter" => Self::OpenRouter,
            "zai" => Self::Zai,
            "ollama" => Self::Ollama,
            other => Self::Custom(other.to_string()),
        }
    }

    /// The provider's tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::OpenRouter => "openrouter",
            Self::Zai => "zai",
            Self::Ollama => "ollama",
            Self::Custom(tag) => tag,
        }
    }

    /// The wire protocol this provider speaks.
    #[must_use]
    pub fn family(&self) -> ProviderFamily {
        match self {
            Self::Anthropic => ProviderFamily::Anthropic,
            _ => ProviderFamily::OpenAICompatible,
        }
    }

    /// Base URL used when the configuration does not name one.
    #[must_use]
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            Self::OpenAI => Some("https://api.openai.com/v1"),
            Self::Anthropic => Some("https://api.anthropic.com/v1"),
            Self::OpenRouter => Some("https://openrouter.ai/api/v1"),
            Self::Zai => Some("https://api.z.ai/api/coding/paas/v4"),
            Self::Ollama => Some("http://localhost:11434/v1"),
            Self::Custom(_) => None,
        }
    }

    /// The conventional environment variable holding this provider's key.
    #[must_use]
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::OpenAI => Some("OPENAI_API_KEY"),
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::OpenRouter => Some("OPENROUTER_API_KEY"),
            Self::Zai => Some("ZAI_API_KEY"),
            Self::Ollama | Self::Custom(_) => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// How hard a reasoning model should think.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    /// Fast, shallow reasoning
    Low,
    /// The vendor default for most models
    Medium,
    /// Deep reasoning
    High,
}

impl ReasoningEffort {
    /// The level as the vendors spell it.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Anthropic manual-thinking budget for this level.
    #[must_use]
    pub fn thinking_budget(self) -> u32 {
        match self {
            Self::Low => 1024,
            Self::Medium => 4096,
            Self::High => 16_384,
        }
    }
}

impl FromStr for ReasoningEffort {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(ModelError::invalid_config(
                "reasoning_effort",
                format!("unknown level '{}'; expected low, medium or high", other),
            )),
        }
    }
}

impl fmt::Display for ReasoningEffort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network-layer retry configuration for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial backoff duration
    pub initial_backoff: Duration,
    /// Maximum backoff duration
    pub max_backoff: Duration,
    /// Backoff multiplier (exponential factor)
    pub backoff_multiplier: u32,
}

impl RetryConfig {
    /// Creates a new retry configuration.
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Disables retries.
    #[must_use]
    pub fn no_retries() -> Self {
        Self::new(0)
    }

    /// Sets the initial backoff duration.
    #[must_use]
    pub fn with_initial_backoff(mut self, duration: Duration) -> Self {
        self.initial_backoff = duration;
        self
    }

    /// Sets the maximum backoff duration.
    #[must_use]
    pub fn with_max_backoff(mut self, duration: Duration) -> Self {
        self.max_backoff = duration;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: u32) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Calculates the backoff duration before a given attempt.
    ///
    /// Attempt 0 is the first request and never waits.
    #[must_use]
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let multiplier = self.backoff_multiplier.saturating_pow(attempt - 1);
        let backoff = self.initial_backoff.saturating_mul(multiplier);

        backoff.min(self.max_backoff)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
            backoff_multiplier: 2,
        }
    }
}

/// Callback receiving each streamed fragment.
pub type ContentDeltaFn = Arc<dyn Fn(DeltaKind, &str) + Send + Sync>;

/// Callback receiving a replacement base URL that should be saved.
pub type BaseUrlPersistFn = Arc<dyn Fn(&str) + Send + Sync>;

/// The optional caller hooks. Both are fire-and-forget.
#[derive(Clone, Default)]
pub struct ModelCallbacks {
    /// Called once per delta, in emission order
    pub on_content_delta: Option<ContentDeltaFn>,
    /// Called when endpoint fallback replaces the base URL
    pub on_base_url_persist: Option<BaseUrlPersistFn>,
}

impl fmt::Debug for ModelCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelCallbacks")
            .field("on_content_delta", &self.on_content_delta.is_some())
            .field("on_base_url_persist", &self.on_base_url_persist.is_some())
            .finish()
    }
}

/// Configuration for one model client.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Which provider to talk to
    pub provider: Provider,
    /// The model identifier (e.g., "gpt-5.2", "claude-sonnet-4-5")
    pub model: String,
    /// Bearer credential (may be empty for local providers)
    pub api_key: String,
    /// Base URL for the API, without the completions path
    pub base_url: String,
    /// Reasoning effort, if the model should reason
    pub reasoning_effort: Option<ReasoningEffort>,
    /// OpenAI-compatible `thinking.type` value (e.g., "enabled")
    pub thinking_type: Option<String>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: Option<f64>,
    /// Whether to request a streamed response
    pub stream: bool,
    /// Tools offered to the model on every request
    pub tools: Vec<ToolDefinition>,
    /// How long to wait for response headers
    pub first_byte_timeout: Duration,
    /// How long the whole response may take
    pub stream_timeout: Duration,
    /// Network-layer retry behaviour
    pub retry: RetryConfig,
    /// Caller hooks
    pub callbacks: ModelCallbacks,
}

impl ModelConfig {
    /// Creates a configuration for `provider` with its default base URL.
    #[must_use]
    pub fn new(provider: Provider, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url = provider.default_base_url().unwrap_or_default().to_string();
        Self {
            provider,
            model: model.into(),
            api_key: api_key.into(),
            base_url,
            reasoning_effort: None,
            thinking_type: None,
            max_tokens: None,
            temperature: None,
            stream: true,
            tools: Vec::new(),
            first_byte_timeout: Duration::from_secs(10),
            stream_timeout: Duration::from_secs(120),
            retry: RetryConfig::default(),
            callbacks: ModelCallbacks::default(),
        }
    }

    /// Creates a configuration for OpenAI.
    #[must_use]
    pub fn openai(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::new(Provider::OpenAI, model, api_key)
    }

    /// Creates a configuration for Anthropic.
    #[must_use]
    pub fn anthropic(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::new(Provider::Anthropic, model, api_key)
    }

    /// Creates a configuration for OpenRouter.
    #[must_use]
    pub fn openrouter(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::new(Provider::OpenRouter, model, api_key)
    }

    /// Creates a configuration for Z.ai.
    #[must_use]
    pub fn zai(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::new(Provider::Zai, model, api_key)
    }

    /// Creates a configuration for a local Ollama server.
    ///
    /// Local inference is slow to start, so the first-byte timeout is longer.
    #[must_use]
    pub fn ollama(model: impl Into<String>) -> Self {
        Self::new(Provider::Ollama, model, "").with_first_byte_timeout(Duration::from_secs(60))
    }

    /// Creates a configuration for a custom OpenAI-compatible endpoint.
    #[must_use]
    pub fn openai_compatible(
        tag: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self::new(Provider::from_tag(&tag.into()), model, "").with_base_url(base_url)
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Sets the model to use.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the base URL for the API. A trailing slash is dropped.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the reasoning effort.
    #[must_use]
    pub fn with_reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning_effort = Some(effort);
        self
    }

    /// Sets the OpenAI-compatible thinking mode.
    #[must_use]
    pub fn with_thinking_type(mut self, thinking_type: impl Into<String>) -> Self {
        self.thinking_type = Some(thinking_type.into());
        self
    }

    /// Sets the maximum tokens to generate.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Requests a streamed (`true`) or complete (`false`) response.
    #[must_use]
    pub fn with_streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Sets the tools offered to the model.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Sets the time-to-first-byte timeout.
    #[must_use]
    pub fn with_first_byte_timeout(mut self, timeout: Duration) -> Self {
        self.first_byte_timeout = timeout;
        self
    }

    /// Sets the total stream duration timeout.
    #[must_use]
    pub fn with_stream_timeout(mut self, timeout: Duration) -> Self {
        self.stream_timeout = timeout;
        self
    }

    /// Sets the maximum number of transient retries.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.retry.max_retries = max_retries;
        self
    }

    /// Sets the retry configuration.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Registers the per-delta callback.
    #[must_use]
    pub fn on_content_delta(mut self, f: impl Fn(DeltaKind, &str) + Send + Sync + 'static) -> Self {
        self.callbacks.on_content_delta = Some(Arc::new(f));
        self
    }

    /// Registers the base URL persistence callback.
    #[must_use]
    pub fn on_base_url_persist(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.callbacks.on_base_url_persist = Some(Arc::new(f));
        self
    }

    /// Checks the fields every request depends on.
    ///
    /// # Errors
    ///
    /// Returns an invalid-config error naming the first bad field.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.model.trim().is_empty() {
            return Err(ModelError::invalid_config("model", "must not be empty"));
        }
        if self.base_url.trim().is_empty() {
            return Err(ModelError::invalid_config(
                "base_url",
                format!("provider '{}' has no default; set base_url", self.provider),
            ));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ModelError::invalid_config(
                "base_url",
                format!("'{}' is not an http(s) URL", self.base_url),
            ));
        }
        if self.first_byte_timeout.is_zero() || self.stream_timeout.is_zero() {
            return Err(ModelError::invalid_config("timeout", "must be greater than zero"));
        }
        Ok(())
    }
}
