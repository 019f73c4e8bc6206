//! The model façade.
//!
//! [`Model`] composes a vendor [`WireFormat`], the streaming engine and the
//! degradation controller behind [`ModelClient`]. One `Model` serves one
//! session; its base URL is the only state that changes after construction,
//! and only through endpoint fallback.

use crate::conversation::Conversation;
use crate::llm::anthropic::AnthropicWire;
use crate::llm::client::{ModelClient, WireFormat};
use crate::llm::config::{ModelConfig, ProviderFamily};
use crate::llm::degrade::{Degradation, DegradationController};
use crate::llm::engine::Engine;
use crate::llm::error::ModelError;
use crate::llm::openai::OpenAIWire;
use crate::llm::streaming::{DeltaKind, Turn};
use crate::llm::transport::{HttpRequest, HttpTransport, Timeouts, Transport};
use async_trait::async_trait;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock};
use tokio::time::Instant;

/// A model client for the OpenAI-compatible family.
pub type OpenAICompatibleModel = Model<OpenAIWire>;

/// A model client for the Anthropic family.
pub type AnthropicModel = Model<AnthropicWire>;

/// A conversation-oriented client for one model.
pub struct Model<W: WireFormat> {
    config: ModelConfig,
    base_url: RwLock<String>,
    transport: Arc<dyn Transport>,
    wire: W,
}

impl<W: WireFormat> fmt::Debug for Model<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("provider", &self.config.provider)
            .field("model", &self.config.model)
            .field("base_url", &self.base_url())
            .field("wire", &self.wire)
            .finish()
    }
}

impl<W: WireFormat + Default> Model<W> {
    /// Creates a model client over HTTP.
    ///
    /// # Errors
    ///
    /// Returns an invalid-config error if the configuration is incomplete,
    /// or a network error if the HTTP client cannot be created.
    pub fn new(config: ModelConfig) -> Result<Self, ModelError> {
        let transport = HttpTransport::new()?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Creates a model client over a custom transport.
    ///
    /// # Errors
    ///
    /// Returns an invalid-config error if the configuration is incomplete.
    pub fn with_transport(
        config: ModelConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ModelError> {
        config.validate()?;
        let wire = W::default();
        if wire.family() != config.provider.family() {
            tracing::debug!(
                provider = %config.provider,
                family = ?wire.family(),
                "provider speaks a different family by default; using the requested wire format"
            );
        }
        Ok(Self {
            base_url: RwLock::new(config.base_url.clone()),
            config,
            transport,
            wire,
        })
    }
}

impl<W: WireFormat> Model<W> {
    /// The configuration this model was created with.
    #[must_use]
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// The base URL requests currently go to.
    #[must_use]
    pub fn base_url(&self) -> String {
        self.base_url
            .read()
            .map(|url| url.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn set_base_url(&self, base_url: &str) {
        let mut guard = self
            .base_url
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = base_url.to_string();
    }

    /// Starts a new conversation. Makes no network call.
    #[must_use]
    pub fn create_conversation(&self, system_prompt: &str, first_user_message: &str) -> Conversation {
        Conversation::new(system_prompt, first_user_message)
    }

    /// Serializes the request body for `conversation` as it would be sent.
    ///
    /// # Errors
    ///
    /// Returns an invalid-config error if the configuration cannot be
    /// expressed in this vendor's format.
    pub fn build_payload(&self, conversation: &Conversation) -> Result<String, ModelError> {
        self.wire.build_payload(conversation, &self.config, &[])
    }

    /// Completes the conversation and appends the resulting turn to it.
    ///
    /// # Errors
    ///
    /// Returns the classified error once transient retries and degradations
    /// are exhausted. The conversation is unchanged on error.
    pub async fn complete(&self, conversation: &mut Conversation) -> Result<Turn, ModelError> {
        self.run(conversation, None).await
    }

    /// Like [`complete`](Self::complete), giving up at `deadline`.
    ///
    /// # Errors
    ///
    /// As [`complete`](Self::complete), plus a deadline timeout.
    pub async fn complete_until(
        &self,
        conversation: &mut Conversation,
        deadline: Instant,
    ) -> Result<Turn, ModelError> {
        self.run(conversation, Some(deadline)).await
    }

    async fn run(
        &self,
        conversation: &mut Conversation,
        deadline: Option<Instant>,
    ) -> Result<Turn, ModelError> {
        let strippable = self.wire.strippable_param();
        let param_sent = self.wire.build_payload(conversation, &self.config, &[])?
            != self
                .wire
                .build_payload(conversation, &self.config, &[strippable])?;

        let mut controller =
            DegradationController::new(self.config.provider.tag(), strippable, param_sent);
        let timeouts = Timeouts {
            first_byte: self.config.first_byte_timeout,
            total: self.config.stream_timeout,
            deadline,
        };
        let engine = Engine {
            transport: self.transport.as_ref(),
            wire: &self.wire,
            retry: &self.config.retry,
            on_delta: self.config.callbacks.on_content_delta.as_ref(),
        };

        loop {
            let base_url = self.base_url();
            let request = HttpRequest {
                url: self.wire.endpoint(&base_url),
                headers: self.wire.headers(&self.config),
                body: self
                    .wire
                    .build_payload(conversation, &self.config, &controller.omitted())?,
                stream: self.config.stream,
            };

            let error = match engine.run(&request, &timeouts).await {
                Ok(turn) => {
                    controller.succeeded();
                    tracing::debug!(
                        provider = %self.config.provider,
                        stop_reason = ?turn.stop_reason,
                        tool_calls = turn.tool_calls.len(),
                        "model turn complete"
                    );
                    conversation.push(turn.to_message());
                    return Ok(turn);
                }
                Err(error) => error,
            };

            match controller.failed(&error, &base_url) {
                Some(Degradation::StripParameter(param)) => {
                    tracing::warn!(
                        provider = %self.config.provider,
                        model = %self.config.model,
                        param,
                        "provider rejected parameter; retrying without it"
                    );
                }
                Some(Degradation::SwapEndpoint { base_url: replacement }) => {
                    tracing::warn!(
                        provider = %self.config.provider,
                        from = %base_url,
                        to = %replacement,
                        "provider endpoint not found; retrying on replacement endpoint"
                    );
                    self.set_base_url(&replacement);
                    self.persist_base_url(&replacement);
                }
                None => return Err(error),
            }
        }
    }

    fn persist_base_url(&self, base_url: &str) {
        let Some(callback) = &self.config.callbacks.on_base_url_persist else {
            return;
        };
        let result = panic::catch_unwind(AssertUnwindSafe(|| callback(base_url)));
        match result {
            Ok(()) => tracing::info!(provider = %self.config.provider, base_url, "persisted new base URL"),
            Err(_) => tracing::warn!(base_url, "base URL persist callback panicked"),
        }
    }
}

#[async_trait]
impl<W: WireFormat> ModelClient for Model<W> {
    fn create_conversation(&self, system_prompt: &str, first_user_message: &str) -> Conversation {
        Model::create_conversation(self, system_prompt, first_user_message)
    }

    async fn complete(&self, conversation: &mut Conversation) -> Result<Turn, ModelError> {
        Model::complete(self, conversation).await
    }

    async fn complete_until(
        &self,
        conversation: &mut Conversation,
        deadline: Instant,
    ) -> Result<Turn, ModelError> {
        Model::complete_until(self, conversation, deadline).await
    }

    fn provider_name(&self) -> &str {
        self.config.provider.tag()
    }

    fn base_url(&self) -> String {
        Model::base_url(self)
    }
}

/// Creates a model client for the configuration's provider family.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the HTTP client
/// cannot be created.
pub fn create_model(config: ModelConfig) -> Result<Box<dyn ModelClient>, ModelError> {
    tracing::debug!(provider = %config.provider, model = %config.model, "creating model client");
    Ok(match config.provider.family() {
        ProviderFamily::Anthropic => Box::new(AnthropicModel::new(config)?),
        ProviderFamily::OpenAICompatible => Box::new(OpenAICompatibleModel::new(config)?),
    })
}

/// Prints text deltas to stdout as they arrive.
///
/// A ready-made `on_content_delta` for terminal use; thinking and tool-call
/// fragments are not shown.
pub fn print_text_delta(kind: DeltaKind, fragment: &str) {
    use std::io::Write;

    if kind == DeltaKind::Text {
        let mut stdout = std::io::stdout().lock();
        // Display is best effort; a closed stdout must not end the stream
        let _ = stdout.write_all(fragment.as_bytes());
        let _ = stdout.flush();
    }
}
