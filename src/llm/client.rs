//! Client trait abstractions.
//!
//! [`ModelClient`] is the public surface every model exposes. [`WireFormat`]
//! is the seam between the vendor-neutral engine and one vendor family's
//! payloads and frames; there is one implementation per family.

use crate::conversation::Conversation;
use crate::llm::config::{ModelConfig, ProviderFamily};
use crate::llm::error::ModelError;
use crate::llm::streaming::{StreamPiece, Turn};
use async_trait::async_trait;
use std::fmt;
use tokio::time::Instant;

/// A vendor family's request and response format.
///
/// Implementations are stateless. `build_payload` must be a pure function of
/// its inputs so that identical inputs give byte-identical bodies.
pub trait WireFormat: Send + Sync + fmt::Debug + 'static {
    /// Which family this is.
    fn family(&self) -> ProviderFamily;

    /// The full request URL for `base_url`.
    fn endpoint(&self, base_url: &str) -> String;

    /// Authentication and protocol headers.
    fn headers(&self, config: &ModelConfig) -> Vec<(String, String)>;

    /// The request field this vendor may reject and that can be dropped.
    fn strippable_param(&self) -> &'static str;

    /// Serializes the request body, leaving out any field named in `omitted`.
    ///
    /// # Errors
    ///
    /// Returns an invalid-config error if the configuration cannot be
    /// expressed in this format.
    fn build_payload(
        &self,
        conversation: &Conversation,
        config: &ModelConfig,
        omitted: &[&str],
    ) -> Result<String, ModelError>;

    /// Decodes one streamed frame.
    ///
    /// # Errors
    ///
    /// Returns a malformed-response error for undecodable frames and the
    /// classified vendor error for in-stream error frames.
    fn decode_chunk(&self, event: &str, data: &str) -> Result<Vec<StreamPiece>, ModelError>;

    /// Decodes a complete, non-streamed response body.
    ///
    /// # Errors
    ///
    /// Returns a malformed-response error if the body is not a message.
    fn decode_body(&self, body: &str) -> Result<Vec<StreamPiece>, ModelError>;
}

/// A conversation-oriented model client.
///
/// # Example
///
/// ```ignore
/// use acton_model::prelude::*;
///
/// let model = create_model(ModelConfig::anthropic("claude-sonnet-4-5", key))?;
/// let mut conv = model.create_conversation("You are helpful.", "Hello!");
/// let turn = model.complete(&mut conv).await?;
/// println!("{}", turn.text);
/// ```
#[async_trait]
pub trait ModelClient: Send + Sync + fmt::Debug {
    /// Starts a new conversation. Makes no network call.
    fn create_conversation(&self, system_prompt: &str, first_user_message: &str) -> Conversation;

    /// Completes the conversation and appends the resulting turn to it.
    ///
    /// # Errors
    ///
    /// Returns the classified error once local retries and degradations are
    /// exhausted. The conversation is unchanged on error.
    async fn complete(&self, conversation: &mut Conversation) -> Result<Turn, ModelError>;

    /// Like [`complete`](Self::complete), giving up at `deadline`.
    ///
    /// # Errors
    ///
    /// As [`complete`](Self::complete), plus a deadline timeout.
    async fn complete_until(
        &self,
        conversation: &mut Conversation,
        deadline: Instant,
    ) -> Result<Turn, ModelError>;

    /// The provider tag this client talks to.
    fn provider_name(&self) -> &str;

    /// The base URL currently in use.
    fn base_url(&self) -> String;
}
