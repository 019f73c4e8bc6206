//! # Acton-Model: Streaming LLM Model Client
//!
//! A resilient client for OpenAI-compatible and Anthropic chat APIs. One
//! [`Model`](llm::Model) turns a [`Conversation`](conversation::Conversation)
//! into a vendor payload, streams the SSE response, and surfaces text,
//! thinking and tool-call deltas as they arrive.
//!
//! ## Architecture
//!
//! - **Wire formats**: [`OpenAIWire`](llm::OpenAIWire) and
//!   [`AnthropicWire`](llm::AnthropicWire) build payloads and decode chunks
//! - **Transport**: reqwest + SSE with first-byte and stream timeouts
//! - **Engine**: accumulates deltas into a [`Turn`](llm::Turn) and retries
//!   transient failures that happened before any output
//! - **Degradation**: drops a rejected reasoning parameter or swaps a
//!   deprecated endpoint, at most once each per call
//! - **Config**: named providers in `acton-model.toml`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use acton_model::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ModelError> {
//!     let config = ModelConfig::anthropic("claude-sonnet-4-5", std::env::var("ANTHROPIC_API_KEY").unwrap_or_default())
//!         .with_reasoning_effort(ReasoningEffort::Medium)
//!         .on_content_delta(print_text_delta);
//!     let model = AnthropicModel::new(config)?;
//!
//!     let mut conversation = model.create_conversation("You are terse.", "Name a prime.");
//!     let turn = model.complete(&mut conversation).await?;
//!     println!("\n[{:?}, {} tokens]", turn.stop_reason, turn.usage.map(|u| u.total()).unwrap_or_default());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod conversation;
pub mod llm;
pub mod logging;
pub mod messages;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{ModelFileConfig, NamedModelConfig};
    pub use crate::conversation::Conversation;
    pub use crate::llm::{
        create_model, print_text_delta, AnthropicModel, DeltaKind, Model, ModelClient,
        ModelConfig, ModelError, ModelErrorKind, OpenAICompatibleModel, Provider,
        ReasoningEffort, RetryConfig, Turn,
    };
    pub use crate::logging::{init_logging, LogLevel, LoggingConfig};
    pub use crate::messages::{Message, MessageRole, StopReason, ToolCall, ToolDefinition, Usage};
}
