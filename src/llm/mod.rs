//! Model client module.
//!
//! Vendor payload builders, the SSE transport and streaming engine, failure
//! classification, structural degradation, and the [`Model`] façade that
//! composes them.

mod anthropic;
mod classify;
mod client;
mod config;
mod degrade;
mod engine;
mod error;
mod model;
mod openai;
mod streaming;
mod transport;

pub use anthropic::{uses_adaptive_thinking, AnthropicWire, ANTHROPIC_VERSION, THINKING_PARAM};
pub use classify::{classify, classify_finish_reason, classify_stream_error, RATE_LIMIT_REASONS};
pub use client::{ModelClient, WireFormat};
pub use config::{
    BaseUrlPersistFn, ContentDeltaFn, ModelCallbacks, ModelConfig, Provider, ProviderFamily,
    ReasoningEffort, RetryConfig, DEFAULT_ANTHROPIC_MAX_TOKENS,
};
pub use degrade::{
    fallback_base_url, rejects_parameter, Degradation, DegradationController, DegradationState,
    EndpointFallback, ENDPOINT_FALLBACKS,
};
pub use error::{ModelError, ModelErrorKind, TimeoutPhase};
pub use model::{
    create_model, print_text_delta, AnthropicModel, Model, OpenAICompatibleModel,
};
pub use openai::{OpenAIWire, REASONING_EFFORT_PARAM};
pub use streaming::{DeltaEvent, DeltaKind, StreamAccumulator, StreamPiece, Turn};
pub use transport::{
    Frame, FrameHandler, HttpRequest, HttpTransport, Timeouts, Transport, TransportError,
};
