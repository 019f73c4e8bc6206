//! Conversation history.
//!
//! A [`Conversation`] is the ordered message list a model completes. It is
//! append-only: messages are never reordered, edited or removed. Successful
//! completions append their assistant turn; callers append user input and
//! tool results between completions.
//!
//! # Example
//!
//! ```rust,ignore
//! use acton_model::prelude::*;
//!
//! let model = OpenAICompatibleModel::new(ModelConfig::openai("gpt-5.2", key))?;
//! let mut conv = model.create_conversation("You are a coding agent.", "List the files.");
//!
//! let turn = model.complete(&mut conv).await?;
//! for call in &turn.tool_calls {
//!     conv.push_tool_result(&call.id, run_tool(call));
//! }
//! ```

use crate::messages::{Message, MessageRole};
use serde::{Deserialize, Serialize};

/// An append-only conversation with a fixed system prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    system_prompt: String,
    messages: Vec<Message>,
}

impl Conversation {
    /// Starts a conversation with a system prompt and the first user message.
    #[must_use]
    pub fn new(system_prompt: impl Into<String>, first_user_message: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            messages: vec![Message::user(first_user_message)],
        }
    }

    /// Returns the system prompt.
    #[must_use]
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Returns the messages after the system prompt, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Appends a user message.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    /// Appends the result of a tool call.
    pub fn push_tool_result(&mut self, tool_call_id: impl Into<String>, content: impl Into<String>) {
        self.messages.push(Message::tool(tool_call_id, content));
    }

    /// Appends any message. System messages are folded into user text,
    /// since the system prompt is fixed at creation.
    pub fn push(&mut self, message: Message) {
        if message.role == MessageRole::System {
            self.messages.push(Message::user(message.content));
        } else {
            self.messages.push(message);
        }
    }

    /// Returns the number of messages after the system prompt.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if there are no messages after the system prompt.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns the most recent message.
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}
