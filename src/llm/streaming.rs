//! Streaming response handling.
//!
//! Vendor decoders turn each response frame into an ordered list of
//! [`StreamPiece`]s. The engine hands the visible ones to the caller as
//! [`DeltaEvent`]s and folds every piece into a [`StreamAccumulator`], which
//! assembles the final [`Turn`].

use crate::messages::{Message, StopReason, ThinkingBlock, ToolCall, Usage};
use std::collections::BTreeMap;
use std::fmt;

/// The kind of content a delta carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeltaKind {
    /// Visible answer text
    Text,
    /// Reasoning text
    Thinking,
    /// A fragment of tool-call arguments
    ToolCall,
}

impl DeltaKind {
    /// The kind as a lowercase tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Thinking => "thinking",
            Self::ToolCall => "tool_call",
        }
    }
}

impl fmt::Display for DeltaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One incremental fragment delivered to `on_content_delta`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaEvent {
    /// What the fragment is
    pub kind: DeltaKind,
    /// The fragment itself
    pub fragment: String,
}

/// A decoded unit of a vendor response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamPiece {
    /// Answer text
    Text(String),
    /// Reasoning text
    Thinking(String),
    /// Signature over the reasoning block
    ThinkingSignature(String),
    /// Part of a tool call, keyed by the vendor's index
    ToolCall {
        /// Vendor index of the call within the response
        index: usize,
        /// Call id, usually only on the first fragment
        id: Option<String>,
        /// Tool name, usually only on the first fragment
        name: Option<String>,
        /// Argument JSON text to append
        arguments: String,
    },
    /// The terminal stop reason
    Finish {
        /// The vendor's own string
        raw: String,
        /// Normalized reason
        reason: StopReason,
    },
    /// Token accounting; zero fields leave earlier values in place
    Usage(Usage),
}

impl StreamPiece {
    /// The delta this piece shows the caller, if any.
    #[must_use]
    pub fn as_delta(&self) -> Option<DeltaEvent> {
        let (kind, fragment) = match self {
            Self::Text(text) => (DeltaKind::Text, text),
            Self::Thinking(text) => (DeltaKind::Thinking, text),
            Self::ToolCall { arguments, .. } => (DeltaKind::ToolCall, arguments),
            _ => return None,
        };
        if fragment.is_empty() {
            return None;
        }
        Some(DeltaEvent {
            kind,
            fragment: fragment.clone(),
        })
    }
}

/// One complete model response.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    /// The assembled answer text
    pub text: String,
    /// Reasoning that preceded the answer
    pub thinking: Option<ThinkingBlock>,
    /// Tool calls, in vendor index order
    pub tool_calls: Vec<ToolCall>,
    /// Normalized stop reason
    pub stop_reason: StopReason,
    /// The vendor's raw stop/finish reason
    pub finish_reason: Option<String>,
    /// Token usage, when the vendor reported it
    pub usage: Option<Usage>,
}

impl Turn {
    /// Returns true if the model asked for tools.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Converts this turn into the assistant message stored in history.
    #[must_use]
    pub fn to_message(&self) -> Message {
        let message = if self.tool_calls.is_empty() {
            Message::assistant(self.text.clone())
        } else {
            Message::assistant_with_tools(self.text.clone(), self.tool_calls.clone())
        };
        match &self.thinking {
            Some(thinking) => message.with_thinking(thinking.clone()),
            None => message,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct ToolCallAccumulator {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

/// Folds stream pieces into a [`Turn`].
#[derive(Debug, Clone, Default)]
pub struct StreamAccumulator {
    text: String,
    thinking: String,
    signature: Option<String>,
    tool_calls: BTreeMap<usize, ToolCallAccumulator>,
    finish: Option<(String, StopReason)>,
    usage: Option<Usage>,
}

impl StreamAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one piece into the aggregate.
    pub fn apply(&mut self, piece: StreamPiece) {
        match piece {
            StreamPiece::Text(text) => self.text.push_str(&text),
            StreamPiece::Thinking(text) => self.thinking.push_str(&text),
            StreamPiece::ThinkingSignature(signature) => {
                self.signature
                    .get_or_insert_with(String::new)
                    .push_str(&signature);
            }
            StreamPiece::ToolCall {
                index,
                id,
                name,
                arguments,
            } => {
                let acc = self.tool_calls.entry(index).or_default();
                if id.is_some() {
                    acc.id = id;
                }
                if let Some(name) = name {
                    // Some servers repeat the name on every fragment
                    if acc.name.as_deref() != Some(name.as_str()) {
                        acc.name
                            .get_or_insert_with(String::new)
                            .push_str(&name);
                    }
                }
                acc.arguments.push_str(&arguments);
            }
            StreamPiece::Finish { raw, reason } => self.finish = Some((raw, reason)),
            StreamPiece::Usage(usage) => {
                let current = self.usage.get_or_insert_with(Usage::default);
                if usage.input_tokens > 0 {
                    current.input_tokens = usage.input_tokens;
                }
                if usage.output_tokens > 0 {
                    current.output_tokens = usage.output_tokens;
                }
            }
        }
    }

    /// Returns the text accumulated so far.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the raw finish reason, once one has been seen.
    #[must_use]
    pub fn finish_reason(&self) -> Option<&str> {
        self.finish.as_ref().map(|(raw, _)| raw.as_str())
    }

    /// Assembles the final turn.
    ///
    /// A response without a stop reason is treated as a normal end of turn,
    /// or as tool use when tool calls were collected.
    #[must_use]
    pub fn finish(self) -> Turn {
        let tool_calls: Vec<ToolCall> = self
            .tool_calls
            .into_iter()
            .map(|(index, acc)| ToolCall {
                id: acc.id.unwrap_or_else(|| format!("call_{}", index)),
                name: acc.name.unwrap_or_default(),
                arguments: parse_arguments(&acc.arguments),
            })
            .collect();

        let (finish_reason, stop_reason) = match self.finish {
            Some((raw, reason)) => (Some(raw), reason),
            None if !tool_calls.is_empty() => (None, StopReason::ToolUse),
            None => (None, StopReason::EndTurn),
        };

        let thinking = if self.thinking.is_empty() && self.signature.is_none() {
            None
        } else {
            Some(ThinkingBlock {
                text: self.thinking,
                signature: self.signature,
            })
        };

        Turn {
            text: self.text,
            thinking,
            tool_calls,
            stop_reason,
            finish_reason,
            usage: self.usage,
        }
    }
}

fn parse_arguments(raw: &str) -> serde_json::Value {
    if raw.trim().is_empty() {
        return serde_json::json!({});
    }
    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "tool call arguments are not valid JSON; keeping raw text");
            serde_json::Value::String(raw.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool_fragment(index: usize, id: Option<&str>, name: Option<&str>, args: &str) -> StreamPiece {
        StreamPiece::ToolCall {
            index,
            id: id.map(String::from),
            name: name.map(String::from),
            arguments: args.to_string(),
        }
    }

    #[test]
    fn text_pieces_concatenate_in_order() {
        let mut acc = StreamAccumulator::new();
        acc.apply(StreamPiece::Text("Hello".to_string()));
        acc.apply(StreamPiece::Text(" ".to_string()));
        acc.apply(StreamPiece::Text("World".to_string()));

        let turn = acc.finish();
        assert_eq!(turn.text, "Hello World");
        assert_eq!(turn.stop_reason, StopReason::EndTurn);
        assert!(turn.finish_reason.is_none());
    }

    #[test]
    fn thinking_is_kept_apart_from_text() {
        let mut acc = StreamAccumulator::new();
        acc.apply(StreamPiece::Thinking("hmm".to_string()));
        acc.apply(StreamPiece::ThinkingSignature("sig".to_string()));
        acc.apply(StreamPiece::Text("answer".to_string()));

        let turn = acc.finish();
        assert_eq!(turn.text, "answer");
        let thinking = turn.thinking.unwrap();
        assert_eq!(thinking.text, "hmm");
        assert_eq!(thinking.signature.as_deref(), Some("sig"));
    }

    #[test]
    fn tool_call_fragments_accumulate_by_index() {
        let mut acc = StreamAccumulator::new();
        acc.apply(tool_fragment(1, Some("b"), Some("write"), "{\"path\":"));
        acc.apply(tool_fragment(0, Some("a"), Some("read"), "{\"path\":\"x\"}"));
        acc.apply(tool_fragment(1, None, None, "\"y\"}"));

        let turn = acc.finish();
        assert_eq!(turn.tool_calls.len(), 2);
        assert_eq!(turn.tool_calls[0].id, "a");
        assert_eq!(turn.tool_calls[0].name, "read");
        assert_eq!(turn.tool_calls[1].arguments, serde_json::json!({"path": "y"}));
        assert_eq!(turn.stop_reason, StopReason::ToolUse);
    }

    #[test]
    fn repeated_tool_name_is_not_doubled() {
        let mut acc = StreamAccumulator::new();
        acc.apply(tool_fragment(0, Some("a"), Some("bash"), "{}"));
        acc.apply(tool_fragment(0, None, Some("bash"), ""));

        assert_eq!(acc.finish().tool_calls[0].name, "bash");
    }

    #[test]
    fn empty_tool_arguments_become_empty_object() {
        let mut acc = StreamAccumulator::new();
        acc.apply(tool_fragment(0, Some("a"), Some("list"), ""));

        assert_eq!(acc.finish().tool_calls[0].arguments, serde_json::json!({}));
    }

    #[test]
    fn invalid_tool_arguments_are_kept_as_text() {
        let mut acc = StreamAccumulator::new();
        acc.apply(tool_fragment(0, Some("a"), Some("list"), "{\"trunc"));

        assert_eq!(
            acc.finish().tool_calls[0].arguments,
            serde_json::Value::String("{\"trunc".to_string())
        );
    }

    #[test]
    fn explicit_finish_reason_wins() {
        let mut acc = StreamAccumulator::new();
        acc.apply(tool_fragment(0, Some("a"), Some("t"), "{}"));
        acc.apply(StreamPiece::Finish {
            raw: "length".to_string(),
            reason: StopReason::MaxTokens,
        });

        assert_eq!(acc.finish_reason(), Some("length"));
        let turn = acc.finish();
        assert_eq!(turn.stop_reason, StopReason::MaxTokens);
        assert_eq!(turn.finish_reason.as_deref(), Some("length"));
    }

    #[test]
    fn usage_merges_partial_reports() {
        let mut acc = StreamAccumulator::new();
        acc.apply(StreamPiece::Usage(Usage {
            input_tokens: 25,
            output_tokens: 1,
        }));
        acc.apply(StreamPiece::Usage(Usage {
            input_tokens: 0,
            output_tokens: 40,
        }));

        let usage = acc.finish().usage.unwrap();
        assert_eq!(usage.input_tokens, 25);
        assert_eq!(usage.output_tokens, 40);
    }

    #[test]
    fn only_visible_pieces_become_deltas() {
        assert_eq!(
            StreamPiece::Text("a".to_string()).as_delta(),
            Some(DeltaEvent {
                kind: DeltaKind::Text,
                fragment: "a".to_string()
            })
        );
        assert!(StreamPiece::Text(String::new()).as_delta().is_none());
        assert!(StreamPiece::ThinkingSignature("s".to_string()).as_delta().is_none());
        assert_eq!(
            tool_fragment(0, None, None, "{").as_delta().unwrap().kind,
            DeltaKind::ToolCall
        );
    }

    #[test]
    fn turn_to_message_carries_tools_and_thinking() {
        let mut acc = StreamAccumulator::new();
        acc.apply(StreamPiece::Thinking("plan".to_string()));
        acc.apply(tool_fragment(0, Some("a"), Some("t"), "{}"));

        let message = acc.finish().to_message();
        assert!(message.has_tool_calls());
        assert_eq!(message.thinking.unwrap().text, "plan");
    }

    #[test]
    fn delta_kind_display() {
        assert_eq!(DeltaKind::Text.to_string(), "text");
        assert_eq!(DeltaKind::Thinking.to_string(), "thinking");
        assert_eq!(DeltaKind::ToolCall.to_string(), "tool_call");
    }
}
