//! Anthropic wire format.
//!
//! The messages API: a separate system prompt, typed content blocks, and
//! named SSE events (`message_start`, `content_block_delta`, ...).

use crate::conversation::Conversation;
use crate::llm::classify::classify_stream_error;
use crate::llm::client::WireFormat;
use crate::llm::config::{ModelConfig, ProviderFamily, DEFAULT_ANTHROPIC_MAX_TOKENS};
use crate::llm::error::ModelError;
use crate::llm::streaming::StreamPiece;
use crate::messages::{Message, MessageRole, StopReason, ToolDefinition, Usage};
use serde::{Deserialize, Serialize};

/// The field Anthropic-compatible servers reject when they lack extended thinking.
pub const THINKING_PARAM: &str = "thinking";

/// API version sent with every request.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// [`WireFormat`] for `/messages`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicWire;

/// Request body for the Anthropic messages API.
#[derive(Debug, Clone, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<ApiMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking: Option<ThinkingConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_config: Option<OutputConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ApiTool>>,
}

/// Extended thinking configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ThinkingConfig {
    /// The model decides how much to think
    Adaptive,
    /// A fixed token budget
    Enabled { budget_tokens: u32 },
}

/// Output controls that accompany adaptive thinking.
#[derive(Debug, Clone, Copy, Serialize)]
struct OutputConfig {
    effort: &'static str,
}

/// A message in the API format.
#[derive(Debug, Clone, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: ApiContent,
}

/// Content in the API format (can be string or array of content blocks).
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum ApiContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// A content block in the API format.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Thinking {
        thinking: String,
        signature: String,
    },
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

/// Tool definition in the API format.
#[derive(Debug, Clone, Serialize)]
struct ApiTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

/// Response from the Anthropic messages API (non-streaming).
#[derive(Debug, Clone, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<ApiUsage>,
    #[serde(default)]
    error: Option<ApiErrorDetail>,
}

/// A content block in the response.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseContentBlock {
    Text {
        text: String,
    },
    Thinking {
        #[serde(default)]
        thinking: String,
        #[serde(default)]
        signature: Option<String>,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    #[serde(other)]
    Unsupported,
}

/// Usage statistics from the API.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

/// Error detail from the API.
#[derive(Debug, Clone, Deserialize)]
struct ApiErrorDetail {
    #[serde(rename = "type", default)]
    error_type: String,
    #[serde(default)]
    message: String,
}

/// Raw SSE event data from the API.
#[derive(Debug, Clone, Deserialize)]
struct RawStreamEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    message: Option<RawMessage>,
    #[serde(default)]
    index: Option<usize>,
    #[serde(default)]
    content_block: Option<serde_json::Value>,
    #[serde(default)]
    delta: Option<serde_json::Value>,
    #[serde(default)]
    usage: Option<ApiUsage>,
    #[serde(default)]
    error: Option<ApiErrorDetail>,
}

/// The `message` object of `message_start`.
#[derive(Debug, Clone, Deserialize)]
struct RawMessage {
    #[serde(default)]
    usage: Option<ApiUsage>,
}

/// Returns true for models that take adaptive thinking instead of a budget.
#[must_use]
pub fn uses_adaptive_thinking(model: &str) -> bool {
    let model = model.to_ascii_lowercase();
    model.contains("opus-4-6") || model.contains("opus-4.6")
}

/// Converts an API stop reason string to our `StopReason` enum.
#[must_use]
pub fn parse_stop_reason(reason: &str) -> StopReason {
    match reason {
        "end_turn" | "pause_turn" => StopReason::EndTurn,
        "max_tokens" => StopReason::MaxTokens,
        "tool_use" => StopReason::ToolUse,
        "stop_sequence" => StopReason::StopSequence,
        "refusal" => StopReason::ContentFilter,
        _ => StopReason::Other,
    }
}

fn usage_piece(usage: ApiUsage) -> StreamPiece {
    StreamPiece::Usage(Usage {
        input_tokens: usage.input_tokens,
        output_tokens: usage.output_tokens,
    })
}

fn finish_piece(raw: String) -> StreamPiece {
    let reason = parse_stop_reason(&raw);
    StreamPiece::Finish { raw, reason }
}

fn str_field(value: &serde_json::Value, key: &str) -> Option<String> {
    value.get(key).and_then(|v| v.as_str()).map(String::from)
}

impl AnthropicWire {
    /// Converts history to API messages.
    ///
    /// Consecutive tool results are merged into one user message, as the API
    /// requires all results for one assistant turn to arrive together.
    fn convert_messages(messages: &[Message]) -> Vec<ApiMessage> {
        let mut api_messages: Vec<ApiMessage> = Vec::with_capacity(messages.len());

        for msg in messages {
            match msg.role {
                MessageRole::System => {}
                MessageRole::User => api_messages.push(ApiMessage {
                    role: "user",
                    content: ApiContent::Text(msg.content.clone()),
                }),
                MessageRole::Assistant => {
                    let signed_thinking = msg.thinking.as_ref().and_then(|t| {
                        t.signature.as_ref().map(|signature| ContentBlock::Thinking {
                            thinking: t.text.clone(),
                            signature: signature.clone(),
                        })
                    });

                    if signed_thinking.is_none() && !msg.has_tool_calls() {
                        api_messages.push(ApiMessage {
                            role: "assistant",
                            content: ApiContent::Text(msg.content.clone()),
                        });
                        continue;
                    }

                    let mut blocks: Vec<ContentBlock> = signed_thinking.into_iter().collect();
                    if !msg.content.is_empty() {
                        blocks.push(ContentBlock::Text {
                            text: msg.content.clone(),
                        });
                    }
                    blocks.extend(msg.tool_calls.iter().flatten().map(|tc| {
                        ContentBlock::ToolUse {
                            id: tc.id.clone(),
                            name: tc.name.clone(),
                            input: tc.arguments.clone(),
                        }
                    }));
                    api_messages.push(ApiMessage {
                        role: "assistant",
                        content: ApiContent::Blocks(blocks),
                    });
                }
                MessageRole::Tool => {
                    let Some(tool_call_id) = &msg.tool_call_id else {
                        continue;
                    };
                    let result = ContentBlock::ToolResult {
                        tool_use_id: tool_call_id.clone(),
                        content: msg.content.clone(),
                    };
                    match api_messages.last_mut() {
                        Some(ApiMessage {
                            role: "user",
                            content: ApiContent::Blocks(blocks),
                        }) if blocks
                            .iter()
                            .all(|b| matches!(b, ContentBlock::ToolResult { .. })) =>
                        {
                            blocks.push(result);
                        }
                        _ => api_messages.push(ApiMessage {
                            role: "user",
                            content: ApiContent::Blocks(vec![result]),
                        }),
                    }
                }
            }
        }

        api_messages
    }

    /// Converts tool definitions to API format.
    fn convert_tools(tools: &[ToolDefinition]) -> Vec<ApiTool> {
        tools
            .iter()
            .map(|t| ApiTool {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.input_schema.clone(),
            })
            .collect()
    }

    fn convert_raw_event(raw: RawStreamEvent) -> Result<Vec<StreamPiece>, ModelError> {
        let index = raw.index.unwrap_or(0);
        let mut pieces = Vec::new();

        match raw.event_type.as_str() {
            "message_start" => {
                if let Some(usage) = raw.message.and_then(|m| m.usage) {
                    pieces.push(usage_piece(usage));
                }
            }
            "content_block_start" => {
                let Some(block) = raw.content_block else {
                    return Ok(pieces);
                };
                match block.get("type").and_then(|v| v.as_str()) {
                    Some("tool_use") => pieces.push(StreamPiece::ToolCall {
                        index,
                        id: str_field(&block, "id"),
                        name: str_field(&block, "name"),
                        arguments: String::new(),
                    }),
                    Some("text") => {
                        if let Some(text) = str_field(&block, "text").filter(|t| !t.is_empty()) {
                            pieces.push(StreamPiece::Text(text));
                        }
                    }
                    Some("thinking") => {
                        if let Some(text) = str_field(&block, "thinking").filter(|t| !t.is_empty())
                        {
                            pieces.push(StreamPiece::Thinking(text));
                        }
                    }
                    _ => {}
                }
            }
            "content_block_delta" => {
                let Some(delta) = raw.delta else {
                    return Ok(pieces);
                };
                match delta.get("type").and_then(|v| v.as_str()) {
                    Some("text_delta") => {
                        if let Some(text) = str_field(&delta, "text") {
                            pieces.push(StreamPiece::Text(text));
                        }
                    }
                    Some("thinking_delta") => {
                        if let Some(text) = str_field(&delta, "thinking") {
                            pieces.push(StreamPiece::Thinking(text));
                        }
                    }
                    Some("signature_delta") => {
                        if let Some(signature) = str_field(&delta, "signature") {
                            pieces.push(StreamPiece::ThinkingSignature(signature));
                        }
                    }
                    Some("input_json_delta") => pieces.push(StreamPiece::ToolCall {
                        index,
                        id: None,
                        name: None,
                        arguments: str_field(&delta, "partial_json").unwrap_or_default(),
                    }),
                    _ => {}
                }
            }
            "message_delta" => {
                if let Some(reason) = raw.delta.as_ref().and_then(|d| str_field(d, "stop_reason"))
                {
                    pieces.push(finish_piece(reason));
                }
                if let Some(usage) = raw.usage {
                    pieces.push(usage_piece(usage));
                }
            }
            "error" => {
                let error = raw.error.unwrap_or(ApiErrorDetail {
                    error_type: "error".to_string(),
                    message: "Unknown error".to_string(),
                });
                return Err(classify_stream_error(&error.error_type, &error.message));
            }
            // ping, content_block_stop, message_stop and future event types
            _ => {}
        }

        Ok(pieces)
    }
}

impl WireFormat for AnthropicWire {
    fn family(&self) -> ProviderFamily {
        ProviderFamily::Anthropic
    }

    fn endpoint(&self, base_url: &str) -> String {
        format!("{}/messages", base_url.trim_end_matches('/'))
    }

    fn headers(&self, config: &ModelConfig) -> Vec<(String, String)> {
        vec![
            ("content-type".to_string(), "application/json".to_string()),
            ("x-api-key".to_string(), config.api_key.clone()),
            (
                "anthropic-version".to_string(),
                ANTHROPIC_VERSION.to_string(),
            ),
        ]
    }

    fn strippable_param(&self) -> &'static str {
        THINKING_PARAM
    }

    fn build_payload(
        &self,
        conversation: &Conversation,
        config: &ModelConfig,
        omitted: &[&str],
    ) -> Result<String, ModelError> {
        let max_tokens = config.max_tokens.unwrap_or(DEFAULT_ANTHROPIC_MAX_TOKENS);
        let adaptive = uses_adaptive_thinking(&config.model);

        let (thinking, output_config) = match config.reasoning_effort {
            None => (None, None),
            Some(effort) if adaptive => (
                Some(ThinkingConfig::Adaptive),
                Some(OutputConfig {
                    effort: effort.as_str(),
                }),
            ),
            Some(effort) => {
                let budget_tokens = effort.thinking_budget();
                if budget_tokens >= max_tokens {
                    return Err(ModelError::invalid_config(
                        "max_tokens",
                        format!(
                            "{} must exceed the {} thinking budget of {} tokens",
                            max_tokens, effort, budget_tokens
                        ),
                    ));
                }
                (Some(ThinkingConfig::Enabled { budget_tokens }), None)
            }
        };

        // Omitted whenever thinking is configured, stripped or not
        let temperature = if thinking.is_some() {
            None
        } else {
            config.temperature
        };

        let request = MessagesRequest {
            model: &config.model,
            max_tokens,
            system: Some(conversation.system_prompt()).filter(|s| !s.is_empty()),
            messages: Self::convert_messages(conversation.messages()),
            stream: config.stream,
            thinking: thinking.filter(|_| !omitted.contains(&THINKING_PARAM)),
            output_config,
            temperature,
            tools: (!config.tools.is_empty()).then(|| Self::convert_tools(&config.tools)),
        };

        serde_json::to_string(&request)
            .map_err(|e| ModelError::invalid_config("payload", e.to_string()))
    }

    fn decode_chunk(&self, _event: &str, data: &str) -> Result<Vec<StreamPiece>, ModelError> {
        let raw: RawStreamEvent = serde_json::from_str(data)
            .map_err(|e| ModelError::malformed(format!("invalid stream event: {}", e)))?;
        Self::convert_raw_event(raw)
    }

    fn decode_body(&self, body: &str) -> Result<Vec<StreamPiece>, ModelError> {
        let response: MessagesResponse = serde_json::from_str(body)
            .map_err(|e| ModelError::malformed(format!("invalid response body: {}", e)))?;

        if let Some(error) = response.error {
            return Err(classify_stream_error(&error.error_type, &error.message));
        }

        let mut pieces = Vec::new();
        for (index, block) in response.content.into_iter().enumerate() {
            match block {
                ResponseContentBlock::Text { text } => {
                    if !text.is_empty() {
                        pieces.push(StreamPiece::Text(text));
                    }
                }
                ResponseContentBlock::Thinking {
                    thinking,
                    signature,
                } => {
                    pieces.push(StreamPiece::Thinking(thinking));
                    if let Some(signature) = signature {
                        pieces.push(StreamPiece::ThinkingSignature(signature));
                    }
                }
                ResponseContentBlock::ToolUse { id, name, input } => {
                    pieces.push(StreamPiece::ToolCall {
                        index,
                        id: Some(id),
                        name: Some(name),
                        arguments: input.to_string(),
                    });
                }
                ResponseContentBlock::Unsupported => {}
            }
        }
        if let Some(reason) = response.stop_reason {
            pieces.push(finish_piece(reason));
        }
        if let Some(usage) = response.usage {
            pieces.push(usage_piece(usage));
        }
        Ok(pieces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::config::ReasoningEffort;
    use crate::llm::streaming::StreamAccumulator;
    use crate::messages::{ThinkingBlock, ToolCall};
    use serde_json::{json, Value};

    fn payload(config: &ModelConfig, omitted: &[&str]) -> Value {
        let conv = Conversation::new("system", "user msg");
        let body = AnthropicWire.build_payload(&conv, config, omitted).unwrap();
        serde_json::from_str(&body).unwrap()
    }

    fn decode_all(frames: &[&str]) -> crate::llm::streaming::Turn {
        let mut acc = StreamAccumulator::new();
        for frame in frames {
            for piece in AnthropicWire.decode_chunk("", frame).unwrap() {
                acc.apply(piece);
            }
        }
        acc.finish()
    }

    #[test]
    fn manual_thinking_uses_effort_budget() {
        let config = ModelConfig::anthropic("claude-sonnet-4-5", "k")
            .with_reasoning_effort(ReasoningEffort::Medium);
        let body = payload(&config, &[]);

        assert_eq!(body["thinking"], json!({"type": "enabled", "budget_tokens": 4096}));
        assert!(body.get("output_config").is_none());
    }

    #[test]
    fn adaptive_model_uses_output_config_and_drops_temperature() {
        let config = ModelConfig::anthropic("claude-opus-4-6", "k")
            .with_reasoning_effort(ReasoningEffort::High)
            .with_temperature(0.7);
        let body = payload(&config, &[]);

        assert_eq!(body["thinking"], json!({"type": "adaptive"}));
        assert_eq!(body["output_config"], json!({"effort": "high"}));
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn temperature_is_sent_without_thinking() {
        let config = ModelConfig::anthropic("claude-haiku-4-5", "k").with_temperature(0.3);
        let body = payload(&config, &[]);

        assert_eq!(body["temperature"], 0.3);
        assert!(body.get("thinking").is_none());
    }

    #[test]
    fn system_prompt_is_separate() {
        let body = payload(&ModelConfig::anthropic("claude-sonnet-4-5", "k"), &[]);

        assert_eq!(body["system"], "system");
        assert_eq!(body["messages"], json!([{"role": "user", "content": "user msg"}]));
        assert_eq!(body["max_tokens"], DEFAULT_ANTHROPIC_MAX_TOKENS);
    }

    #[test]
    fn stripping_thinking_changes_nothing_else() {
        let config = ModelConfig::anthropic("claude-sonnet-4-5", "k")
            .with_reasoning_effort(ReasoningEffort::Medium);
        let mut full = payload(&config, &[]);
        let stripped = payload(&config, &[THINKING_PARAM]);

        assert!(stripped.get("thinking").is_none());
        full.as_object_mut().unwrap().remove("thinking");
        assert_eq!(full, stripped);
    }

    #[test]
    fn max_tokens_must_exceed_budget() {
        let config = ModelConfig::anthropic("claude-sonnet-4-5", "k")
            .with_reasoning_effort(ReasoningEffort::High)
            .with_max_tokens(8000);
        let err = AnthropicWire
            .build_payload(&Conversation::new("s", "u"), &config, &[])
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn adaptive_class_detection() {
        assert!(uses_adaptive_thinking("claude-opus-4-6"));
        assert!(uses_adaptive_thinking("anthropic/claude-opus-4.6"));
        assert!(!uses_adaptive_thinking("claude-opus-4-5"));
        assert!(!uses_adaptive_thinking("claude-sonnet-4-5"));
    }

    #[test]
    fn consecutive_tool_results_merge() {
        let messages = vec![
            Message::user("go"),
            Message::assistant_with_tools(
                "",
                vec![
                    ToolCall {
                        id: "a".to_string(),
                        name: "ls".to_string(),
                        arguments: json!({}),
                    },
                    ToolCall {
                        id: "b".to_string(),
                        name: "pwd".to_string(),
                        arguments: json!({}),
                    },
                ],
            ),
            Message::tool("a", "x"),
            Message::tool("b", "/"),
        ];

        let api = AnthropicWire::convert_messages(&messages);
        assert_eq!(api.len(), 3);
        let json = serde_json::to_value(&api[2].content).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 2);
        assert_eq!(json[1]["tool_use_id"], "b");
    }

    #[test]
    fn signed_thinking_is_replayed_before_tool_use() {
        let message = Message::assistant_with_tools(
            "",
            vec![ToolCall {
                id: "a".to_string(),
                name: "ls".to_string(),
                arguments: json!({}),
            }],
        )
        .with_thinking(ThinkingBlock {
            text: "plan".to_string(),
            signature: Some("sig".to_string()),
        });

        let api = AnthropicWire::convert_messages(&[message]);
        let json = serde_json::to_value(&api[0].content).unwrap();
        assert_eq!(json[0], json!({"type": "thinking", "thinking": "plan", "signature": "sig"}));
        assert_eq!(json[1]["type"], "tool_use");
    }

    #[test]
    fn unsigned_thinking_is_not_replayed() {
        let message = Message::assistant("hi").with_thinking(ThinkingBlock {
            text: "plan".to_string(),
            signature: None,
        });

        let api = AnthropicWire::convert_messages(&[message]);
        assert_eq!(serde_json::to_value(&api[0].content).unwrap(), json!("hi"));
    }

    #[test]
    fn headers_carry_key_and_version() {
        let headers = AnthropicWire.headers(&ModelConfig::anthropic("m", "sk-ant"));
        assert!(headers.contains(&("x-api-key".to_string(), "sk-ant".to_string())));
        assert!(headers.contains(&("anthropic-version".to_string(), "2023-06-01".to_string())));
    }

    #[test]
    fn stream_events_assemble_a_turn() {
        let turn = decode_all(&[
            r#"{"type":"message_start","message":{"id":"msg_1","usage":{"input_tokens":12,"output_tokens":1}}}"#,
            r#"{"type":"content_block_start","index":0,"content_block":{"type":"thinking","thinking":""}}"#,
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"thinking_delta","thinking":"hmm"}}"#,
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"signature_delta","signature":"sig"}}"#,
            r#"{"type":"content_block_start","index":1,"content_block":{"type":"text","text":""}}"#,
            r#"{"type":"content_block_delta","index":1,"delta":{"type":"text_delta","text":"Hello"}}"#,
            r#"{"type":"ping"}"#,
            r#"{"type":"content_block_stop","index":1}"#,
            r#"{"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":7}}"#,
            r#"{"type":"message_stop"}"#,
        ]);

        assert_eq!(turn.text, "Hello");
        assert_eq!(turn.thinking.unwrap().signature.as_deref(), Some("sig"));
        assert_eq!(turn.stop_reason, StopReason::EndTurn);
        let usage = turn.usage.unwrap();
        assert_eq!((usage.input_tokens, usage.output_tokens), (12, 7));
    }

    #[test]
    fn tool_use_stream_assembles_arguments() {
        let turn = decode_all(&[
            r#"{"type":"content_block_start","index":0,"content_block":{"type":"tool_use","id":"toolu_1","name":"read","input":{}}}"#,
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"{\"path\":"}}"#,
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"\"a.rs\"}"}}"#,
            r#"{"type":"message_delta","delta":{"stop_reason":"tool_use"}}"#,
        ]);

        assert_eq!(turn.tool_calls[0].id, "toolu_1");
        assert_eq!(turn.tool_calls[0].arguments, json!({"path": "a.rs"}));
        assert_eq!(turn.stop_reason, StopReason::ToolUse);
    }

    #[test]
    fn rate_limit_error_event_is_rate_limit() {
        let err = AnthropicWire
            .decode_chunk(
                "error",
                r#"{"type":"error","error":{"type":"rate_limit_error","message":"slow down"}}"#,
            )
            .unwrap_err();
        assert!(err.is_rate_limit());
    }

    #[test]
    fn overloaded_error_event_is_stream_error() {
        let err = AnthropicWire
            .decode_chunk(
                "error",
                r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#,
            )
            .unwrap_err();
        assert!(!err.is_rate_limit());
        assert!(err.to_string().contains("Overloaded"));
    }

    #[test]
    fn non_streaming_body_decodes() {
        let pieces = AnthropicWire
            .decode_body(r#"{"content":[{"type":"text","text":"ok"}],"stop_reason":"end_turn"}"#)
            .unwrap();
        assert_eq!(
            pieces,
            vec![
                StreamPiece::Text("ok".to_string()),
                StreamPiece::Finish {
                    raw: "end_turn".to_string(),
                    reason: StopReason::EndTurn
                }
            ]
        );
    }

    #[test]
    fn unknown_body_blocks_are_ignored() {
        let pieces = AnthropicWire
            .decode_body(r#"{"content":[{"type":"redacted_thinking","data":"x"},{"type":"text","text":"ok"}]}"#)
            .unwrap();
        assert_eq!(pieces, vec![StreamPiece::Text("ok".to_string())]);
    }

    #[test]
    fn stop_reason_mapping() {
        assert_eq!(parse_stop_reason("end_turn"), StopReason::EndTurn);
        assert_eq!(parse_stop_reason("max_tokens"), StopReason::MaxTokens);
        assert_eq!(parse_stop_reason("tool_use"), StopReason::ToolUse);
        assert_eq!(parse_stop_reason("stop_sequence"), StopReason::StopSequence);
        assert_eq!(parse_stop_reason("refusal"), StopReason::ContentFilter);
        assert_eq!(parse_stop_reason("something_new"), StopReason::Other);
    }
}
