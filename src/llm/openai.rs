//! OpenAI-compatible wire format.
//!
//! Chat completions as spoken by OpenAI, OpenRouter, Z.ai, Ollama, vLLM and
//! other compatible endpoints.

use crate::conversation::Conversation;
use crate::llm::classify::classify_stream_error;
use crate::llm::client::WireFormat;
use crate::llm::config::{ModelConfig, ProviderFamily};
use crate::llm::error::ModelError;
use crate::llm::streaming::StreamPiece;
use crate::messages::{Message, MessageRole, StopReason, ToolCall, ToolDefinition, Usage};
use serde::{Deserialize, Serialize};

/// The field OpenAI-compatible servers reject on non-reasoning models.
pub const REASONING_EFFORT_PARAM: &str = "reasoning_effort";

/// [`WireFormat`] for `/chat/completions`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAIWire;

/// Request body for OpenAI chat completions API.
#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking: Option<ThinkingMode<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
}

/// `thinking` switch used by GLM-style servers.
#[derive(Debug, Clone, Serialize)]
struct ThinkingMode<'a> {
    #[serde(rename = "type")]
    mode: &'a str,
}

/// A message in OpenAI format.
#[derive(Debug, Clone, Serialize)]
struct OpenAIMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

/// The `message` of a non-streaming choice. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAIToolCall>>,
}

/// A tool definition in OpenAI format.
#[derive(Debug, Clone, Serialize)]
struct OpenAITool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: OpenAIFunction,
}

/// A function definition in OpenAI format.
#[derive(Debug, Clone, Serialize)]
struct OpenAIFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

/// A tool call in OpenAI format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIToolCall {
    #[serde(default)]
    id: String,
    #[serde(rename = "type", default = "function_type")]
    call_type: String,
    function: OpenAIFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

/// A function call in OpenAI format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

/// Token usage in OpenAI format.
#[derive(Debug, Clone, Copy, Deserialize)]
struct OpenAIUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

/// An error object, sent in place of choices.
#[derive(Debug, Clone, Deserialize)]
struct OpenAIErrorBody {
    #[serde(default, rename = "type")]
    error_type: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    message: String,
}

/// Non-streaming response from OpenAI API.
#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
    #[serde(default)]
    error: Option<OpenAIErrorBody>,
}

/// A choice in the response.
#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionChoice {
    #[serde(default)]
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

/// Streaming chunk from OpenAI API.
#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChatCompletionChunkChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
    #[serde(default)]
    error: Option<OpenAIErrorBody>,
}

/// A choice in a streaming chunk.
#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionChunkChoice {
    #[serde(default)]
    delta: ChatCompletionDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

/// Delta content in a streaming chunk.
#[derive(Debug, Clone, Default, Deserialize)]
struct ChatCompletionDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAIToolCallDelta>>,
}

/// Tool call delta in streaming.
#[derive(Debug, Clone, Deserialize)]
struct OpenAIToolCallDelta {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<OpenAIFunctionCallDelta>,
}

/// Function call delta in streaming.
#[derive(Debug, Clone, Deserialize)]
struct OpenAIFunctionCallDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

impl OpenAIWire {
    /// Converts our Message type to OpenAI format.
    fn convert_message(msg: &Message) -> OpenAIMessage {
        let tool_calls = msg.tool_calls.as_ref().filter(|calls| !calls.is_empty()).map(|calls| {
            calls
                .iter()
                .map(|tc| OpenAIToolCall {
                    id: tc.id.clone(),
                    call_type: function_type(),
                    function: OpenAIFunctionCall {
                        name: tc.name.clone(),
                        arguments: arguments_text(tc),
                    },
                })
                .collect()
        });

        // Assistant tool-call messages carry no content when there is no text
        let content = if tool_calls.is_some() && msg.content.is_empty() {
            None
        } else {
            Some(msg.content.clone())
        };

        OpenAIMessage {
            role: msg.role.to_string(),
            content,
            tool_calls,
            tool_call_id: msg.tool_call_id.clone(),
        }
    }

    /// Converts tool definitions to OpenAI format.
    fn convert_tools(tools: &[ToolDefinition]) -> Vec<OpenAITool> {
        tools
            .iter()
            .map(|t| OpenAITool {
                tool_type: "function",
                function: OpenAIFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.input_schema.clone(),
                },
            })
            .collect()
    }

    fn error_from_body(error: OpenAIErrorBody) -> ModelError {
        let error_type = error
            .error_type
            .or_else(|| match error.code {
                Some(serde_json::Value::String(code)) => Some(code),
                Some(serde_json::Value::Number(code)) => Some(code.to_string()),
                _ => None,
            })
            .unwrap_or_else(|| "error".to_string());
        classify_stream_error(&error_type, &error.message)
    }
}

/// Serializes tool call arguments the way OpenAI expects them: a JSON string.
fn arguments_text(tc: &ToolCall) -> String {
    match &tc.arguments {
        serde_json::Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}

fn usage_piece(usage: OpenAIUsage) -> StreamPiece {
    StreamPiece::Usage(Usage {
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
    })
}

fn finish_piece(raw: String) -> StreamPiece {
    let reason = parse_stop_reason(&raw);
    StreamPiece::Finish { raw, reason }
}

/// Converts an OpenAI finish reason to our `StopReason` enum.
#[must_use]
pub fn parse_stop_reason(reason: &str) -> StopReason {
    match reason {
        "stop" => StopReason::EndTurn,
        "length" => StopReason::MaxTokens,
        "tool_calls" | "function_call" => StopReason::ToolUse,
        "content_filter" => StopReason::ContentFilter,
        _ => StopReason::Other,
    }
}

impl WireFormat for OpenAIWire {
    fn family(&self) -> ProviderFamily {
        ProviderFamily::OpenAICompatible
    }

    fn endpoint(&self, base_url: &str) -> String {
        format!("{}/chat/completions", base_url.trim_end_matches('/'))
    }

    fn headers(&self, config: &ModelConfig) -> Vec<(String, String)> {
        let mut headers = vec![("content-type".to_string(), "application/json".to_string())];
        if !config.api_key.is_empty() {
            headers.push((
                "authorization".to_string(),
                format!("Bearer {}", config.api_key),
            ));
        }
        headers
    }

    fn strippable_param(&self) -> &'static str {
        REASONING_EFFORT_PARAM
    }

    fn build_payload(
        &self,
        conversation: &Conversation,
        config: &ModelConfig,
        omitted: &[&str],
    ) -> Result<String, ModelError> {
        let mut messages = Vec::with_capacity(conversation.len() + 1);
        if !conversation.system_prompt().is_empty() {
            messages.push(Self::convert_message(&Message::system(
                conversation.system_prompt(),
            )));
        }
        messages.extend(
            conversation
                .messages()
                .iter()
                .filter(|m| m.role != MessageRole::System)
                .map(Self::convert_message),
        );

        let request = ChatCompletionRequest {
            model: &config.model,
            messages,
            stream: config.stream,
            reasoning_effort: config
                .reasoning_effort
                .filter(|_| !omitted.contains(&REASONING_EFFORT_PARAM))
                .map(|effort| effort.as_str()),
            thinking: config
                .thinking_type
                .as_deref()
                .map(|mode| ThinkingMode { mode }),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            tools: (!config.tools.is_empty()).then(|| Self::convert_tools(&config.tools)),
        };

        serde_json::to_string(&request)
            .map_err(|e| ModelError::invalid_config("payload", e.to_string()))
    }

    fn decode_chunk(&self, _event: &str, data: &str) -> Result<Vec<StreamPiece>, ModelError> {
        let chunk: ChatCompletionChunk = serde_json::from_str(data)
            .map_err(|e| ModelError::malformed(format!("invalid stream chunk: {}", e)))?;

        if let Some(error) = chunk.error {
            return Err(Self::error_from_body(error));
        }

        let mut pieces = Vec::new();
        for choice in chunk.choices {
            let delta = choice.delta;
            if let Some(thinking) = delta.reasoning_content.or(delta.reasoning) {
                if !thinking.is_empty() {
                    pieces.push(StreamPiece::Thinking(thinking));
                }
            }
            if let Some(content) = delta.content {
                if !content.is_empty() {
                    pieces.push(StreamPiece::Text(content));
                }
            }
            for call in delta.tool_calls.unwrap_or_default() {
                let (name, arguments) = match call.function {
                    Some(f) => (f.name.filter(|n| !n.is_empty()), f.arguments.unwrap_or_default()),
                    None => (None, String::new()),
                };
                pieces.push(StreamPiece::ToolCall {
                    index: call.index,
                    id: call.id.filter(|id| !id.is_empty()),
                    name,
                    arguments,
                });
            }
            if let Some(reason) = choice.finish_reason {
                pieces.push(finish_piece(reason));
            }
        }
        if let Some(usage) = chunk.usage {
            pieces.push(usage_piece(usage));
        }
        Ok(pieces)
    }

    fn decode_body(&self, body: &str) -> Result<Vec<StreamPiece>, ModelError> {
        let response: ChatCompletionResponse = serde_json::from_str(body)
            .map_err(|e| ModelError::malformed(format!("invalid response body: {}", e)))?;

        if let Some(error) = response.error {
            return Err(Self::error_from_body(error));
        }

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::malformed("response has no choices"))?;

        let mut pieces = Vec::new();
        let message = choice.message;
        if let Some(thinking) = message
            .reasoning_content
            .or(message.reasoning)
            .filter(|t| !t.is_empty())
        {
            pieces.push(StreamPiece::Thinking(thinking));
        }
        if let Some(content) = message.content.filter(|c| !c.is_empty()) {
            pieces.push(StreamPiece::Text(content));
        }
        for (index, call) in message.tool_calls.unwrap_or_default().into_iter().enumerate() {
            pieces.push(StreamPiece::ToolCall {
                index,
                id: Some(call.id).filter(|id| !id.is_empty()),
                name: Some(call.function.name),
                arguments: call.function.arguments,
            });
        }
        if let Some(reason) = choice.finish_reason {
            pieces.push(finish_piece(reason));
        }
        if let Some(usage) = response.usage {
            pieces.push(usage_piece(usage));
        }
        Ok(pieces)
    }
}
