//! HTTP transport for one model request attempt.
//!
//! A [`Transport`] sends one POST, enforces the first-byte and total-stream
//! timeouts, and hands each response frame to a callback as it arrives.
//! Retrying is the engine's job; a transport never retries.

use crate::llm::error::{ModelError, TimeoutPhase};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::Client;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// A fully built request, reused unchanged across retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Absolute endpoint URL
    pub url: String,
    /// Headers to send, in order
    pub headers: Vec<(String, String)>,
    /// Serialized JSON body
    pub body: String,
    /// Whether a streamed response was requested
    pub stream: bool,
}

/// Time limits for one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Limit on waiting for response headers
    pub first_byte: Duration,
    /// Limit on the whole attempt
    pub total: Duration,
    /// Caller deadline, if any; caps both limits
    pub deadline: Option<Instant>,
}

/// One unit of response content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// One SSE event or one JSON line
    Chunk {
        /// SSE event name; empty for unnamed events and JSON lines
        event: String,
        /// The event payload
        data: String,
    },
    /// A complete non-streamed response body
    Body(String),
}

/// Why an attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The server answered with a non-2xx status
    Status {
        /// HTTP status code
        status: u16,
        /// The URL the request was sent to
        url: String,
        /// Raw response body
        body: String,
        /// Parsed `retry-after` header
        retry_after: Option<Duration>,
    },
    /// The request could not be sent
    Connect(String),
    /// A time limit expired
    Timeout {
        /// Which limit expired
        phase: TimeoutPhase,
        /// The limit
        after: Duration,
    },
    /// Reading the response body failed
    Body(String),
    /// The frame handler rejected a frame
    Aborted(ModelError),
}

impl TransportError {
    /// Returns true for failures that an identical retry may fix.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connect(_) | Self::Body(_) => true,
            Self::Timeout { phase, .. } => *phase != TimeoutPhase::Deadline,
            Self::Status { .. } | Self::Aborted(_) => false,
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status { status, url, .. } => write!(f, "HTTP {} from {}", status, url),
            Self::Connect(message) => write!(f, "request failed: {}", message),
            Self::Timeout { phase, after } => {
                write!(f, "{} timeout after {:.1}s", phase, after.as_secs_f64())
            }
            Self::Body(message) => write!(f, "response body failed: {}", message),
            Self::Aborted(error) => write!(f, "{}", error),
        }
    }
}

/// Callback receiving frames in arrival order.
pub type FrameHandler<'a> = dyn FnMut(Frame) -> Result<(), ModelError> + Send + 'a;

/// Executes one request attempt.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Sends `request` and feeds every frame of the response to `on_frame`.
    ///
    /// Returns once the response has been fully consumed. The response is
    /// dropped before this returns, whatever the outcome.
    async fn execute(
        &self,
        request: &HttpRequest,
        timeouts: &Timeouts,
        on_frame: &mut FrameHandler<'_>,
    ) -> Result<(), TransportError>;
}

/// [`Transport`] over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport that keeps no idle connections between attempts.
    ///
    /// # Errors
    ///
    /// Returns a network error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, ModelError> {
        let client = Client::builder()
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| ModelError::network(format!("failed to create HTTP client: {}", e), 0))?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(
        &self,
        request: &HttpRequest,
        timeouts: &Timeouts,
        on_frame: &mut FrameHandler<'_>,
    ) -> Result<(), TransportError> {
        let start = Instant::now();
        let (stream_end, stream_phase) = match timeouts.deadline {
            Some(deadline) if deadline < start + timeouts.total => {
                (deadline, TimeoutPhase::Deadline)
            }
            _ => (start + timeouts.total, TimeoutPhase::Stream),
        };
        let (first_byte_end, first_byte_phase) = if start + timeouts.first_byte < stream_end {
            (start + timeouts.first_byte, TimeoutPhase::FirstByte)
        } else {
            (stream_end, stream_phase)
        };

        let mut builder = self.client.post(&request.url).body(request.body.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = match tokio::time::timeout_at(first_byte_end, builder.send()).await {
            Err(_) => {
                return Err(TransportError::Timeout {
                    phase: first_byte_phase,
                    after: first_byte_end.saturating_duration_since(start),
                })
            }
            Ok(Err(e)) => return Err(TransportError::Connect(e.to_string())),
            Ok(Ok(response)) => response,
        };

        let stream_timeout = TransportError::Timeout {
            phase: stream_phase,
            after: stream_end.saturating_duration_since(start),
        };

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            let body = match tokio::time::timeout_at(stream_end, response.text()).await {
                Ok(Ok(body)) => body,
                Ok(Err(e)) => unreadable_body(status.as_u16(), &e),
                Err(_) => return Err(stream_timeout),
            };
            return Err(TransportError::Status {
                status: status.as_u16(),
                url: request.url.clone(),
                body,
                retry_after,
            });
        }

        match tokio::time::timeout_at(stream_end, read_body(response, request.stream, on_frame))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(stream_timeout),
        }
    }
}

/// Stands in for an error body that could not be read.
fn unreadable_body(status: u16, error: &dyn fmt::Display) -> String {
    tracing::debug!(status, error = %error, "could not read error response body");
    format!("<error body unreadable: {}>", error)
}

async fn read_body(
    response: reqwest::Response,
    stream: bool,
    on_frame: &mut FrameHandler<'_>,
) -> Result<(), TransportError> {
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if !stream || content_type.starts_with("application/json") {
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;
        return on_frame(Frame::Body(body)).map_err(TransportError::Aborted);
    }

    if content_type.starts_with("text/event-stream") {
        let mut events = response.bytes_stream().eventsource();
        while let Some(event) = events.next().await {
            let event = event.map_err(|e| TransportError::Body(e.to_string()))?;
            let data = event.data.trim();
            if data == "[DONE]" {
                break;
            }
            if data.is_empty() {
                continue;
            }
            on_frame(Frame::Chunk {
                event: event.event,
                data: event.data,
            })
            .map_err(TransportError::Aborted)?;
        }
        return Ok(());
    }

    // Chunked JSON lines
    let mut bytes = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();
    while let Some(chunk) = bytes.next().await {
        let chunk = chunk.map_err(|e| TransportError::Body(e.to_string()))?;
        buffer.extend_from_slice(&chunk);
        while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=pos).collect();
            if !emit_line(&line, on_frame)? {
                return Ok(());
            }
        }
    }
    emit_line(&buffer, on_frame)?;
    Ok(())
}

/// Emits one JSON line. Returns false once the end marker is seen.
fn emit_line(line: &[u8], on_frame: &mut FrameHandler<'_>) -> Result<bool, TransportError> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    let data = line.strip_prefix("data:").map_or(line, str::trim_start);
    if data == "[DONE]" {
        return Ok(false);
    }
    if data.is_empty() {
        return Ok(true);
    }
    on_frame(Frame::Chunk {
        event: String::new(),
        data: data.to_string(),
    })
    .map_err(TransportError::Aborted)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(line: &str) -> (bool, Vec<Frame>) {
        let mut frames = Vec::new();
        let more = emit_line(line.as_bytes(), &mut |frame| {
            frames.push(frame);
            Ok(())
        })
        .unwrap();
        (more, frames)
    }

    #[test]
    fn unreadable_error_body_keeps_the_reason() {
        let body = unreadable_body(502, &"connection reset by peer");
        assert!(body.contains("connection reset by peer"));
        assert!(body.contains("unreadable"));
    }

    #[test]
    fn json_line_becomes_unnamed_chunk() {
        let (more, frames) = collect("{\"a\":1}\n");
        assert!(more);
        assert_eq!(
            frames,
            vec![Frame::Chunk {
                event: String::new(),
                data: "{\"a\":1}".to_string()
            }]
        );
    }

    #[test]
    fn data_prefix_is_stripped_from_json_lines() {
        let (_, frames) = collect("data: {\"a\":1}");
        assert_eq!(
            frames,
            vec![Frame::Chunk {
                event: String::new(),
                data: "{\"a\":1}".to_string()
            }]
        );
    }

    #[test]
    fn blank_lines_are_skipped() {
        let (more, frames) = collect("   \r\n");
        assert!(more);
        assert!(frames.is_empty());
    }

    #[test]
    fn done_marker_ends_json_lines() {
        let (more, frames) = collect("data: [DONE]");
        assert!(!more);
        assert!(frames.is_empty());
    }

    #[test]
    fn handler_errors_abort() {
        let err = emit_line(b"{}", &mut |_| Err(ModelError::malformed("bad"))).unwrap_err();
        assert_eq!(err, TransportError::Aborted(ModelError::malformed("bad")));
        assert!(!err.is_transient());
    }

    #[test]
    fn transient_classification() {
        assert!(TransportError::Connect("refused".to_string()).is_transient());
        assert!(TransportError::Body("reset".to_string()).is_transient());
        assert!(TransportError::Timeout {
            phase: TimeoutPhase::FirstByte,
            after: Duration::from_secs(10)
        }
        .is_transient());
        assert!(!TransportError::Timeout {
            phase: TimeoutPhase::Deadline,
            after: Duration::from_secs(1)
        }
        .is_transient());
        assert!(!TransportError::Status {
            status: 500,
            url: "u".to_string(),
            body: String::new(),
            retry_after: None
        }
        .is_transient());
    }
}
