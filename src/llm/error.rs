//! Model client error types.
//!
//! Every failure that leaves [`complete`](crate::llm::ModelClient::complete)
//! is a [`ModelError`]. Two kinds are singled out because callers act on
//! them: [`ModelErrorKind::Http`] (a non-2xx response with its raw body) and
//! [`ModelErrorKind::RateLimited`] (the vendor asked us to back off).

use std::fmt;
use std::time::Duration;

/// Errors that can occur while completing a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelError {
    /// The specific error that occurred
    pub kind: ModelErrorKind,
}

/// Which timeout expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutPhase {
    /// No response headers arrived in time
    FirstByte,
    /// The stream did not finish in time
    Stream,
    /// The caller's deadline passed
    Deadline,
}

impl fmt::Display for TimeoutPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstByte => write!(f, "first byte"),
            Self::Stream => write!(f, "stream"),
            Self::Deadline => write!(f, "deadline"),
        }
    }
}

/// Specific model error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelErrorKind {
    /// The vendor answered with a non-2xx status
    Http {
        /// HTTP status code
        status_code: u16,
        /// The URL the request was sent to
        url: String,
        /// Raw response body, unparsed
        body: String,
    },
    /// The vendor signalled throttling
    RateLimited {
        /// The vendor's own reason string
        reason: String,
        /// How long the vendor asked us to wait, if it said
        retry_after: Option<Duration>,
    },
    /// The connection failed and local retries were exhausted
    Network {
        /// Description of the network error
        message: String,
        /// Number of attempts made before giving up
        attempts: u32,
    },
    /// A timeout expired and local retries were exhausted
    Timeout {
        /// Which timeout expired
        phase: TimeoutPhase,
        /// The limit that was exceeded
        duration: Duration,
        /// Number of attempts made before giving up
        attempts: u32,
    },
    /// The vendor sent something we could not interpret
    MalformedResponse {
        /// Description of the problem
        message: String,
    },
    /// The vendor reported an error inside an otherwise healthy stream
    StreamError {
        /// Vendor error type
        error_type: String,
        /// Vendor error message
        message: String,
    },
    /// Configuration error
    InvalidConfig {
        /// The configuration field that was invalid
        field: String,
        /// Why it was invalid
        reason: String,
    },
}

impl ModelError {
    /// Creates a new ModelError with the given kind.
    #[must_use]
    pub fn new(kind: ModelErrorKind) -> Self {
        Self { kind }
    }

    /// Creates an HTTP error carrying the raw response body.
    #[must_use]
    pub fn http(status_code: u16, url: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(ModelErrorKind::Http {
            status_code,
            url: url.into(),
            body: body.into(),
        })
    }

    /// Creates a rate limited error.
    #[must_use]
    pub fn rate_limited(reason: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self::new(ModelErrorKind::RateLimited {
            reason: reason.into(),
            retry_after,
        })
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>, attempts: u32) -> Self {
        Self::new(ModelErrorKind::Network {
            message: message.into(),
            attempts,
        })
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(phase: TimeoutPhase, duration: Duration, attempts: u32) -> Self {
        Self::new(ModelErrorKind::Timeout {
            phase,
            duration,
            attempts,
        })
    }

    /// Creates a malformed response error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ModelErrorKind::MalformedResponse {
            message: message.into(),
        })
    }

    /// Creates an in-stream vendor error.
    #[must_use]
    pub fn stream_error(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ModelErrorKind::StreamError {
            error_type: error_type.into(),
            message: message.into(),
        })
    }

    /// Creates an invalid config error.
    #[must_use]
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ModelErrorKind::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        })
    }

    /// Returns true if the vendor answered with a non-2xx status.
    #[must_use]
    pub fn is_http(&self) -> bool {
        matches!(self.kind, ModelErrorKind::Http { .. })
    }

    /// Returns true if the vendor signalled throttling.
    #[must_use]
    pub fn is_rate_limit(&self) -> bool {
        matches!(self.kind, ModelErrorKind::RateLimited { .. })
    }

    /// Returns true if this error was a network failure or timeout.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            ModelErrorKind::Network { .. } | ModelErrorKind::Timeout { .. }
        )
    }

    /// Returns true for configuration errors.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self.kind, ModelErrorKind::InvalidConfig { .. })
    }

    /// Returns the HTTP status code for HTTP errors.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match &self.kind {
            ModelErrorKind::Http { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// Returns the raw response body for HTTP errors.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        match &self.kind {
            ModelErrorKind::Http { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Returns the request URL for HTTP errors.
    #[must_use]
    pub fn request_url(&self) -> Option<&str> {
        match &self.kind {
            ModelErrorKind::Http { url, .. } => Some(url),
            _ => None,
        }
    }

    /// Returns the retry-after duration if the vendor supplied one.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match &self.kind {
            ModelErrorKind::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ModelErrorKind::Http {
                status_code,
                url,
                body,
            } => {
                write!(f, "HTTP {} calling {}: {}", status_code, url, body)
            }
            ModelErrorKind::RateLimited {
                reason,
                retry_after,
            } => match retry_after {
                Some(wait) => write!(
                    f,
                    "rate limited by provider ({}); retry after {} seconds",
                    reason,
                    wait.as_secs()
                ),
                None => write!(
                    f,
                    "rate limited by provider ({}); back off before retrying",
                    reason
                ),
            },
            ModelErrorKind::Network { message, attempts } => {
                write!(
                    f,
                    "network error after {} attempt(s): {}; check network connectivity",
                    attempts, message
                )
            }
            ModelErrorKind::Timeout {
                phase,
                duration,
                attempts,
            } => {
                write!(
                    f,
                    "{} timeout of {:.1}s exceeded after {} attempt(s)",
                    phase,
                    duration.as_secs_f64(),
                    attempts
                )
            }
            ModelErrorKind::MalformedResponse { message } => {
                write!(f, "malformed model response: {}", message)
            }
            ModelErrorKind::StreamError {
                error_type,
                message,
            } => {
                write!(f, "provider stream error ({}): {}", error_type, message)
            }
            ModelErrorKind::InvalidConfig { field, reason } => {
                write!(f, "invalid configuration for '{}': {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ModelError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_display_includes_status_url_and_body() {
        let error = ModelError::http(
            400,
            "https://api.openai.com/v1/chat/completions",
            r#"{"error":{"param":"reasoning_effort"}}"#,
        );

        let message = error.to_string();
        assert!(message.starts_with("HTTP 400 calling https://api.openai.com"));
        assert!(message.contains("reasoning_effort"));
    }

    #[test]
    fn http_accessors_expose_status_and_body() {
        let error = ModelError::http(404, "https://x/y", "not found");

        assert!(error.is_http());
        assert_eq!(error.status_code(), Some(404));
        assert_eq!(error.body(), Some("not found"));
        assert_eq!(error.request_url(), Some("https://x/y"));
    }

    #[test]
    fn non_http_errors_have_no_status() {
        let error = ModelError::malformed("missing choices");

        assert!(!error.is_http());
        assert_eq!(error.status_code(), None);
        assert_eq!(error.body(), None);
    }

    #[test]
    fn rate_limited_display_with_retry_after() {
        let error = ModelError::rate_limited("rate_limit", Some(Duration::from_secs(30)));

        let message = error.to_string();
        assert!(message.contains("rate limited"));
        assert!(message.contains("30"));
        assert!(error.is_rate_limit());
        assert_eq!(error.retry_after(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn rate_limited_display_without_retry_after() {
        let error = ModelError::rate_limited("too_many_requests", None);
        assert!(error.to_string().contains("back off"));
        assert_eq!(error.retry_after(), None);
    }

    #[test]
    fn timeout_display_names_phase_and_attempts() {
        let error = ModelError::timeout(TimeoutPhase::FirstByte, Duration::from_secs(10), 4);

        let message = error.to_string();
        assert!(message.contains("first byte"));
        assert!(message.contains("10.0s"));
        assert!(message.contains("4 attempt"));
        assert!(error.is_transient());
    }

    #[test]
    fn http_errors_are_not_transient() {
        assert!(!ModelError::http(503, "u", "overloaded").is_transient());
        assert!(ModelError::network("reset", 1).is_transient());
    }

    #[test]
    fn invalid_config_is_configuration() {
        let error = ModelError::invalid_config("reasoning_effort", "unknown level 'extreme'");
        assert!(error.is_configuration());
        assert!(error.to_string().contains("reasoning_effort"));
    }

    #[test]
    fn errors_are_clone_and_eq() {
        let error1 = ModelError::network("connection refused", 3);
        let error2 = error1.clone();
        assert_eq!(error1, error2);
        assert_ne!(error1, ModelError::network("connection reset", 3));
    }
}
