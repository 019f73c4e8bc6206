//! Failure classification.
//!
//! Maps raw transport failures, vendor finish reasons and in-stream vendor
//! errors onto [`ModelError`]. Classification is structural: status codes,
//! known reason strings and known error types. Message text is never parsed
//! here.

use crate::llm::error::ModelError;
use crate::llm::transport::TransportError;

/// Finish/stop reasons that mean the vendor throttled the response.
pub const RATE_LIMIT_REASONS: &[&str] = &[
    "rate_limit",
    "rate_limited",
    "rate_limit_exceeded",
    "too_many_requests",
    "throttled",
];

/// Converts a failed attempt into the error the caller sees.
///
/// `attempts` is how many times the request was sent.
#[must_use]
pub fn classify(error: TransportError, attempts: u32) -> ModelError {
    match error {
        TransportError::Status {
            status: 429,
            body,
            retry_after,
            ..
        } => ModelError::rate_limited(rate_limit_reason(&body), retry_after),
        TransportError::Status {
            status, url, body, ..
        } => ModelError::http(status, url, body),
        TransportError::Connect(message) | TransportError::Body(message) => {
            ModelError::network(message, attempts)
        }
        TransportError::Timeout { phase, after } => ModelError::timeout(phase, after, attempts),
        TransportError::Aborted(error) => error,
    }
}

/// Returns a rate-limit error if `reason` is a throttling finish reason.
#[must_use]
pub fn classify_finish_reason(reason: &str) -> Option<ModelError> {
    let normalized = reason.trim().to_ascii_lowercase();
    RATE_LIMIT_REASONS
        .contains(&normalized.as_str())
        .then(|| ModelError::rate_limited(reason.trim(), None))
}

/// Converts an error reported inside a stream.
#[must_use]
pub fn classify_stream_error(error_type: &str, message: &str) -> ModelError {
    if error_type == "rate_limit_error" || classify_finish_reason(error_type).is_some() {
        ModelError::rate_limited(error_type, None)
    } else {
        ModelError::stream_error(error_type, message)
    }
}

/// Picks the vendor's error type out of a 429 body, if it has one.
fn rate_limit_reason(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            let error = value.get("error")?;
            error
                .get("type")
                .or_else(|| error.get("code"))
                .and_then(|v| v.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| "HTTP 429".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::error::{ModelErrorKind, TimeoutPhase};
    use std::time::Duration;

    fn status(code: u16, body: &str) -> TransportError {
        TransportError::Status {
            status: code,
            url: "https://api.example.com/v1/chat/completions".to_string(),
            body: body.to_string(),
            retry_after: None,
        }
    }

    #[test]
    fn http_status_keeps_code_and_raw_body() {
        let error = classify(status(400, "{\"error\":{}}"), 1);

        assert_eq!(error.status_code(), Some(400));
        assert_eq!(error.body(), Some("{\"error\":{}}"));
        assert!(error.request_url().unwrap().ends_with("/chat/completions"));
    }

    #[test]
    fn status_429_is_rate_limit_with_retry_after() {
        let error = classify(
            TransportError::Status {
                status: 429,
                url: "u".to_string(),
                body: r#"{"error":{"type":"rate_limit_error","message":"slow down"}}"#.to_string(),
                retry_after: Some(Duration::from_secs(20)),
            },
            1,
        );

        assert!(error.is_rate_limit());
        assert_eq!(error.retry_after(), Some(Duration::from_secs(20)));
        assert!(error.to_string().contains("rate_limit_error"));
    }

    #[test]
    fn status_429_without_json_body_still_rate_limits() {
        let error = classify(status(429, "Too Many Requests"), 1);
        assert!(error.is_rate_limit());
        assert!(error.to_string().contains("HTTP 429"));
    }

    #[test]
    fn server_errors_stay_http() {
        let error = classify(status(503, "overloaded"), 1);
        assert!(error.is_http());
        assert!(!error.is_rate_limit());
    }

    #[test]
    fn exhausted_network_failure_reports_attempts() {
        let error = classify(TransportError::Connect("connection refused".to_string()), 4);
        assert_eq!(
            error.kind,
            ModelErrorKind::Network {
                message: "connection refused".to_string(),
                attempts: 4
            }
        );
    }

    #[test]
    fn timeout_keeps_phase() {
        let error = classify(
            TransportError::Timeout {
                phase: TimeoutPhase::Stream,
                after: Duration::from_secs(120),
            },
            2,
        );
        assert!(error.to_string().starts_with("stream timeout"));
    }

    #[test]
    fn aborted_passes_through() {
        let inner = ModelError::malformed("bad frame");
        assert_eq!(classify(TransportError::Aborted(inner.clone()), 1), inner);
    }

    #[test]
    fn finish_reason_rate_limit_variants() {
        for reason in RATE_LIMIT_REASONS {
            assert!(classify_finish_reason(reason).unwrap().is_rate_limit());
        }
        assert!(classify_finish_reason("RATE_LIMIT").is_some());
    }

    #[test]
    fn ordinary_finish_reasons_are_not_errors() {
        for reason in ["stop", "length", "tool_calls", "end_turn", "content_filter"] {
            assert!(classify_finish_reason(reason).is_none());
        }
    }

    #[test]
    fn stream_rate_limit_error_is_rate_limit() {
        assert!(classify_stream_error("rate_limit_error", "slow down").is_rate_limit());
    }

    #[test]
    fn other_stream_errors_are_stream_errors() {
        let error = classify_stream_error("overloaded_error", "Overloaded");
        assert!(!error.is_rate_limit());
        assert!(error.to_string().contains("overloaded_error"));
    }
}
