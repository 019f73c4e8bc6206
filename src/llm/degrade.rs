//! Structural recovery from known provider rejections.
//!
//! Two narrow failures are recovered by changing the request once and
//! resending it:
//!
//! - an HTTP 4xx naming the vendor's optional reasoning field as unsupported
//!   (the field is dropped), and
//! - an HTTP 404 from a provider's deprecated endpoint (the base URL is
//!   rewritten to the replacement).
//!
//! Each kind fires at most once per `complete()` call. Anything else is left
//! to propagate.

use crate::llm::error::ModelError;

/// Words that mark a 4xx body as a parameter rejection.
const UNSUPPORTED_MARKERS: &[&str] = &[
    "unsupported",
    "not supported",
    "unknown",
    "unrecognized",
    "not allowed",
    "extra inputs",
    "not permitted",
];

/// How far, in bytes, a marker may sit from the field name it rejects.
const MARKER_WINDOW: usize = 48;

/// A deprecated endpoint path and its replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointFallback {
    /// Provider tag this applies to
    pub provider: &'static str,
    /// Path segment of the deprecated endpoint
    pub deprecated: &'static str,
    /// Path segment that replaces it
    pub replacement: &'static str,
}

/// Known endpoint migrations.
pub const ENDPOINT_FALLBACKS: &[EndpointFallback] = &[EndpointFallback {
    provider: "zai",
    deprecated: "/api/paas/v4",
    replacement: "/api/coding/paas/v4",
}];

/// The change to make before resending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Degradation {
    /// Resend without this request field
    StripParameter(&'static str),
    /// Resend against this base URL
    SwapEndpoint {
        /// The replacement base URL
        base_url: String,
    },
}

/// Where a `complete()` call is in its degradation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradationState {
    /// The original request is in flight
    Attempt,
    /// A degraded request is in flight
    DegradedAttempt,
    /// A request succeeded
    Done,
    /// A failure had no remaining recovery
    Failed,
}

/// Bounded state machine deciding whether a failure earns a retry.
#[derive(Debug, Clone)]
pub struct DegradationController {
    provider: String,
    strippable: &'static str,
    param_sent: bool,
    param_stripped: bool,
    endpoint_swapped: bool,
    state: DegradationState,
}

impl DegradationController {
    /// Creates a controller for one `complete()` call.
    ///
    /// `param_sent` says whether the request carries `strippable` at all;
    /// a field that was never sent is never stripped.
    #[must_use]
    pub fn new(provider: impl Into<String>, strippable: &'static str, param_sent: bool) -> Self {
        Self {
            provider: provider.into(),
            strippable,
            param_sent,
            param_stripped: false,
            endpoint_swapped: false,
            state: DegradationState::Attempt,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> DegradationState {
        self.state
    }

    /// Fields the next request must leave out.
    #[must_use]
    pub fn omitted(&self) -> Vec<&'static str> {
        if self.param_stripped {
            vec![self.strippable]
        } else {
            Vec::new()
        }
    }

    /// Records a successful attempt.
    pub fn succeeded(&mut self) {
        self.state = DegradationState::Done;
    }

    /// Decides what to do about a failed attempt against `base_url`.
    ///
    /// Returns the degradation to apply, or `None` if the error should
    /// propagate.
    pub fn failed(&mut self, error: &ModelError, base_url: &str) -> Option<Degradation> {
        let next = self.match_failure(error, base_url);
        match &next {
            Some(Degradation::StripParameter(_)) => self.param_stripped = true,
            Some(Degradation::SwapEndpoint { .. }) => self.endpoint_swapped = true,
            None => {}
        }
        self.state = if next.is_some() {
            DegradationState::DegradedAttempt
        } else {
            DegradationState::Failed
        };
        next
    }

    fn match_failure(&self, error: &ModelError, base_url: &str) -> Option<Degradation> {
        if matches!(
            self.state,
            DegradationState::Done | DegradationState::Failed
        ) {
            return None;
        }
        let status = error.status_code()?;
        let body = error.body().unwrap_or_default();

        if !self.endpoint_swapped && status == 404 {
            let request_url = error.request_url().unwrap_or_default();
            if let Some(base_url) = fallback_base_url(&self.provider, request_url, base_url) {
                return Some(Degradation::SwapEndpoint { base_url });
            }
        }

        if !self.param_stripped
            && self.param_sent
            && (400..500).contains(&status)
            && rejects_parameter(body, self.strippable)
        {
            return Some(Degradation::StripParameter(self.strippable));
        }

        None
    }
}

/// Returns the replacement base URL if `request_url` hit a deprecated
/// endpoint known for `provider`.
#[must_use]
pub fn fallback_base_url(provider: &str, request_url: &str, base_url: &str) -> Option<String> {
    ENDPOINT_FALLBACKS
        .iter()
        .filter(|fallback| fallback.provider.eq_ignore_ascii_case(provider))
        .find(|fallback| {
            request_url.contains(&format!("{}/", fallback.deprecated))
                && base_url.contains(fallback.deprecated)
        })
        .map(|fallback| base_url.replacen(fallback.deprecated, fallback.replacement, 1))
}

/// Returns true if a 4xx body says `param` is not accepted.
///
/// A structured `error.param` is decisive either way. Otherwise the error
/// message (or the whole body when it is not JSON) must name the field with
/// a rejection marker close to it; a pydantic-style `loc` naming the field
/// only needs a marker somewhere in the message.
#[must_use]
pub fn rejects_parameter(body: &str, param: &str) -> bool {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let Some(value) = parsed else {
        return marker_near(&body.to_ascii_lowercase(), param);
    };

    let error = value.get("error").unwrap_or(&value);
    if let Some(named) = error.get("param").and_then(|p| p.as_str()) {
        return named == param;
    }

    let message = error
        .as_str()
        .or_else(|| {
            ["message", "detail"]
                .iter()
                .find_map(|key| error.get(*key).and_then(|m| m.as_str()))
        })
        .unwrap_or_default()
        .to_ascii_lowercase();

    let located = error
        .get("loc")
        .and_then(|loc| loc.as_array())
        .is_some_and(|loc| loc.iter().any(|part| part.as_str() == Some(param)));
    if located {
        return UNSUPPORTED_MARKERS.iter().any(|marker| message.contains(marker));
    }

    marker_near(&message, param)
}

/// True if `text` (lowercase) has a rejection marker within
/// [`MARKER_WINDOW`] bytes of an occurrence of `param`.
fn marker_near(text: &str, param: &str) -> bool {
    text.match_indices(param).any(|(start, _)| {
        let mut from = start.saturating_sub(MARKER_WINDOW);
        while !text.is_char_boundary(from) {
            from -= 1;
        }
        let mut to = (start + param.len() + MARKER_WINDOW).min(text.len());
        while !text.is_char_boundary(to) {
            to += 1;
        }
        let window = &text[from..to];
        UNSUPPORTED_MARKERS.iter().any(|marker| window.contains(marker))
    })
}
