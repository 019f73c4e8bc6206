//! Streaming engine.
//!
//! Runs one built request to completion: sends it through a [`Transport`],
//! decodes each frame with the vendor's [`WireFormat`], hands visible deltas
//! to the caller's callback in order, and folds everything into a [`Turn`].
//!
//! Transient failures (connect errors, dropped bodies, timeouts) are retried
//! here with the identical request, but only while no delta of the failed
//! attempt has reached the caller. Once the caller has seen part of a
//! response, a failure ends the call.

use crate::llm::classify::{classify, classify_finish_reason};
use crate::llm::client::WireFormat;
use crate::llm::config::{ContentDeltaFn, RetryConfig};
use crate::llm::error::ModelError;
use crate::llm::streaming::{DeltaEvent, StreamAccumulator, Turn};
use crate::llm::transport::{Frame, HttpRequest, Timeouts, Transport};
use std::panic::{self, AssertUnwindSafe};
use tokio::time::Instant;

/// Borrowed collaborators for one request.
#[derive(Clone, Copy)]
pub(crate) struct Engine<'a> {
    pub transport: &'a dyn Transport,
    pub wire: &'a dyn WireFormat,
    pub retry: &'a RetryConfig,
    pub on_delta: Option<&'a ContentDeltaFn>,
}

impl Engine<'_> {
    /// Sends `request` until it succeeds, fails permanently, or transient
    /// retries run out.
    pub(crate) async fn run(
        &self,
        request: &HttpRequest,
        timeouts: &Timeouts,
    ) -> Result<Turn, ModelError> {
        let mut attempt: u32 = 0;
        loop {
            tracing::debug!(url = %request.url, attempt, stream = request.stream, "sending model request");

            let mut accumulator = StreamAccumulator::new();
            let mut emitted = false;
            let result = {
                let wire = self.wire;
                let on_delta = self.on_delta;
                let emit_deltas = request.stream;
                let mut on_frame = |frame: Frame| -> Result<(), ModelError> {
                    let pieces = match frame {
                        Frame::Chunk { event, data } => wire.decode_chunk(&event, &data)?,
                        Frame::Body(body) => wire.decode_body(&body)?,
                    };
                    for piece in pieces {
                        if emit_deltas {
                            if let Some(delta) = piece.as_delta() {
                                emitted = true;
                                deliver(on_delta, &delta);
                            }
                        }
                        accumulator.apply(piece);
                    }
                    Ok(())
                };
                self.transport.execute(request, timeouts, &mut on_frame).await
            };

            let error = match result {
                Ok(()) => {
                    if let Some(error) = accumulator.finish_reason().and_then(classify_finish_reason) {
                        tracing::warn!(reason = ?accumulator.finish_reason(), "model response ended by rate limiting");
                        return Err(error);
                    }
                    return Ok(accumulator.finish());
                }
                Err(error) => error,
            };

            let retryable = error.is_transient()
                && !emitted
                && attempt < self.retry.max_retries
                && timeouts
                    .deadline
                    .map_or(true, |deadline| Instant::now() < deadline);
            if !retryable {
                if emitted && error.is_transient() {
                    tracing::warn!(error = %error, "stream failed after output was delivered; not retrying");
                }
                return Err(classify(error, attempt + 1));
            }

            attempt += 1;
            let backoff = self.retry.backoff_for_attempt(attempt);
            tracing::warn!(
                error = %error,
                attempt,
                max_retries = self.retry.max_retries,
                backoff_ms = backoff.as_millis() as u64,
                "transient model request failure; retrying"
            );
            let wake = Instant::now() + backoff;
            let wake = match timeouts.deadline {
                Some(deadline) if deadline < wake => deadline,
                _ => wake,
            };
            tokio::time::sleep_until(wake).await;
        }
    }
}

/// Hands one delta to the caller. A panicking callback is logged and the
/// stream continues.
fn deliver(on_delta: Option<&ContentDeltaFn>, delta: &DeltaEvent) {
    let Some(callback) = on_delta else {
        return;
    };
    let result = panic::catch_unwind(AssertUnwindSafe(|| callback(delta.kind, &delta.fragment)));
    if result.is_err() {
        tracing::warn!(kind = %delta.kind, "content delta callback panicked; continuing stream");
    }
}
