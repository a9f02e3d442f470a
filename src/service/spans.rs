use std::time::Instant;

use tracing::Span;

use super::status::Status;
use crate::session::SessionId;

pub(super) fn request_span(method: &'static str, session_id: Option<SessionId>) -> Span {
    let span = tracing::info_span!(
        "rpc",
        method,
        session_id = tracing::field::Empty,
    );
    if let Some(session_id) = session_id {
        span.record("session_id", session_id);
    }
    span
}

pub(super) fn record_outcome<T>(
    method: &'static str,
    started_at: Instant,
    result: &Result<T, Status>,
) {
    let elapsed_us = u64::try_from(started_at.elapsed().as_micros()).unwrap_or(u64::MAX);
    match result {
        Ok(_) => tracing::debug!(method, elapsed_us, "rpc completed"),
        Err(status) => tracing::debug!(
            method,
            elapsed_us,
            code = %status.code,
            message = %status.message,
            "rpc failed"
        ),
    }
}
