//! Per-request outcomes surfaced to the protocol layer.

use std::time::Duration;

/// HTTP-class status for an exceeded rate limit.
const STATUS_TOO_MANY_REQUESTS: u16 = 429;
/// HTTP-class status for an unreachable counter store.
const STATUS_SERVICE_UNAVAILABLE: u16 = 503;

/// What the protocol layer should do with a request.
#[derive(Debug, Clone, PartialEq)]
pub enum AdmissionOutcome {
    /// Continue normal processing; the gate is transparent.
    Allowed,
    /// The caller exceeded its budget; reject with a retry hint.
    Denied(Rejection),
    /// The limiter itself is unavailable; reject as an infrastructure fault.
    Unavailable(Rejection),
}

impl AdmissionOutcome {
    /// Whether the request may proceed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, AdmissionOutcome::Allowed)
    }
}

/// A machine-renderable rejection.
///
/// The gate does not speak any particular protocol; it hands the caller the
/// status class, headers, and body to render.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    /// Protocol status class.
    pub status: u16,
    /// Whole seconds until a retry may succeed, for rate-limit denials.
    pub retry_after_secs: Option<u64>,
    /// Response body payload.
    pub body: serde_json::Value,
}

impl Rejection {
    /// A rejection for a caller that exceeded its budget.
    ///
    /// `retry_after` is rounded up to whole seconds so the hint is never
    /// zero while the window is still live.
    pub fn rate_limited(retry_after: Duration, body: serde_json::Value) -> Self {
        let mut secs = retry_after.as_secs();
        if retry_after.subsec_nanos() > 0 {
            secs += 1;
        }

        Self {
            status: STATUS_TOO_MANY_REQUESTS,
            retry_after_secs: Some(secs.max(1)),
            body,
        }
    }

    /// A rejection for an unavailable limiter.
    ///
    /// Distinct status and body from the ordinary denial, so callers and
    /// operators can tell a caller-caused condition from an infrastructure
    /// fault.
    pub fn limiter_unavailable(body: serde_json::Value) -> Self {
        Self {
            status: STATUS_SERVICE_UNAVAILABLE,
            retry_after_secs: None,
            body,
        }
    }

    /// Headers the protocol layer should attach to the response.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        match self.retry_after_secs {
            Some(secs) => vec![("Retry-After", secs.to_string())],
            None => Vec::new(),
        }
    }
}
