//! The admission gate: per-request control flow.

use std::sync::Arc;

use tracing::{debug, error, trace, warn};

use crate::config::{FailureMode, GateConfig};
use crate::error::Result;
use crate::store::CounterStore;

use super::engine::{Decision, RateLimitEngine};
use super::exemption::ExemptionPolicy;
use super::identity::{ForwardedForResolver, IdentityResolver};
use super::outcome::{AdmissionOutcome, Rejection};
use super::request::RequestMetadata;

/// The request-admission gate.
///
/// One gate instance serves all requests of a process; any number of
/// processes sharing one counter store enforce one combined limit. Per
/// request the gate runs the exemption check first, then identity
/// resolution, then the engine's admission check, then the failure policy.
pub struct AdmissionGate<S: CounterStore> {
    engine: RateLimitEngine<S>,
    resolver: Box<dyn IdentityResolver>,
    exemptions: ExemptionPolicy,
    failure_mode: FailureMode,
    denial_body: serde_json::Value,
    unavailable_body: serde_json::Value,
}

impl<S: CounterStore> AdmissionGate<S> {
    /// Create a new gate over the given counter store.
    ///
    /// Fails fast on invalid configuration; no validation happens per
    /// request.
    pub fn new(config: GateConfig, store: Arc<S>) -> Result<Self> {
        config.validate()?;

        debug!(
            limit = config.limit,
            window_secs = config.window_secs,
            failure_mode = ?config.failure_mode,
            "Admission gate initialized"
        );

        let engine =
            RateLimitEngine::new(store, config.limit, config.window(), config.store_timeout());

        Ok(Self {
            engine,
            resolver: Box::new(ForwardedForResolver),
            exemptions: ExemptionPolicy::new(config.exempt_paths),
            failure_mode: config.failure_mode,
            denial_body: config.denial_body,
            unavailable_body: config.unavailable_body,
        })
    }

    /// Replace the default identity resolver.
    pub fn with_resolver(mut self, resolver: Box<dyn IdentityResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Decide whether a request may proceed.
    ///
    /// This is the once-per-request entry point. It never returns an error:
    /// store failures are absorbed by the configured failure policy, and the
    /// caller only ever sees an outcome to render.
    pub async fn admit(&self, request: &RequestMetadata) -> AdmissionOutcome {
        if self.exemptions.is_exempt(request) {
            trace!(path = %request.path(), "Path exempt from rate limiting");
            return AdmissionOutcome::Allowed;
        }

        let identity = self.resolver.resolve(request);

        match self.engine.check(&identity).await {
            Ok(Decision::Allowed) => AdmissionOutcome::Allowed,
            Ok(Decision::Denied { retry_after }) => {
                warn!(
                    identity = %identity,
                    retry_after_secs = retry_after.as_secs(),
                    "Rate limit exceeded"
                );
                AdmissionOutcome::Denied(Rejection::rate_limited(
                    retry_after,
                    self.denial_body.clone(),
                ))
            }
            Err(err) => match self.failure_mode {
                FailureMode::FailClosed => {
                    error!(identity = %identity, error = %err, "Limiter unavailable, rejecting");
                    AdmissionOutcome::Unavailable(Rejection::limiter_unavailable(
                        self.unavailable_body.clone(),
                    ))
                }
                FailureMode::FailOpen => {
                    warn!(identity = %identity, error = %err, "Limiter unavailable, admitting");
                    AdmissionOutcome::Allowed
                }
            },
        }
    }

    /// The engine backing this gate.
    pub fn engine(&self) -> &RateLimitEngine<S> {
        &self.engine
    }
}
