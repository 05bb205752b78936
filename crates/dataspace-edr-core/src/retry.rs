// crates/dataspace-edr-core/src/retry.rs
// ============================================================================
// Module: Retrying Transport
// Description: Per-host retry policies wrapped around the control-plane client.
// Purpose: Absorb transient transport failures with bounded backoff.
// Dependencies: tracing, url
// ============================================================================

//! ## Overview
//! [`RetryingControlPlaneClient`] decorates any [`ControlPlaneClient`]. Each
//! call resolves the remote host it concerns, picks that host's
//! [`RetryPolicy`] from the [`RetryRegistry`] and retries retryable failures
//! with exponential backoff.
//! Invariants:
//! - At most `max_attempts` calls are made per operation.
//! - Non-retryable failures are returned unchanged on first occurrence.
//! - Exhausted retries return [`TransportError::RetriesExhausted`] carrying
//!   the last failure as its cause.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;
use url::Url;

use crate::error::TransportError;
use crate::interfaces::ControlPlaneClient;
use crate::model::Catalog;
use crate::model::CatalogRequest;
use crate::model::IdResponse;
use crate::model::NegotiationRequest;
use crate::model::NegotiationResponse;
use crate::model::StateResponse;
use crate::model::TransferProcessRequest;
use crate::model::TransferProcessResponse;

// ============================================================================
// SECTION: Retry Policy
// ============================================================================

/// Bounded exponential backoff policy.
///
/// # Invariants
/// - `max_attempts` counts the first call; `1` disables retries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of calls.
    pub max_attempts: u32,
    /// Delay before the second call.
    pub initial_delay: Duration,
    /// Upper bound of any delay.
    pub max_delay: Duration,
    /// Factor applied to the delay after each failure.
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    /// Returns the delay before attempt `attempt + 1`, where `attempt` is the
    /// one-based number of the failed attempt.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let factor = self.backoff_multiplier.max(1.0).powi(exponent);
        let seconds = self.initial_delay.as_secs_f64() * factor;
        Duration::try_from_secs_f64(seconds).map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Returns a policy that never retries.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

/// Retry policies keyed by remote host.
#[derive(Debug, Clone, Default)]
pub struct RetryRegistry {
    /// Policy for hosts without an override.
    default: RetryPolicy,
    /// Per-host overrides.
    per_host: HashMap<String, RetryPolicy>,
}

impl RetryRegistry {
    /// Creates a registry with a default policy.
    #[must_use]
    pub fn new(default: RetryPolicy) -> Self {
        Self {
            default,
            per_host: HashMap::new(),
        }
    }

    /// Adds a per-host override.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>, policy: RetryPolicy) -> Self {
        self.per_host.insert(host.into(), policy);
        self
    }

    /// Returns the policy for `host`.
    #[must_use]
    pub fn policy_for(&self, host: &str) -> RetryPolicy {
        self.per_host.get(host).copied().unwrap_or(self.default)
    }
}

// ============================================================================
// SECTION: Retrying Client
// ============================================================================

/// [`ControlPlaneClient`] decorator applying per-host retry policies.
///
/// # Invariants
/// - Blocks the calling thread while backing off; callers run it on the
///   worker pool.
pub struct RetryingControlPlaneClient {
    /// Wrapped transport.
    inner: Arc<dyn ControlPlaneClient>,
    /// Retry policies.
    registry: RetryRegistry,
    /// Host used for calls that carry no provider address.
    control_plane_host: String,
}

impl RetryingControlPlaneClient {
    /// Wraps `inner` with the policies of `registry`.
    ///
    /// Polling calls identify no provider, so they use the policy of
    /// `control_plane_host`.
    #[must_use]
    pub fn new(
        inner: Arc<dyn ControlPlaneClient>,
        registry: RetryRegistry,
        control_plane_host: impl Into<String>,
    ) -> Self {
        Self {
            inner,
            registry,
            control_plane_host: control_plane_host.into(),
        }
    }

    /// Runs `call` under the policy of `host`.
    fn with_retry<T>(
        &self,
        host: &str,
        operation: &str,
        mut call: impl FnMut() -> Result<T, TransportError>,
    ) -> Result<T, TransportError> {
        let policy = self.registry.policy_for(host);
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match call() {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) if attempt >= max_attempts => {
                    warn!(host = %host, operation, attempts = attempt, error = %err, "retries exhausted");
                    return Err(TransportError::RetriesExhausted {
                        host: host.to_string(),
                        attempts: attempt,
                        cause: Box::new(err),
                    });
                }
                Err(err) => {
                    let delay = policy.delay_for_attempt(attempt);
                    warn!(
                        host = %host,
                        operation,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "retrying control-plane call"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }

    /// Returns the host of a provider address, or the address itself.
    fn host_of(address: &str) -> String {
        Url::parse(address)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_else(|| address.to_string())
    }
}

impl ControlPlaneClient for RetryingControlPlaneClient {
    fn get_catalog(&self, request: &CatalogRequest) -> Result<Catalog, TransportError> {
        let host = Self::host_of(&request.counter_party_address);
        self.with_retry(&host, "get_catalog", || self.inner.get_catalog(request))
    }

    fn start_negotiation(
        &self,
        request: &NegotiationRequest,
    ) -> Result<IdResponse, TransportError> {
        let host = Self::host_of(&request.counter_party_address);
        self.with_retry(&host, "start_negotiation", || self.inner.start_negotiation(request))
    }

    fn get_negotiation(&self, negotiation_id: &str) -> Result<NegotiationResponse, TransportError> {
        self.with_retry(&self.control_plane_host, "get_negotiation", || {
            self.inner.get_negotiation(negotiation_id)
        })
    }

    fn get_negotiation_state(&self, negotiation_id: &str) -> Result<StateResponse, TransportError> {
        self.with_retry(&self.control_plane_host, "get_negotiation_state", || {
            self.inner.get_negotiation_state(negotiation_id)
        })
    }

    fn start_transfer_process(
        &self,
        request: &TransferProcessRequest,
    ) -> Result<IdResponse, TransportError> {
        let host = Self::host_of(&request.counter_party_address);
        self.with_retry(&host, "start_transfer_process", || self.inner.start_transfer_process(request))
    }

    fn get_transfer_process(
        &self,
        transfer_process_id: &str,
    ) -> Result<TransferProcessResponse, TransportError> {
        self.with_retry(&self.control_plane_host, "get_transfer_process", || {
            self.inner.get_transfer_process(transfer_process_id)
        })
    }

    fn get_transfer_process_state(
        &self,
        transfer_process_id: &str,
    ) -> Result<StateResponse, TransportError> {
        self.with_retry(&self.control_plane_host, "get_transfer_process_state", || {
            self.inner.get_transfer_process_state(transfer_process_id)
        })
    }
}

#[cfg(test)]
mod tests;
