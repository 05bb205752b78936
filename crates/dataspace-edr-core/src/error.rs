// crates/dataspace-edr-core/src/error.rs
// ============================================================================
// Module: EDC Client Errors
// Description: Failure taxonomy for the negotiation and EDR pipeline.
// Purpose: Surface policy, protocol, transport and timeout failures uniformly.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`EdcClientError`] is the single client-facing error type of the pipeline.
//! Each variant carries the payload of its failure mode and maps to a stable
//! [`ErrorKind`]. Errors are `Clone` so a shared negotiation future can hand
//! the same failure to every waiting caller.
//! [`TransportError`] is produced by [`crate::ControlPlaneClient`]
//! implementations and converted at the pipeline boundary.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::model::AcceptedPolicy;
use crate::model::Policy;

// ============================================================================
// SECTION: Error Kinds
// ============================================================================

/// Stable classification of [`EdcClientError`] variants.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Offered policy is not in the accepted set.
    PolicyPermission,
    /// Offered policy is accepted but no longer valid.
    PolicyExpired,
    /// Contract negotiation failed or timed out.
    Negotiation,
    /// Transfer process failed or timed out.
    TransferProcess,
    /// Generic polling timeout.
    Timeout,
    /// Transport failure after retries.
    Transport,
    /// Catalog returned no offers for the filter.
    CatalogEmpty,
    /// Caller violated a pipeline precondition.
    IllegalState,
    /// Wait was interrupted by shutdown or task cancellation.
    Interrupted,
    /// Any other client failure.
    Client,
}

impl ErrorKind {
    /// Returns a stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PolicyPermission => "policy_permission",
            Self::PolicyExpired => "policy_expired",
            Self::Negotiation => "negotiation",
            Self::TransferProcess => "transfer_process",
            Self::Timeout => "timeout",
            Self::Transport => "transport",
            Self::CatalogEmpty => "catalog_empty",
            Self::IllegalState => "illegal_state",
            Self::Interrupted => "interrupted",
            Self::Client => "client",
        }
    }
}

// ============================================================================
// SECTION: Policy Diagnostics
// ============================================================================

/// Diagnostic payload attached to policy rejections.
///
/// # Invariants
/// - `accepted` lists only policies that were valid at rejection time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDiagnostics {
    /// Asset the offer was made for.
    pub asset_id: String,
    /// Connector (BPN) that made the offer.
    pub connector_id: String,
    /// Offered usage policy.
    pub offered: Policy,
    /// Currently valid accepted policies for the connector.
    pub accepted: Vec<AcceptedPolicy>,
}

// ============================================================================
// SECTION: Client Errors
// ============================================================================

/// Errors surfaced by the negotiation and EDR pipeline.
///
/// # Invariants
/// - Variants are stable for programmatic handling via [`EdcClientError::kind`].
#[derive(Debug, Clone, Error)]
pub enum EdcClientError {
    /// Offered policy is not permitted.
    #[error(
        "policy for asset '{}' of connector '{}' is not accepted",
        .0.asset_id,
        .0.connector_id
    )]
    PolicyPermission(Box<PolicyDiagnostics>),
    /// Offered policy is permitted but expired.
    #[error(
        "policy for asset '{}' of connector '{}' has expired",
        .0.asset_id,
        .0.connector_id
    )]
    PolicyExpired(Box<PolicyDiagnostics>),
    /// Contract negotiation reached a failure state or timed out.
    #[error("contract negotiation '{negotiation_id}' failed: {reason}")]
    Negotiation {
        /// Negotiation identifier, empty when not yet assigned.
        negotiation_id: String,
        /// Failure description.
        reason: String,
    },
    /// Transfer process reached a failure state or timed out.
    #[error("transfer process '{transfer_process_id}' failed: {reason}")]
    TransferProcess {
        /// Transfer process identifier.
        transfer_process_id: String,
        /// Failure description.
        reason: String,
    },
    /// A polling job did not resolve within its time-to-live.
    #[error("timed out after {ttl_ms} ms while {description}")]
    Timeout {
        /// Description of the awaited event.
        description: String,
        /// Configured time-to-live in milliseconds.
        ttl_ms: u64,
    },
    /// Transport failed after retries were exhausted.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
    /// Catalog returned no matching offer.
    #[error(
        "catalog is empty for endpoint '{endpoint}' filter key '{filter_key}' filter value '{filter_value}'"
    )]
    CatalogEmpty {
        /// Connector endpoint queried.
        endpoint: String,
        /// Filter key used.
        filter_key: String,
        /// Filter value used.
        filter_value: String,
    },
    /// Pipeline precondition violated by the caller.
    #[error("illegal state: {0}")]
    IllegalState(String),
    /// Wait interrupted by shutdown or cancellation.
    #[error("interrupted while {0}")]
    Interrupted(String),
    /// Generic client failure.
    #[error("edc client error: {0}")]
    Client(String),
}

impl EdcClientError {
    /// Returns the stable kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::PolicyPermission(_) => ErrorKind::PolicyPermission,
            Self::PolicyExpired(_) => ErrorKind::PolicyExpired,
            Self::Negotiation {
                ..
            } => ErrorKind::Negotiation,
            Self::TransferProcess {
                ..
            } => ErrorKind::TransferProcess,
            Self::Timeout {
                ..
            } => ErrorKind::Timeout,
            Self::Transport(_) => ErrorKind::Transport,
            Self::CatalogEmpty {
                ..
            } => ErrorKind::CatalogEmpty,
            Self::IllegalState(_) => ErrorKind::IllegalState,
            Self::Interrupted(_) => ErrorKind::Interrupted,
            Self::Client(_) => ErrorKind::Client,
        }
    }

    /// Returns the policy diagnostics for policy rejections.
    #[must_use]
    pub fn policy_diagnostics(&self) -> Option<&PolicyDiagnostics> {
        match self {
            Self::PolicyPermission(diagnostics) | Self::PolicyExpired(diagnostics) => {
                Some(diagnostics)
            }
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Transport Errors
// ============================================================================

/// Errors reported by control-plane transport implementations.
///
/// # Invariants
/// - [`TransportError::is_retryable`] is the only retry classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection could not be established.
    #[error("connection failure: {0}")]
    Connect(String),
    /// Request timed out.
    #[error("request timed out: {0}")]
    Timeout(String),
    /// Remote answered with a non-success status.
    #[error("http status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response summary.
        message: String,
    },
    /// Response body could not be decoded.
    #[error("invalid response body: {0}")]
    Decode(String),
    /// Request could not be built.
    #[error("invalid request: {0}")]
    Request(String),
    /// Retries were exhausted; carries the last failure.
    #[error("retries exhausted for host '{host}' after {attempts} attempts: {cause}")]
    RetriesExhausted {
        /// Remote host the retry policy applied to.
        host: String,
        /// Attempts performed.
        attempts: u32,
        /// Last observed failure.
        #[source]
        cause: Box<TransportError>,
    },
}

impl TransportError {
    /// Returns true when the failure is transient and may be retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Connect(_) | Self::Timeout(_) => true,
            Self::Status {
                status,
                ..
            } => *status >= 500 || *status == 429,
            Self::Decode(_) | Self::Request(_) | Self::RetriesExhausted {
                ..
            } => false,
        }
    }
}
