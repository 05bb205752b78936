// crates/dataspace-edr-core/src/interfaces.rs
// ============================================================================
// Module: Pipeline Interfaces
// Description: Collaborator traits for control-plane transport and policy stores.
// Purpose: Decouple the pipeline from HTTP transport and policy persistence.
// Dependencies: crate::model, crate::error
// ============================================================================

//! ## Overview
//! The pipeline talks to two collaborators. [`ControlPlaneClient`] is the
//! blocking transport to the local connector control plane; it is always
//! invoked from the worker pool. [`AcceptedPoliciesProvider`] answers whether
//! an offered policy is acceptable for a provider.
//! Invariants:
//! - Implementations must be thread-safe; they are shared behind `Arc`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::error::TransportError;
use crate::model::AcceptedPolicy;
use crate::model::Catalog;
use crate::model::CatalogRequest;
use crate::model::IdResponse;
use crate::model::NegotiationRequest;
use crate::model::NegotiationResponse;
use crate::model::Policy;
use crate::model::StateResponse;
use crate::model::TransferProcessRequest;
use crate::model::TransferProcessResponse;

// ============================================================================
// SECTION: Control Plane Transport
// ============================================================================

/// Blocking transport to the consumer's control plane.
///
/// # Invariants
/// - Calls block the current thread; callers run them on the worker pool.
pub trait ControlPlaneClient: Send + Sync {
    /// Requests the catalog of a provider.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the request fails.
    fn get_catalog(&self, request: &CatalogRequest) -> Result<Catalog, TransportError>;

    /// Starts a contract negotiation.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the request fails.
    fn start_negotiation(&self, request: &NegotiationRequest)
    -> Result<IdResponse, TransportError>;

    /// Reads a contract negotiation.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the request fails.
    fn get_negotiation(&self, negotiation_id: &str) -> Result<NegotiationResponse, TransportError>;

    /// Reads the state of a contract negotiation.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the request fails.
    fn get_negotiation_state(&self, negotiation_id: &str) -> Result<StateResponse, TransportError>;

    /// Starts a transfer process.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the request fails.
    fn start_transfer_process(
        &self,
        request: &TransferProcessRequest,
    ) -> Result<IdResponse, TransportError>;

    /// Reads a transfer process.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the request fails.
    fn get_transfer_process(
        &self,
        transfer_process_id: &str,
    ) -> Result<TransferProcessResponse, TransportError>;

    /// Reads the state of a transfer process.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the request fails.
    fn get_transfer_process_state(
        &self,
        transfer_process_id: &str,
    ) -> Result<StateResponse, TransportError>;
}

// ============================================================================
// SECTION: Accepted Policies
// ============================================================================

/// Source of the consumer's accepted usage policies.
pub trait AcceptedPoliciesProvider: Send + Sync {
    /// Returns true when the offered policy matches an accepted policy,
    /// ignoring expiry.
    fn is_valid(&self, policy: &Policy, bpn: &str) -> bool;

    /// Returns true when the offered policy only matches expired accepted
    /// policies.
    fn is_expired(&self, policy: &Policy, bpn: &str) -> bool;

    /// Returns the currently valid accepted policies for a provider.
    fn valid_policies_for(&self, connector_id: &str) -> Vec<AcceptedPolicy>;
}
