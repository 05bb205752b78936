// crates/dataspace-edr-core/src/model/contract.rs
// ============================================================================
// Module: Negotiation and Transfer Model
// Description: Wire values for contract negotiations and transfer processes.
// Purpose: Type the control-plane requests and responses of the pipeline.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Requests and responses of the two control-plane state machines. State
//! strings are interpreted through [`ProcessState`]; unknown states are
//! preserved so polling can keep waiting on them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::model::policy::Policy;

// ============================================================================
// SECTION: Process States
// ============================================================================

/// Negotiation and transfer-process state.
///
/// # Invariants
/// - [`ProcessState::Other`] keeps the raw state text of states the pipeline
///   does not act on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProcessState {
    /// Request submitted.
    Requested,
    /// Negotiation agreed.
    Finalized,
    /// Transfer started; sufficient for pull transfers.
    Started,
    /// Transfer completed.
    Completed,
    /// Process terminated by either party.
    Terminated,
    /// Process failed.
    Error,
    /// Any intermediate state.
    Other(String),
}

impl ProcessState {
    /// Parses a state string, case-insensitively.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "REQUESTED" => Self::Requested,
            "FINALIZED" => Self::Finalized,
            "STARTED" => Self::Started,
            "COMPLETED" => Self::Completed,
            "TERMINATED" => Self::Terminated,
            "ERROR" => Self::Error,
            _ => Self::Other(raw.to_string()),
        }
    }

    /// Returns true for failure states.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Terminated | Self::Error)
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Requested => "REQUESTED",
            Self::Finalized => "FINALIZED",
            Self::Started => "STARTED",
            Self::Completed => "COMPLETED",
            Self::Terminated => "TERMINATED",
            Self::Error => "ERROR",
            Self::Other(raw) => raw.as_str(),
        };
        f.write_str(label)
    }
}

// ============================================================================
// SECTION: Shared Values
// ============================================================================

/// Identifier returned when a negotiation or transfer is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdResponse {
    /// Created resource identifier.
    pub response_id: String,
}

/// State-only response of a negotiation or transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateResponse {
    /// Raw state string.
    pub state: String,
}

impl StateResponse {
    /// Returns the parsed state.
    #[must_use]
    pub fn process_state(&self) -> ProcessState {
        ProcessState::parse(&self.state)
    }
}

/// Callback registration attached to a transfer request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackAddress {
    /// Callback target URI.
    pub uri: String,
    /// Subscribed events.
    pub events: Vec<String>,
    /// Whether delivery is transactional.
    pub transactional: bool,
}

// ============================================================================
// SECTION: Negotiation
// ============================================================================

/// Contract offer embedded in a negotiation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractOfferDescription {
    /// Offer identifier.
    pub offer_id: String,
    /// Asset identifier.
    pub asset_id: String,
    /// Policy targeting the asset.
    pub policy: Policy,
}

/// Request starting a contract negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiationRequest {
    /// Dataspace protocol identifier.
    pub protocol: String,
    /// Provider connector id.
    pub connector_id: String,
    /// Provider connector address.
    pub counter_party_address: String,
    /// Offer being negotiated.
    pub offer: ContractOfferDescription,
    /// Optional callbacks.
    #[serde(default)]
    pub callback_addresses: Vec<CallbackAddress>,
}

/// Full negotiation resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiationResponse {
    /// Negotiation identifier.
    pub response_id: String,
    /// Agreement id, present once finalized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_agreement_id: Option<String>,
    /// Raw state string.
    pub state: String,
    /// Provider error detail, when failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

// ============================================================================
// SECTION: Transfer
// ============================================================================

/// Data destination of a transfer request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataDestination {
    /// Destination type, `HttpProxy` for pull transfers.
    #[serde(rename = "type")]
    pub kind: String,
}

/// Request starting a transfer process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferProcessRequest {
    /// Dataspace protocol identifier.
    pub protocol: String,
    /// Provider connector id.
    pub connector_id: String,
    /// Provider connector address.
    pub counter_party_address: String,
    /// Transfer type, `HttpData-PULL` for pull transfers.
    pub transfer_type: String,
    /// Agreement id.
    pub contract_id: String,
    /// Asset id.
    pub asset_id: String,
    /// Data destination.
    pub data_destination: DataDestination,
    /// Private properties visible only to the consumer.
    #[serde(default)]
    pub private_properties: BTreeMap<String, String>,
    /// Callback registrations.
    #[serde(default)]
    pub callback_addresses: Vec<CallbackAddress>,
}

/// Full transfer-process resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferProcessResponse {
    /// Transfer process identifier.
    pub response_id: String,
    /// Raw state string.
    pub state: String,
    /// Agreement id the transfer runs under.
    pub contract_id: String,
    /// Asset id.
    #[serde(default)]
    pub asset_id: String,
    /// Provider error detail, when failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}
