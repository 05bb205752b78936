// crates/dataspace-edr-core/src/model/mod.rs
// ============================================================================
// Module: Connector Data Model
// Description: Catalog, policy, negotiation and endpoint data reference types.
// Purpose: Provide typed request and response values for the control plane.
// Dependencies: serde, serde_json, time
// ============================================================================

//! ## Overview
//! Types exchanged with a connector control plane. Catalog and negotiation
//! values are request-scoped and immutable once built. Endpoint data
//! references are the only values with an independent lifetime; they live in
//! [`crate::EndpointDataReferenceCache`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod catalog;
pub mod contract;
pub mod edr;
pub mod policy;


// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use catalog::Catalog;
pub use catalog::CatalogItem;
pub use catalog::CatalogRequest;
pub use catalog::Criterion;
pub use catalog::Dataset;
pub use catalog::Offer;
pub use catalog::QuerySpec;
pub use contract::CallbackAddress;
pub use contract::ContractOfferDescription;
pub use contract::DataDestination;
pub use contract::IdResponse;
pub use contract::NegotiationRequest;
pub use contract::NegotiationResponse;
pub use contract::ProcessState;
pub use contract::StateResponse;
pub use contract::TransferProcessRequest;
pub use contract::TransferProcessResponse;
pub use edr::EdrAuthCode;
pub use edr::EndpointDataReference;
pub use policy::AcceptedPolicy;
pub use policy::Constraint;
pub use policy::Operator;
pub use policy::Permission;
pub use policy::Policy;
