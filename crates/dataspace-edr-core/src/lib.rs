// crates/dataspace-edr-core/src/lib.rs
// ============================================================================
// Module: Dataspace EDR Core Library
// Description: Contract negotiation and endpoint data reference acquisition.
// Purpose: Discover offers, negotiate contracts and obtain data plane credentials.
// Dependencies: futures, tokio, tracing, serde, time
// ============================================================================

//! ## Overview
//! Dataspace EDR Core drives the consumer side of a data-space connector. It
//! pages through provider catalogs, checks usage policies, negotiates
//! contracts, starts transfer processes and waits for the resulting endpoint
//! data reference (EDR) to arrive in the [`EndpointDataReferenceCache`].
//!
//! [`EdcOrchestrator`] is the entry point. It guarantees at most one
//! negotiation per `(asset id, connector endpoint)` key and hands every
//! concurrent caller the same shared result.
//! Invariants:
//! - Every externally observable wait is bounded by a [`PollingJob`] TTL.
//! - The cache and the [`OngoingNegotiations`] registry are the only mutable
//!   shared state.
//! - Transport calls run on the bounded [`WorkerPool`], never on the polling
//!   scheduler.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod cache;
pub mod callback;
pub mod catalog;
pub mod error;
pub mod interfaces;
pub mod model;
pub mod negotiation;
pub mod orchestrator;
pub mod policy;
pub mod polling;
pub mod pool;
pub mod registry;
pub mod retry;
pub mod util;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cache::CredentialStatus;
pub use cache::EndpointDataReferenceCache;
pub use callback::EndpointDataReferenceCallback;
pub use catalog::CatalogFacade;
pub use catalog::CatalogSettings;
pub use error::EdcClientError;
pub use error::ErrorKind;
pub use error::PolicyDiagnostics;
pub use error::TransportError;
pub use interfaces::AcceptedPoliciesProvider;
pub use interfaces::ControlPlaneClient;
pub use model::AcceptedPolicy;
pub use model::CallbackAddress;
pub use model::Catalog;
pub use model::CatalogItem;
pub use model::CatalogRequest;
pub use model::Constraint;
pub use model::ContractOfferDescription;
pub use model::Criterion;
pub use model::DataDestination;
pub use model::Dataset;
pub use model::EdrAuthCode;
pub use model::EndpointDataReference;
pub use model::IdResponse;
pub use model::NegotiationRequest;
pub use model::NegotiationResponse;
pub use model::Offer;
pub use model::Operator;
pub use model::Permission;
pub use model::Policy;
pub use model::ProcessState;
pub use model::QuerySpec;
pub use model::StateResponse;
pub use model::TransferProcessRequest;
pub use model::TransferProcessResponse;
pub use negotiation::ContractNegotiationService;
pub use negotiation::ContractNegotiator;
pub use negotiation::NegotiationSettings;
pub use orchestrator::EdcOrchestrator;
pub use orchestrator::EdcOrchestratorBuilder;
pub use orchestrator::EdrFuture;
pub use orchestrator::EdrResult;
pub use orchestrator::OrchestratorSettings;
pub use policy::AcceptedPolicyStore;
pub use policy::PolicyChecker;
pub use polling::DEFAULT_POLL_INTERVAL;
pub use polling::PollingJob;
pub use polling::PollingJobBuilder;
pub use polling::PollingScheduler;
pub use polling::PollingTask;
pub use pool::WorkerPool;
pub use registry::OngoingNegotiations;
pub use retry::RetryPolicy;
pub use retry::RetryRegistry;
pub use retry::RetryingControlPlaneClient;
