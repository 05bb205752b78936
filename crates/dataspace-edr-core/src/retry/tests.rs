// crates/dataspace-edr-core/src/retry/tests.rs
// ============================================================================
// Module: Retrying Transport Tests
// Description: Unit tests for per-host retry policies.
// Purpose: Validate attempt bounds, retry classification and backoff math.
// Dependencies: dataspace-edr-core
// ============================================================================

//! ## Overview
//! Drives [`super::RetryingControlPlaneClient`] with a scripted transport.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use super::RetryPolicy;
use super::RetryRegistry;
use super::RetryingControlPlaneClient;
use crate::error::TransportError;
use crate::interfaces::ControlPlaneClient;
use crate::model::Catalog;
use crate::model::CatalogRequest;
use crate::model::IdResponse;
use crate::model::NegotiationRequest;
use crate::model::NegotiationResponse;
use crate::model::QuerySpec;
use crate::model::StateResponse;
use crate::model::TransferProcessRequest;
use crate::model::TransferProcessResponse;

// ============================================================================
// SECTION: Scripted Transport
// ============================================================================

/// Transport answering catalog and state calls from a script.
#[derive(Default)]
struct Scripted {
    catalog: Mutex<VecDeque<Result<Catalog, TransportError>>>,
    states: Mutex<VecDeque<Result<StateResponse, TransportError>>>,
    calls: Mutex<usize>,
}

impl Scripted {
    fn with_catalog(results: Vec<Result<Catalog, TransportError>>) -> Self {
        Self {
            catalog: Mutex::new(results.into()),
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl ControlPlaneClient for Scripted {
    fn get_catalog(&self, _request: &CatalogRequest) -> Result<Catalog, TransportError> {
        *self.calls.lock().unwrap() += 1;
        self.catalog.lock().unwrap().pop_front().unwrap()
    }

    fn start_negotiation(&self, _: &NegotiationRequest) -> Result<IdResponse, TransportError> {
        Err(TransportError::Request("unused".to_string()))
    }

    fn get_negotiation(&self, _: &str) -> Result<NegotiationResponse, TransportError> {
        Err(TransportError::Request("unused".to_string()))
    }

    fn get_negotiation_state(&self, _: &str) -> Result<StateResponse, TransportError> {
        *self.calls.lock().unwrap() += 1;
        self.states.lock().unwrap().pop_front().unwrap()
    }

    fn start_transfer_process(
        &self,
        _: &TransferProcessRequest,
    ) -> Result<IdResponse, TransportError> {
        Err(TransportError::Request("unused".to_string()))
    }

    fn get_transfer_process(&self, _: &str) -> Result<TransferProcessResponse, TransportError> {
        Err(TransportError::Request("unused".to_string()))
    }

    fn get_transfer_process_state(&self, _: &str) -> Result<StateResponse, TransportError> {
        Err(TransportError::Request("unused".to_string()))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        backoff_multiplier: 2.0,
    }
}

fn request(address: &str) -> CatalogRequest {
    CatalogRequest {
        protocol: "dataspace-protocol-http".to_string(),
        counter_party_address: address.to_string(),
        counter_party_id: "BPNL1".to_string(),
        query_spec: QuerySpec::default(),
    }
}

fn unavailable() -> TransportError {
    TransportError::Status {
        status: 503,
        message: "unavailable".to_string(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn retryable_failures_are_retried_until_success() {
    let inner = Arc::new(Scripted::with_catalog(vec![
        Err(unavailable()),
        Err(TransportError::Connect("refused".to_string())),
        Ok(Catalog::default()),
    ]));
    let client = RetryingControlPlaneClient::new(
        Arc::clone(&inner) as Arc<dyn ControlPlaneClient>,
        RetryRegistry::new(fast_policy(3)),
        "localhost",
    );
    assert!(client.get_catalog(&request("https://provider.example/api/v1/dsp")).is_ok());
    assert_eq!(inner.calls(), 3);
}

#[test]
fn non_retryable_failure_returns_immediately() {
    let inner = Arc::new(Scripted::with_catalog(vec![Err(TransportError::Status {
        status: 404,
        message: "missing".to_string(),
    })]));
    let client = RetryingControlPlaneClient::new(
        Arc::clone(&inner) as Arc<dyn ControlPlaneClient>,
        RetryRegistry::new(fast_policy(3)),
        "localhost",
    );
    let err = client.get_catalog(&request("https://provider.example")).unwrap_err();
    assert!(matches!(err, TransportError::Status { status: 404, .. }));
    assert_eq!(inner.calls(), 1);
}

#[test]
fn exhausted_retries_preserve_last_cause() {
    let inner = Arc::new(Scripted::with_catalog(vec![Err(unavailable()), Err(unavailable())]));
    let client = RetryingControlPlaneClient::new(
        Arc::clone(&inner) as Arc<dyn ControlPlaneClient>,
        RetryRegistry::new(fast_policy(2)),
        "localhost",
    );
    let err = client.get_catalog(&request("https://provider.example/api")).unwrap_err();
    match err {
        TransportError::RetriesExhausted {
            host,
            attempts,
            cause,
        } => {
            assert_eq!(host, "provider.example");
            assert_eq!(attempts, 2);
            assert_eq!(*cause, unavailable());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn per_host_override_applies_to_matching_host() {
    let inner = Arc::new(Scripted::with_catalog(vec![Err(unavailable())]));
    let registry =
        RetryRegistry::new(fast_policy(5)).with_host("flaky.example", RetryPolicy::no_retry());
    let client = RetryingControlPlaneClient::new(
        Arc::clone(&inner) as Arc<dyn ControlPlaneClient>,
        registry,
        "localhost",
    );
    let err = client.get_catalog(&request("https://flaky.example/api/v1/dsp")).unwrap_err();
    assert!(matches!(err, TransportError::RetriesExhausted { attempts: 1, .. }));
    assert_eq!(inner.calls(), 1);
}

#[test]
fn polling_calls_use_control_plane_host_policy() {
    let inner = Arc::new(Scripted {
        states: Mutex::new(
            vec![
                Err(TransportError::Timeout("slow".to_string())),
                Ok(StateResponse {
                    state: "FINALIZED".to_string(),
                }),
            ]
            .into(),
        ),
        ..Scripted::default()
    });
    let registry = RetryRegistry::new(RetryPolicy::no_retry()).with_host("cp.local", fast_policy(2));
    let client = RetryingControlPlaneClient::new(
        Arc::clone(&inner) as Arc<dyn ControlPlaneClient>,
        registry,
        "cp.local",
    );
    assert_eq!(client.get_negotiation_state("neg-1").unwrap().state, "FINALIZED");
    assert_eq!(inner.calls(), 2);
}

#[test]
fn backoff_grows_and_is_capped() {
    let policy = RetryPolicy {
        max_attempts: 5,
        initial_delay: Duration::from_millis(100),
        max_delay: Duration::from_millis(300),
        backoff_multiplier: 2.0,
    };
    assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
    assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
    assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(300));
    assert_eq!(policy.delay_for_attempt(30), Duration::from_millis(300));
}
