// crates/dataspace-edr-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Shared fakes and builders for dataspace-edr-core tests.
// Purpose: Provide a scripted control plane, negotiator and sample values.
// Dependencies: dataspace-edr-core, async-trait, base64, serde_json, time, tokio
// ============================================================================

//! ## Overview
//! Provides an in-memory control plane that serves a paged catalog and walks
//! negotiations and transfers to configurable states, a counting negotiator
//! fake, and sample catalog values.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    dead_code,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use dataspace_edr_core::AcceptedPolicy;
use dataspace_edr_core::Catalog;
use dataspace_edr_core::CatalogItem;
use dataspace_edr_core::CatalogRequest;
use dataspace_edr_core::Constraint;
use dataspace_edr_core::ContractNegotiator;
use dataspace_edr_core::ControlPlaneClient;
use dataspace_edr_core::CredentialStatus;
use dataspace_edr_core::Dataset;
use dataspace_edr_core::EdcClientError;
use dataspace_edr_core::EndpointDataReference;
use dataspace_edr_core::EndpointDataReferenceCache;
use dataspace_edr_core::IdResponse;
use dataspace_edr_core::NegotiationRequest;
use dataspace_edr_core::NegotiationResponse;
use dataspace_edr_core::Offer;
use dataspace_edr_core::Permission;
use dataspace_edr_core::Policy;
use dataspace_edr_core::StateResponse;
use dataspace_edr_core::TransferProcessRequest;
use dataspace_edr_core::TransferProcessResponse;
use dataspace_edr_core::TransportError;
use dataspace_edr_core::model::catalog::NAMESPACE_EDC_ID;
use serde_json::json;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Sample Values
// ============================================================================

/// Provider BPN used across tests.
pub const PROVIDER_BPN: &str = "BPNL000000000001";

/// Provider connector endpoint used across tests.
pub const PROVIDER_ENDPOINT: &str = "https://provider.example";

/// Returns a usage policy requiring `PURPOSE eq purpose`.
pub fn purpose_policy(purpose: &str) -> Policy {
    Policy {
        permissions: vec![Permission {
            action: "odrl:use".to_string(),
            constraints: vec![Constraint::eq("PURPOSE", purpose)],
        }],
        ..Policy::default()
    }
}

/// Returns a dataset for `asset_id` with one offer.
pub fn dataset(asset_id: &str) -> Dataset {
    let mut properties = BTreeMap::new();
    properties.insert(NAMESPACE_EDC_ID.to_string(), json!(asset_id));
    Dataset {
        id: asset_id.to_string(),
        properties,
        offers: vec![Offer {
            id: format!("offer-{asset_id}"),
            policy: purpose_policy("ID 3.0 Trace"),
        }],
    }
}

/// Returns a catalog item for `asset_id` with the given policy.
pub fn catalog_item(asset_id: &str, policy: Policy) -> CatalogItem {
    CatalogItem {
        item_id: asset_id.to_string(),
        asset_prop_id: asset_id.to_string(),
        offer_id: format!("offer-{asset_id}"),
        connector_id: PROVIDER_BPN.to_string(),
        policy,
    }
}

/// Returns a JWT-shaped token expiring `valid_for_secs` from now.
pub fn token(valid_for_secs: i64) -> String {
    let exp = OffsetDateTime::now_utc().unix_timestamp() + valid_for_secs;
    let payload = URL_SAFE_NO_PAD.encode(json!({ "exp": exp, "cid": "c", "dad": "d" }).to_string());
    format!("eyJhbGciOiJSUzI1NiJ9.{payload}.sig")
}

/// Returns a reference for `contract_id` with a token valid for `valid_for_secs`.
pub fn reference(contract_id: &str, valid_for_secs: i64) -> EndpointDataReference {
    EndpointDataReference {
        id: format!("tp-{contract_id}"),
        contract_id: contract_id.to_string(),
        endpoint: "https://provider.example/public".to_string(),
        auth_key: "Authorization".to_string(),
        auth_code: Some(token(valid_for_secs)),
        properties: BTreeMap::new(),
    }
}

/// Returns an accepted policy valid for one hour.
pub fn accepted(policy_id: &str) -> AcceptedPolicy {
    AcceptedPolicy::new(policy_id, OffsetDateTime::now_utc() + time::Duration::hours(1))
}

// ============================================================================
// SECTION: Scripted Control Plane
// ============================================================================

/// In-memory control plane with call counters.
pub struct MockControlPlane {
    /// Datasets served by offset and limit.
    pub datasets: Vec<Dataset>,
    /// Serve the first page for every offset.
    pub repeat_first_page: bool,
    /// Report started transfers without their contract id.
    pub omit_transfer_contract_id: bool,
    /// State reported for negotiations.
    pub negotiation_state: Mutex<String>,
    /// State reported for transfers.
    pub transfer_state: Mutex<String>,
    /// Agreement id of finalized negotiations.
    pub agreement_id: String,
    /// Cache receiving a reference once a transfer is read as started.
    pub deliver_to: Mutex<Option<Arc<EndpointDataReferenceCache>>>,
    /// Catalog requests received.
    pub catalog_requests: Mutex<Vec<CatalogRequest>>,
    /// Negotiation requests received.
    pub negotiation_requests: Mutex<Vec<NegotiationRequest>>,
    /// Transfer requests received.
    pub transfer_requests: Mutex<Vec<TransferProcessRequest>>,
    /// State polls received.
    pub state_polls: AtomicUsize,
}

impl MockControlPlane {
    /// Creates a control plane serving `datasets`.
    pub fn new(datasets: Vec<Dataset>) -> Self {
        Self {
            datasets,
            repeat_first_page: false,
            omit_transfer_contract_id: false,
            negotiation_state: Mutex::new("FINALIZED".to_string()),
            transfer_state: Mutex::new("STARTED".to_string()),
            agreement_id: "agreement-1".to_string(),
            deliver_to: Mutex::new(None),
            catalog_requests: Mutex::new(Vec::new()),
            negotiation_requests: Mutex::new(Vec::new()),
            transfer_requests: Mutex::new(Vec::new()),
            state_polls: AtomicUsize::new(0),
        }
    }

    /// Creates a control plane with `count` datasets named `asset-{n}`.
    pub fn with_assets(count: usize) -> Self {
        Self::new((0..count).map(|index| dataset(&format!("asset-{index}"))).collect())
    }

    /// Number of catalog requests received.
    pub fn catalog_calls(&self) -> usize {
        self.catalog_requests.lock().unwrap().len()
    }

    /// Number of negotiation requests received.
    pub fn negotiation_calls(&self) -> usize {
        self.negotiation_requests.lock().unwrap().len()
    }

    /// Number of transfer requests received.
    pub fn transfer_calls(&self) -> usize {
        self.transfer_requests.lock().unwrap().len()
    }

    /// Sets the reported negotiation state.
    pub fn set_negotiation_state(&self, state: &str) {
        *self.negotiation_state.lock().unwrap() = state.to_string();
    }

    /// Sets the reported transfer state.
    pub fn set_transfer_state(&self, state: &str) {
        *self.transfer_state.lock().unwrap() = state.to_string();
    }
}

impl ControlPlaneClient for MockControlPlane {
    fn get_catalog(&self, request: &CatalogRequest) -> Result<Catalog, TransportError> {
        self.catalog_requests.lock().unwrap().push(request.clone());
        let query = &request.query_spec;
        let offset = if self.repeat_first_page { 0 } else { query.offset };
        let filtered: Vec<Dataset> = match &query.filter {
            Some(criterion) => self
                .datasets
                .iter()
                .filter(|dataset| {
                    dataset.properties.get(&criterion.operand_left).and_then(serde_json::Value::as_str)
                        == Some(criterion.operand_right.as_str())
                })
                .cloned()
                .collect(),
            None => self.datasets.clone(),
        };
        let page = filtered
            .into_iter()
            .skip(offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(Catalog {
            id: "catalog".to_string(),
            participant_id: Some(PROVIDER_BPN.to_string()),
            properties: BTreeMap::new(),
            datasets: page,
        })
    }

    fn start_negotiation(
        &self,
        request: &NegotiationRequest,
    ) -> Result<IdResponse, TransportError> {
        self.negotiation_requests.lock().unwrap().push(request.clone());
        Ok(IdResponse {
            response_id: "negotiation-1".to_string(),
        })
    }

    fn get_negotiation(&self, negotiation_id: &str) -> Result<NegotiationResponse, TransportError> {
        Ok(NegotiationResponse {
            response_id: negotiation_id.to_string(),
            contract_agreement_id: Some(self.agreement_id.clone()),
            state: self.negotiation_state.lock().unwrap().clone(),
            error_detail: None,
        })
    }

    fn get_negotiation_state(&self, _negotiation_id: &str) -> Result<StateResponse, TransportError> {
        self.state_polls.fetch_add(1, Ordering::SeqCst);
        Ok(StateResponse {
            state: self.negotiation_state.lock().unwrap().clone(),
        })
    }

    fn start_transfer_process(
        &self,
        request: &TransferProcessRequest,
    ) -> Result<IdResponse, TransportError> {
        self.transfer_requests.lock().unwrap().push(request.clone());
        Ok(IdResponse {
            response_id: "transfer-1".to_string(),
        })
    }

    fn get_transfer_process(
        &self,
        transfer_process_id: &str,
    ) -> Result<TransferProcessResponse, TransportError> {
        let request = self.transfer_requests.lock().unwrap().last().cloned().unwrap();
        if let Some(cache) = self.deliver_to.lock().unwrap().as_ref() {
            cache.put(request.contract_id.clone(), reference(&request.contract_id, 300));
        }
        Ok(TransferProcessResponse {
            response_id: transfer_process_id.to_string(),
            state: self.transfer_state.lock().unwrap().clone(),
            contract_id: if self.omit_transfer_contract_id { String::new() } else { request.contract_id },
            asset_id: request.asset_id,
            error_detail: None,
        })
    }

    fn get_transfer_process_state(
        &self,
        _transfer_process_id: &str,
    ) -> Result<StateResponse, TransportError> {
        self.state_polls.fetch_add(1, Ordering::SeqCst);
        Ok(StateResponse {
            state: self.transfer_state.lock().unwrap().clone(),
        })
    }
}

// ============================================================================
// SECTION: Negotiator Fake
// ============================================================================

/// Negotiator that sleeps, then delivers a reference into the cache.
pub struct SlowNegotiator {
    /// Cache the reference is delivered into.
    pub cache: Arc<EndpointDataReferenceCache>,
    /// Simulated negotiation duration.
    pub delay: Duration,
    /// Number of negotiations run.
    pub calls: AtomicUsize,
    /// Fail instead of delivering.
    pub fail: bool,
    /// Return the agreement id without delivering a reference.
    pub withhold: bool,
    /// Auth code of delivered references; a JWT valid for 300 s when unset.
    pub auth_code: Option<String>,
}

impl SlowNegotiator {
    /// Creates a negotiator delivering into `cache` after `delay`.
    pub fn new(cache: Arc<EndpointDataReferenceCache>, delay: Duration) -> Self {
        Self {
            cache,
            delay,
            calls: AtomicUsize::new(0),
            fail: false,
            withhold: false,
            auth_code: None,
        }
    }

    /// Number of negotiations run.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContractNegotiator for SlowNegotiator {
    async fn negotiate(
        &self,
        _endpoint: &str,
        item: &CatalogItem,
        _status: Option<CredentialStatus>,
        _bpn: &str,
    ) -> Result<TransferProcessResponse, EdcClientError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        if self.fail {
            return Err(EdcClientError::Negotiation {
                negotiation_id: format!("negotiation-{call}"),
                reason: "negotiation ended in state TERMINATED".to_string(),
            });
        }
        let contract_id = format!("agreement-{}-{call}", item.asset_prop_id);
        if !self.withhold {
            let mut delivered = reference(&contract_id, 300);
            if let Some(auth_code) = &self.auth_code {
                delivered.auth_code = Some(auth_code.clone());
            }
            self.cache.put(contract_id.clone(), delivered);
        }
        Ok(TransferProcessResponse {
            response_id: format!("transfer-{call}"),
            state: "STARTED".to_string(),
            contract_id,
            asset_id: item.asset_prop_id.clone(),
            error_detail: None,
        })
    }
}
