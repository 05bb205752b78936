// crates/dataspace-edr-core/src/negotiation.rs
// ============================================================================
// Module: Contract Negotiation Service
// Description: Negotiation and transfer-process state machines.
// Purpose: Turn a catalog item into a started transfer process.
// Dependencies: async-trait, tracing
// ============================================================================

//! ## Overview
//! [`ContractNegotiationService`] drives the consumer side of the two
//! control-plane state machines:
//! - negotiation `REQUESTED -> FINALIZED | ERROR | TERMINATED`
//! - transfer `REQUESTED -> STARTED | COMPLETED | ERROR | TERMINATED`
//!
//! A missing or `RequiredNew` credential status negotiates from scratch after
//! a policy check. An `Expired` status reuses the stale agreement and only
//! starts a new transfer. A `Valid` status is a caller error.
//! Invariants:
//! - No negotiation request is sent for an unacceptable policy.
//! - Each wait is a TTL-bounded [`PollingJob`]; timeouts surface as the
//!   negotiation or transfer failure of the phase that timed out.
//! - Transport calls run on the [`WorkerPool`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::cache::CredentialStatus;
use crate::catalog::DATASPACE_PROTOCOL_HTTP;
use crate::error::EdcClientError;
use crate::error::PolicyDiagnostics;
use crate::error::TransportError;
use crate::interfaces::AcceptedPoliciesProvider;
use crate::interfaces::ControlPlaneClient;
use crate::model::CallbackAddress;
use crate::model::CatalogItem;
use crate::model::ContractOfferDescription;
use crate::model::DataDestination;
use crate::model::NegotiationRequest;
use crate::model::ProcessState;
use crate::model::TransferProcessRequest;
use crate::model::TransferProcessResponse;
use crate::polling::DEFAULT_POLL_INTERVAL;
use crate::polling::PollingJob;
use crate::polling::PollingScheduler;
use crate::pool::WorkerPool;
use crate::util::DEFAULT_PROVIDER_SUFFIX;
use crate::util::mask;
use crate::util::with_provider_suffix;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Transfer type of pull transfers.
pub const TRANSFER_TYPE_HTTP_PULL: &str = "HttpData-PULL";
/// Data destination type of pull transfers.
pub const DESTINATION_TYPE_HTTP_PROXY: &str = "HttpProxy";
/// Private property carrying the consumer's callback endpoint.
pub const RECEIVER_HTTP_ENDPOINT: &str = "receiverHttpEndpoint";
/// Callback event announcing a started transfer.
pub const TRANSFER_STARTED_EVENT: &str = "transfer.process.started";
/// Default negotiation and transfer time-to-live.
pub const DEFAULT_PROCESS_TTL: Duration = Duration::from_secs(10 * 60);

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Negotiation service settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiationSettings {
    /// Maximum wait for a finalized negotiation.
    pub negotiation_ttl: Duration,
    /// Maximum wait for a started transfer.
    pub transfer_ttl: Duration,
    /// Delay between state polls.
    pub poll_interval: Duration,
    /// Consumer callback endpoint for pushed credentials.
    pub callback_url: Option<String>,
    /// Suffix appended to provider addresses lacking it.
    pub provider_suffix: String,
}

impl Default for NegotiationSettings {
    fn default() -> Self {
        Self {
            negotiation_ttl: DEFAULT_PROCESS_TTL,
            transfer_ttl: DEFAULT_PROCESS_TTL,
            poll_interval: DEFAULT_POLL_INTERVAL,
            callback_url: None,
            provider_suffix: DEFAULT_PROVIDER_SUFFIX.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Negotiator Interface
// ============================================================================

/// Negotiates a contract and starts the transfer for a catalog item.
#[async_trait]
pub trait ContractNegotiator: Send + Sync {
    /// Runs the negotiation and transfer state machines.
    ///
    /// `status` is the credential status of the item's storage key; `None`
    /// is treated as [`CredentialStatus::RequiredNew`].
    ///
    /// # Errors
    ///
    /// Returns a policy error when the offer is not acceptable,
    /// [`EdcClientError::IllegalState`] for a valid credential, and
    /// negotiation, transfer or transport errors otherwise.
    async fn negotiate(
        &self,
        endpoint: &str,
        item: &CatalogItem,
        status: Option<CredentialStatus>,
        bpn: &str,
    ) -> Result<TransferProcessResponse, EdcClientError>;
}

// ============================================================================
// SECTION: Remote Calls
// ============================================================================

/// Control-plane client bound to the worker pool.
#[derive(Clone)]
struct Remote {
    /// Transport.
    client: Arc<dyn ControlPlaneClient>,
    /// Pool running blocking calls.
    pool: WorkerPool,
}

impl Remote {
    /// Runs one blocking transport call on the pool.
    async fn call<T, F>(&self, call: F) -> Result<T, EdcClientError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn ControlPlaneClient) -> Result<T, TransportError> + Send + 'static,
    {
        let client = Arc::clone(&self.client);
        self.pool.run(move || call(client.as_ref()).map_err(EdcClientError::from)).await
    }
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Default [`ContractNegotiator`] over a control-plane client.
pub struct ContractNegotiationService {
    /// Pool-bound transport.
    remote: Remote,
    /// Accepted policy source.
    policies: Arc<dyn AcceptedPoliciesProvider>,
    /// Scheduler for state polling.
    scheduler: PollingScheduler,
    /// Service settings.
    settings: NegotiationSettings,
}

impl ContractNegotiationService {
    /// Creates a negotiation service.
    #[must_use]
    pub fn new(
        client: Arc<dyn ControlPlaneClient>,
        policies: Arc<dyn AcceptedPoliciesProvider>,
        pool: WorkerPool,
        scheduler: PollingScheduler,
        settings: NegotiationSettings,
    ) -> Self {
        Self {
            remote: Remote {
                client,
                pool,
            },
            policies,
            scheduler,
            settings,
        }
    }

    /// Rejects offers whose policy is not acceptable for `bpn`.
    fn check_policy(&self, item: &CatalogItem, bpn: &str) -> Result<(), EdcClientError> {
        let diagnostics = || {
            Box::new(PolicyDiagnostics {
                asset_id: item.asset_prop_id.clone(),
                connector_id: item.connector_id.clone(),
                offered: item.policy.clone(),
                accepted: self.policies.valid_policies_for(&item.connector_id),
            })
        };
        if !self.policies.is_valid(&item.policy, bpn) {
            warn!(asset = %item.asset_prop_id, bpn = %bpn, "offered policy is not accepted");
            return Err(EdcClientError::PolicyPermission(diagnostics()));
        }
        if self.policies.is_expired(&item.policy, bpn) {
            warn!(asset = %item.asset_prop_id, bpn = %bpn, "accepted policy has expired");
            return Err(EdcClientError::PolicyExpired(diagnostics()));
        }
        Ok(())
    }

    /// Starts a negotiation and waits for its agreement id.
    async fn negotiate_contract(
        &self,
        counter_party_address: &str,
        item: &CatalogItem,
    ) -> Result<String, EdcClientError> {
        let request = NegotiationRequest {
            protocol: DATASPACE_PROTOCOL_HTTP.to_string(),
            connector_id: item.connector_id.clone(),
            counter_party_address: counter_party_address.to_string(),
            offer: ContractOfferDescription {
                offer_id: item.offer_id.clone(),
                asset_id: item.asset_prop_id.clone(),
                policy: item.policy.clone().with_target(item.asset_prop_id.clone()),
            },
            callback_addresses: Vec::new(),
        };
        let created = self.remote.call(move |client| client.start_negotiation(&request)).await?;
        let negotiation_id = created.response_id;
        info!(negotiation = %negotiation_id, asset = %item.asset_prop_id, "started contract negotiation");

        let remote = self.remote.clone();
        let polled_id = negotiation_id.clone();
        let task = PollingJob::builder()
            .action(move || poll_negotiation(remote.clone(), polled_id.clone()))
            .time_to_live(self.settings.negotiation_ttl)
            .poll_interval(self.settings.poll_interval)
            .description(format!("waiting for contract negotiation '{negotiation_id}'"))
            .build()?
            .schedule(&self.scheduler);
        task.await.map_err(|err| match err {
            EdcClientError::Timeout {
                ..
            } => EdcClientError::Negotiation {
                negotiation_id,
                reason: err.to_string(),
            },
            other => other,
        })
    }

    /// Builds the pull transfer request for an agreement.
    fn transfer_request(
        &self,
        counter_party_address: &str,
        item: &CatalogItem,
        contract_id: String,
    ) -> TransferProcessRequest {
        let mut private_properties = BTreeMap::new();
        let mut callback_addresses = Vec::new();
        if let Some(callback_url) = &self.settings.callback_url {
            private_properties.insert(RECEIVER_HTTP_ENDPOINT.to_string(), callback_url.clone());
            callback_addresses.push(CallbackAddress {
                uri: callback_url.clone(),
                events: vec![TRANSFER_STARTED_EVENT.to_string()],
                transactional: false,
            });
        }
        TransferProcessRequest {
            protocol: DATASPACE_PROTOCOL_HTTP.to_string(),
            connector_id: item.connector_id.clone(),
            counter_party_address: counter_party_address.to_string(),
            transfer_type: TRANSFER_TYPE_HTTP_PULL.to_string(),
            contract_id,
            asset_id: item.asset_prop_id.clone(),
            data_destination: DataDestination {
                kind: DESTINATION_TYPE_HTTP_PROXY.to_string(),
            },
            private_properties,
            callback_addresses,
        }
    }

    /// Starts a transfer process and waits until it has started.
    async fn start_transfer(
        &self,
        request: TransferProcessRequest,
    ) -> Result<TransferProcessResponse, EdcClientError> {
        let contract_id = request.contract_id.clone();
        let created = self.remote.call(move |client| client.start_transfer_process(&request)).await?;
        let transfer_process_id = created.response_id;
        info!(
            transfer_process = %transfer_process_id,
            contract = %mask(&contract_id),
            "started transfer process"
        );

        let remote = self.remote.clone();
        let polled_id = transfer_process_id.clone();
        let task = PollingJob::builder()
            .action(move || poll_transfer(remote.clone(), polled_id.clone()))
            .time_to_live(self.settings.transfer_ttl)
            .poll_interval(self.settings.poll_interval)
            .description(format!("waiting for transfer process '{transfer_process_id}'"))
            .build()?
            .schedule(&self.scheduler);
        task.await.map_err(|err| match err {
            EdcClientError::Timeout {
                ..
            } => EdcClientError::TransferProcess {
                transfer_process_id,
                reason: err.to_string(),
            },
            other => other,
        })
    }
}

#[async_trait]
impl ContractNegotiator for ContractNegotiationService {
    async fn negotiate(
        &self,
        endpoint: &str,
        item: &CatalogItem,
        status: Option<CredentialStatus>,
        bpn: &str,
    ) -> Result<TransferProcessResponse, EdcClientError> {
        let status = status.unwrap_or(CredentialStatus::RequiredNew);
        let counter_party_address = with_provider_suffix(endpoint, &self.settings.provider_suffix);
        debug!(
            asset = %item.asset_prop_id,
            endpoint = %counter_party_address,
            status = status.label(),
            "negotiating catalog item"
        );
        let contract_id = match status {
            CredentialStatus::RequiredNew => {
                self.check_policy(item, bpn)?;
                self.negotiate_contract(&counter_party_address, item).await?
            }
            CredentialStatus::Expired(stale) => {
                info!(contract = %mask(&stale.contract_id), "reusing agreement of expired credential");
                stale.contract_id
            }
            CredentialStatus::Valid(_) => {
                return Err(EdcClientError::IllegalState(format!(
                    "credential for asset '{}' is still valid; no negotiation required",
                    item.asset_prop_id
                )));
            }
        };
        let request = self.transfer_request(&counter_party_address, item, contract_id);
        self.start_transfer(request).await
    }
}

// ============================================================================
// SECTION: State Polling
// ============================================================================

/// One negotiation poll: the agreement id once finalized.
async fn poll_negotiation(
    remote: Remote,
    negotiation_id: String,
) -> Result<Option<String>, EdcClientError> {
    let id = negotiation_id.clone();
    let state = remote.call(move |client| client.get_negotiation_state(&id)).await?.process_state();
    match state {
        ProcessState::Finalized => {
            let id = negotiation_id.clone();
            let negotiation = remote.call(move |client| client.get_negotiation(&id)).await?;
            match negotiation.contract_agreement_id.filter(|agreement| !agreement.is_empty()) {
                Some(agreement) => {
                    info!(negotiation = %negotiation_id, agreement = %mask(&agreement), "contract negotiation finalized");
                    Ok(Some(agreement))
                }
                None => Err(EdcClientError::Negotiation {
                    negotiation_id,
                    reason: "finalized without a contract agreement id".to_string(),
                }),
            }
        }
        state if state.is_failure() => Err(EdcClientError::Negotiation {
            negotiation_id,
            reason: format!("negotiation ended in state {state}"),
        }),
        _ => Ok(None),
    }
}

/// One transfer poll: the full transfer process once started.
async fn poll_transfer(
    remote: Remote,
    transfer_process_id: String,
) -> Result<Option<TransferProcessResponse>, EdcClientError> {
    let id = transfer_process_id.clone();
    let state =
        remote.call(move |client| client.get_transfer_process_state(&id)).await?.process_state();
    match state {
        ProcessState::Started | ProcessState::Completed => {
            let id = transfer_process_id;
            let transfer = remote.call(move |client| client.get_transfer_process(&id)).await?;
            Ok(Some(transfer))
        }
        state if state.is_failure() => Err(EdcClientError::TransferProcess {
            transfer_process_id,
            reason: format!("transfer process ended in state {state}"),
        }),
        _ => Ok(None),
    }
}
