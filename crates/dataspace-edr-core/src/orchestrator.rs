// crates/dataspace-edr-core/src/orchestrator.rs
// ============================================================================
// Module: EDC Orchestrator
// Description: Deduplicated acquisition of endpoint data references.
// Purpose: Hand callers a shared future for the credential of an asset.
// Dependencies: futures, tokio, tracing
// ============================================================================

//! ## Overview
//! [`EdcOrchestrator`] is the entry point of the pipeline. For an
//! `(asset id, connector endpoint)` key it returns, in order of preference:
//! an already resolved future for a valid cached credential, the shared
//! future of a negotiation already running for the key, or a new negotiation
//! future registered for the key.
//!
//! A new negotiation runs the [`ContractNegotiator`] and then waits for the
//! callback to deliver the credential into the cache under the transfer's
//! agreement id. A spawned completion driver stores the result under the key
//! and retires the registry entry.
//! Invariants:
//! - Check-then-register runs under one async mutex; all callers for a key
//!   observe the same result.
//! - On success the credential is cached before the registry entry is removed.
//! - The registry entry is removed on success, failure and shutdown.
//! - Only a credential written after the negotiation started resolves the
//!   callback wait; its token is not inspected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use futures::FutureExt;
use futures::future::BoxFuture;
use futures::future::Shared;
use tokio::sync::Mutex;
use tokio::sync::watch;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::cache::CredentialStatus;
use crate::cache::EndpointDataReferenceCache;
use crate::catalog::CatalogFacade;
use crate::error::EdcClientError;
use crate::model::CatalogItem;
use crate::model::EndpointDataReference;
use crate::model::catalog::NAMESPACE_EDC_ID;
use crate::negotiation::ContractNegotiator;
use crate::negotiation::DEFAULT_PROCESS_TTL;
use crate::polling::DEFAULT_POLL_INTERVAL;
use crate::polling::PollingJob;
use crate::polling::PollingScheduler;
use crate::pool::WorkerPool;
use crate::registry::OngoingNegotiations;
use crate::util::mask;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Result shared by every waiter of one negotiation.
pub type EdrResult = Result<Arc<EndpointDataReference>, EdcClientError>;

/// Shareable future resolving to an endpoint data reference.
pub type EdrFuture = Shared<BoxFuture<'static, EdrResult>>;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Maximum wait for the callback to deliver a credential.
    pub edr_request_ttl: Duration,
    /// Delay between cache checks while waiting for the callback.
    pub poll_interval: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            edr_request_ttl: DEFAULT_PROCESS_TTL,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Deduplicating entry point for endpoint data reference acquisition.
///
/// # Invariants
/// - At most one negotiation runs per storage key.
pub struct EdcOrchestrator {
    /// Catalog access.
    catalog: Arc<CatalogFacade>,
    /// Negotiation and transfer state machines.
    negotiator: Arc<dyn ContractNegotiator>,
    /// Credential cache.
    cache: Arc<EndpointDataReferenceCache>,
    /// In-flight negotiations.
    registry: Arc<OngoingNegotiations<EdrFuture>>,
    /// Pool running blocking catalog calls.
    pool: WorkerPool,
    /// Scheduler for cache polling and completion drivers.
    scheduler: PollingScheduler,
    /// Orchestrator settings.
    settings: OrchestratorSettings,
    /// Guards check-then-register.
    lock: Mutex<()>,
    /// Cooperative shutdown signal.
    shutdown: watch::Sender<bool>,
}

impl EdcOrchestrator {
    /// Starts building an orchestrator.
    #[must_use]
    pub fn builder() -> EdcOrchestratorBuilder {
        EdcOrchestratorBuilder::default()
    }

    /// Returns the credential cache.
    #[must_use]
    pub const fn cache(&self) -> &Arc<EndpointDataReferenceCache> {
        &self.cache
    }

    /// Returns the in-flight negotiation registry.
    #[must_use]
    pub const fn ongoing(&self) -> &Arc<OngoingNegotiations<EdrFuture>> {
        &self.registry
    }

    /// Returns the storage key of an asset at a connector endpoint.
    #[must_use]
    pub fn storage_key(asset_id: &str, endpoint: &str) -> String {
        format!("{asset_id}{endpoint}")
    }

    /// Returns a future for the credential of `asset_id` at `endpoint`.
    ///
    /// A valid cached credential resolves immediately without transport
    /// calls. A negotiation already running for the key is shared. Otherwise
    /// `catalog_item`, or the catalog entry resolved for `asset_id`, is
    /// negotiated.
    ///
    /// # Errors
    ///
    /// Returns [`EdcClientError::Interrupted`] after shutdown and catalog
    /// errors when the item has to be resolved. Negotiation failures are
    /// reported through the returned future.
    pub async fn get_endpoint_data_reference(
        &self,
        endpoint: &str,
        asset_id: &str,
        bpn: &str,
        catalog_item: Option<CatalogItem>,
    ) -> Result<EdrFuture, EdcClientError> {
        if self.is_shut_down() {
            return Err(EdcClientError::Interrupted("orchestrator is shut down".to_string()));
        }
        let storage_key = Self::storage_key(asset_id, endpoint);
        let _guard = self.lock.lock().await;

        let status = match self.cache.classify(&storage_key) {
            CredentialStatus::Valid(reference) => {
                info!(storage_id = %mask(&storage_key), "using cached endpoint data reference");
                return Ok(resolved(Ok(Arc::new(reference))));
            }
            status => status,
        };
        if let Some(ongoing) = self.registry.get(&storage_key) {
            debug!(storage_id = %mask(&storage_key), "joining ongoing negotiation");
            return Ok(ongoing);
        }

        let item = match catalog_item {
            Some(item) => item,
            None => self.get_catalog_item(endpoint, asset_id, bpn).await?,
        };
        info!(
            storage_id = %mask(&storage_key),
            status = status.label(),
            "starting negotiation for endpoint data reference"
        );
        let future = self.negotiation_future(endpoint, bpn, item, status);
        self.registry.add(storage_key.clone(), future.clone());
        self.spawn_completion(storage_key, future.clone());
        Ok(future)
    }

    /// Returns a future for the credential of a resolved catalog item.
    ///
    /// # Errors
    ///
    /// Same as [`EdcOrchestrator::get_endpoint_data_reference`].
    pub async fn get_endpoint_data_reference_for_item(
        &self,
        endpoint: &str,
        item: CatalogItem,
        bpn: &str,
    ) -> Result<EdrFuture, EdcClientError> {
        let asset_id = item.asset_prop_id.clone();
        self.get_endpoint_data_reference(endpoint, &asset_id, bpn, Some(item)).await
    }

    /// Returns one future per catalog item.
    ///
    /// Items are negotiated with their own connector id as BPN. A failure to
    /// start one item becomes an already failed future for that item.
    pub async fn get_endpoint_data_references(
        &self,
        endpoint: &str,
        items: Vec<CatalogItem>,
    ) -> Vec<EdrFuture> {
        let mut futures = Vec::with_capacity(items.len());
        for item in items {
            let bpn = item.connector_id.clone();
            let future = match self.get_endpoint_data_reference_for_item(endpoint, item, &bpn).await {
                Ok(future) => future,
                Err(err) => resolved(Err(err)),
            };
            futures.push(future);
        }
        futures
    }

    /// Fetches the catalog items whose `filter_key` equals `filter_value`.
    ///
    /// # Errors
    ///
    /// Returns [`EdcClientError::CatalogEmpty`] when nothing is offered and
    /// transport errors from the catalog request.
    pub async fn get_catalog_items(
        &self,
        endpoint: &str,
        filter_key: &str,
        filter_value: &str,
        bpn: &str,
    ) -> Result<Vec<CatalogItem>, EdcClientError> {
        let catalog = Arc::clone(&self.catalog);
        let (owned_endpoint, owned_key, owned_value, owned_bpn) =
            (endpoint.to_string(), filter_key.to_string(), filter_value.to_string(), bpn.to_string());
        let items = self
            .pool
            .run(move || catalog.fetch_by_filter(&owned_endpoint, &owned_key, &owned_value, &owned_bpn))
            .await?;
        non_empty(items, endpoint, filter_key, filter_value)
    }

    /// Fetches the first catalog item offered for `asset_id`.
    ///
    /// # Errors
    ///
    /// Same as [`EdcOrchestrator::get_catalog_items`].
    pub async fn get_catalog_item(
        &self,
        endpoint: &str,
        asset_id: &str,
        bpn: &str,
    ) -> Result<CatalogItem, EdcClientError> {
        let items = self.get_catalog_items(endpoint, NAMESPACE_EDC_ID, asset_id, bpn).await?;
        items.into_iter().next().ok_or_else(|| EdcClientError::CatalogEmpty {
            endpoint: endpoint.to_string(),
            filter_key: NAMESPACE_EDC_ID.to_string(),
            filter_value: asset_id.to_string(),
        })
    }

    /// Pages through the unfiltered catalog until `asset_id` appears.
    ///
    /// Returns every item seen on the way.
    ///
    /// # Errors
    ///
    /// Returns [`EdcClientError::CatalogEmpty`] when no page held any item and
    /// transport errors from page requests.
    pub async fn browse_catalog(
        &self,
        endpoint: &str,
        asset_id: &str,
        bpn: &str,
    ) -> Result<Vec<CatalogItem>, EdcClientError> {
        let catalog = Arc::clone(&self.catalog);
        let (owned_endpoint, owned_asset, owned_bpn) =
            (endpoint.to_string(), asset_id.to_string(), bpn.to_string());
        let items = self
            .pool
            .run(move || catalog.fetch_until_match(&owned_endpoint, &owned_asset, &owned_bpn))
            .await?;
        non_empty(items, endpoint, NAMESPACE_EDC_ID, asset_id)
    }

    /// Waits for a credential future.
    ///
    /// Returns `Ok(None)` when the orchestrator shuts down during the wait or
    /// the wait was interrupted.
    ///
    /// # Errors
    ///
    /// Returns the failure the negotiation resolved with.
    pub async fn await_endpoint_data_reference(
        &self,
        future: EdrFuture,
    ) -> Result<Option<Arc<EndpointDataReference>>, EdcClientError> {
        if self.is_shut_down() {
            return Ok(None);
        }
        let shutdown = self.shutdown.subscribe();
        tokio::select! {
            result = future => match result {
                Ok(reference) => Ok(Some(reference)),
                Err(EdcClientError::Interrupted(reason)) => {
                    warn!(reason = %reason, "endpoint data reference wait interrupted");
                    Ok(None)
                }
                Err(err) => Err(err),
            },
            () = stopped(shutdown) => Ok(None),
        }
    }

    /// Signals shutdown; pending waits return `Ok(None)` and completion
    /// drivers stop their negotiations.
    pub fn shutdown(&self) {
        info!(ongoing = self.registry.keys().len(), "shutting down orchestrator");
        self.shutdown.send_replace(true);
    }

    /// Returns true once [`EdcOrchestrator::shutdown`] was called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Builds the shared negotiation future for one key.
    fn negotiation_future(
        &self,
        endpoint: &str,
        bpn: &str,
        item: CatalogItem,
        status: CredentialStatus,
    ) -> EdrFuture {
        let negotiator = Arc::clone(&self.negotiator);
        let cache = Arc::clone(&self.cache);
        let scheduler = self.scheduler.clone();
        let settings = self.settings.clone();
        let endpoint = endpoint.to_string();
        let bpn = bpn.to_string();
        let stale_contract = match &status {
            CredentialStatus::Expired(reference) => Some(reference.contract_id.clone()),
            CredentialStatus::Valid(_) | CredentialStatus::RequiredNew => None,
        };
        async move {
            let since = Instant::now();
            let response = negotiator.negotiate(&endpoint, &item, Some(status), &bpn).await?;
            let storage_id = if response.contract_id.is_empty() {
                stale_contract.ok_or_else(|| EdcClientError::TransferProcess {
                    transfer_process_id: response.response_id.clone(),
                    reason: "transfer process carries no contract id".to_string(),
                })?
            } else {
                response.contract_id.clone()
            };
            debug!(storage_id = %mask(&storage_id), "waiting for endpoint data reference callback");
            let polled_id = storage_id.clone();
            let job = PollingJob::builder()
                .action(move || {
                    let reference = cache.get_if_stored_since(&polled_id, since);
                    async move { Ok(reference) }
                })
                .time_to_live(settings.edr_request_ttl)
                .poll_interval(settings.poll_interval)
                .description(format!(
                    "waiting for endpoint data reference of contract '{}'",
                    mask(&storage_id)
                ))
                .build()?;
            let reference = job.schedule(&scheduler).await?;
            Ok::<_, EdcClientError>(Arc::new(reference))
        }
        .boxed()
        .shared()
    }

    /// Spawns the driver caching the result and retiring the registry entry.
    fn spawn_completion(&self, storage_key: String, future: EdrFuture) {
        let cache = Arc::clone(&self.cache);
        let registry = Arc::clone(&self.registry);
        let shutdown = self.shutdown.subscribe();
        self.scheduler.handle().spawn(async move {
            tokio::select! {
                result = future => match result {
                    Ok(reference) => {
                        info!(storage_id = %mask(&storage_key), "caching endpoint data reference");
                        cache.put(storage_key.clone(), (*reference).clone());
                    }
                    Err(err) => {
                        warn!(storage_id = %mask(&storage_key), kind = err.kind().as_str(), error = %err, "negotiation failed");
                    }
                },
                () = stopped(shutdown) => {
                    debug!(storage_id = %mask(&storage_key), "negotiation abandoned on shutdown");
                }
            }
            registry.remove(&storage_key);
        });
    }
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builder for [`EdcOrchestrator`].
#[derive(Default)]
pub struct EdcOrchestratorBuilder {
    /// Catalog access.
    catalog: Option<Arc<CatalogFacade>>,
    /// Negotiator.
    negotiator: Option<Arc<dyn ContractNegotiator>>,
    /// Credential cache.
    cache: Option<Arc<EndpointDataReferenceCache>>,
    /// Worker pool.
    pool: Option<WorkerPool>,
    /// Polling scheduler.
    scheduler: Option<PollingScheduler>,
    /// Settings.
    settings: OrchestratorSettings,
}

impl EdcOrchestratorBuilder {
    /// Sets the catalog facade.
    #[must_use]
    pub fn catalog(mut self, catalog: Arc<CatalogFacade>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Sets the negotiator.
    #[must_use]
    pub fn negotiator(mut self, negotiator: Arc<dyn ContractNegotiator>) -> Self {
        self.negotiator = Some(negotiator);
        self
    }

    /// Sets the credential cache shared with the callback handler.
    #[must_use]
    pub fn cache(mut self, cache: Arc<EndpointDataReferenceCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sets the worker pool.
    #[must_use]
    pub fn pool(mut self, pool: WorkerPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Sets the polling scheduler.
    #[must_use]
    pub fn scheduler(mut self, scheduler: PollingScheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Sets the orchestrator settings.
    #[must_use]
    pub fn settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Builds the orchestrator.
    ///
    /// The cache, pool and scheduler default to a fresh cache, a default
    /// pool and the current runtime.
    ///
    /// # Errors
    ///
    /// Returns [`EdcClientError::IllegalState`] when the catalog or
    /// negotiator is missing, or when no scheduler was set outside a runtime.
    pub fn build(self) -> Result<EdcOrchestrator, EdcClientError> {
        let catalog = self
            .catalog
            .ok_or_else(|| EdcClientError::IllegalState("orchestrator requires a catalog".to_string()))?;
        let negotiator = self.negotiator.ok_or_else(|| {
            EdcClientError::IllegalState("orchestrator requires a negotiator".to_string())
        })?;
        let scheduler = match self.scheduler {
            Some(scheduler) => scheduler,
            None => PollingScheduler::current()?,
        };
        let (shutdown, _) = watch::channel(false);
        Ok(EdcOrchestrator {
            catalog,
            negotiator,
            cache: self.cache.unwrap_or_default(),
            registry: Arc::new(OngoingNegotiations::new()),
            pool: self.pool.unwrap_or_default(),
            scheduler,
            settings: self.settings,
            lock: Mutex::new(()),
            shutdown,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Wraps a result into an already resolved shared future.
fn resolved(result: EdrResult) -> EdrFuture {
    futures::future::ready(result).boxed().shared()
}

/// Resolves once shutdown is signalled or the orchestrator is dropped.
async fn stopped(mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Turns an empty item list into [`EdcClientError::CatalogEmpty`].
fn non_empty(
    items: Vec<CatalogItem>,
    endpoint: &str,
    filter_key: &str,
    filter_value: &str,
) -> Result<Vec<CatalogItem>, EdcClientError> {
    if items.is_empty() {
        return Err(EdcClientError::CatalogEmpty {
            endpoint: endpoint.to_string(),
            filter_key: filter_key.to_string(),
            filter_value: filter_value.to_string(),
        });
    }
    Ok(items)
}
