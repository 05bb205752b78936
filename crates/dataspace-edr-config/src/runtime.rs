// crates/dataspace-edr-config/src/runtime.rs
// ============================================================================
// Module: EDR Runtime Wiring
// Description: Builds the acquisition components from a validated config.
// Purpose: Single composition root for transport, policies and orchestration.
// Dependencies: dataspace-edr-core, dataspace-edr-http, tracing
// ============================================================================

//! ## Overview
//! [`EdcRuntime::from_config`] wires the HTTP management client behind the
//! retrying decorator, then shares that client between the catalog facade
//! and the negotiation service. The credential cache is shared between the
//! orchestrator and the callback handler.
//! Invariants:
//! - The configuration is validated before any component is built.
//! - One worker pool bounds every transport call of the runtime.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use dataspace_edr_core::AcceptedPoliciesProvider;
use dataspace_edr_core::CatalogFacade;
use dataspace_edr_core::ContractNegotiationService;
use dataspace_edr_core::ControlPlaneClient;
use dataspace_edr_core::EdcOrchestrator;
use dataspace_edr_core::EndpointDataReferenceCache;
use dataspace_edr_core::EndpointDataReferenceCallback;
use dataspace_edr_core::PolicyChecker;
use dataspace_edr_core::PollingScheduler;
use dataspace_edr_core::RetryingControlPlaneClient;
use dataspace_edr_http::HttpControlPlaneClient;
use tracing::info;

use crate::config::ConfigError;
use crate::config::EdcConfig;

// ============================================================================
// SECTION: Runtime
// ============================================================================

/// Fully wired acquisition components.
pub struct EdcRuntime {
    /// Deduplicating acquisition entry point.
    orchestrator: Arc<EdcOrchestrator>,
    /// Credential cache shared with the callback handler.
    cache: Arc<EndpointDataReferenceCache>,
    /// Handler for pushed credentials.
    callback: EndpointDataReferenceCallback,
    /// Accepted policy matcher.
    policies: Arc<PolicyChecker>,
}

impl EdcRuntime {
    /// Builds every component described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the configuration fails
    /// validation or the HTTP client cannot be created.
    pub fn from_config(config: &EdcConfig, scheduler: PollingScheduler) -> Result<Self, ConfigError> {
        config.validate()?;
        let http = HttpControlPlaneClient::new(config.http_config())
            .map_err(|err| ConfigError::Invalid(format!("controlplane: {err}")))?;
        let control_plane_host = http.host();
        let client: Arc<dyn ControlPlaneClient> = Arc::new(RetryingControlPlaneClient::new(
            Arc::new(http),
            config.retry_registry(),
            control_plane_host.clone(),
        ));
        let pool = config.worker_pool();
        let cache = Arc::new(config.credential_cache());
        let policies = Arc::new(PolicyChecker::new(config.policy_store()));
        let provider: Arc<dyn AcceptedPoliciesProvider> = policies.clone();
        let negotiator = Arc::new(ContractNegotiationService::new(
            Arc::clone(&client),
            provider,
            pool.clone(),
            scheduler.clone(),
            config.negotiation_settings(),
        ));
        let catalog = Arc::new(CatalogFacade::new(client, config.catalog_settings()));
        let orchestrator = EdcOrchestrator::builder()
            .catalog(catalog)
            .negotiator(negotiator)
            .cache(Arc::clone(&cache))
            .pool(pool)
            .scheduler(scheduler)
            .settings(config.orchestrator_settings())
            .build()
            .map_err(|err| ConfigError::Invalid(format!("orchestrator: {err}")))?;
        info!(
            control_plane = %control_plane_host,
            workers = config.worker_pool.size,
            accepted_policies = config.accepted_policies.len(),
            "edr runtime ready"
        );
        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            callback: EndpointDataReferenceCallback::new(Arc::clone(&cache)),
            cache,
            policies,
        })
    }

    /// Returns the orchestrator.
    #[must_use]
    pub fn orchestrator(&self) -> Arc<EdcOrchestrator> {
        Arc::clone(&self.orchestrator)
    }

    /// Returns the credential cache.
    #[must_use]
    pub const fn cache(&self) -> &Arc<EndpointDataReferenceCache> {
        &self.cache
    }

    /// Returns the callback handler writing into the cache.
    #[must_use]
    pub const fn callback(&self) -> &EndpointDataReferenceCallback {
        &self.callback
    }

    /// Returns the accepted policy matcher, for runtime policy updates.
    #[must_use]
    pub const fn policies(&self) -> &Arc<PolicyChecker> {
        &self.policies
    }
}
