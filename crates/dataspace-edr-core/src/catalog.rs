// crates/dataspace-edr-core/src/catalog.rs
// ============================================================================
// Module: Catalog Facade
// Description: Catalog queries, pagination and mapping into catalog items.
// Purpose: Resolve provider offers for an asset through the control plane.
// Dependencies: tracing
// ============================================================================

//! ## Overview
//! [`CatalogFacade`] issues catalog requests through a [`ControlPlaneClient`]
//! and maps datasets into [`CatalogItem`] values. Calls block; the
//! orchestrator runs them on the worker pool.
//!
//! Pagination in [`CatalogFacade::fetch_until_match`] stops when the target
//! asset appears, when a page is shorter than the page size, or when a page
//! repeats the dataset ids of the previous one.
//! Invariants:
//! - No retries happen here; the transport decides about retries.
//! - A page size of zero requests a single unbounded page.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::error::EdcClientError;
use crate::interfaces::ControlPlaneClient;
use crate::model::Catalog;
use crate::model::CatalogItem;
use crate::model::CatalogRequest;
use crate::model::Criterion;
use crate::model::Dataset;
use crate::model::QuerySpec;
use crate::model::catalog::NAMESPACE_EDC_ID;
use crate::util::DEFAULT_PROVIDER_SUFFIX;
use crate::util::with_provider_suffix;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Dataspace protocol identifier sent with every request.
pub const DATASPACE_PROTOCOL_HTTP: &str = "dataspace-protocol-http";
/// Default catalog page size.
pub const DEFAULT_PAGE_SIZE: usize = 50;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Catalog facade settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSettings {
    /// Datasets requested per page; zero disables paging.
    pub page_size: usize,
    /// Suffix appended to provider addresses lacking it.
    pub provider_suffix: String,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            provider_suffix: DEFAULT_PROVIDER_SUFFIX.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Facade
// ============================================================================

/// Catalog access over a control-plane client.
pub struct CatalogFacade {
    /// Control-plane transport.
    client: Arc<dyn ControlPlaneClient>,
    /// Paging settings.
    settings: CatalogSettings,
}

impl CatalogFacade {
    /// Creates a facade over `client`.
    #[must_use]
    pub fn new(client: Arc<dyn ControlPlaneClient>, settings: CatalogSettings) -> Self {
        Self {
            client,
            settings,
        }
    }

    /// Fetches the items matching one equality filter in a single request.
    ///
    /// # Errors
    ///
    /// Returns [`EdcClientError::Transport`] when the request fails.
    pub fn fetch_by_filter(
        &self,
        endpoint: &str,
        filter_key: &str,
        filter_value: &str,
        bpn: &str,
    ) -> Result<Vec<CatalogItem>, EdcClientError> {
        let request = self.request(endpoint, bpn, QuerySpec {
            offset: 0,
            limit: None,
            filter: Some(Criterion::equals(filter_key, filter_value)),
        });
        let catalog = self.client.get_catalog(&request)?;
        debug!(
            endpoint = %request.counter_party_address,
            filter_key,
            datasets = catalog.datasets.len(),
            "fetched filtered catalog"
        );
        Ok(map_catalog(&catalog))
    }

    /// Fetches the items offered for one asset id.
    ///
    /// # Errors
    ///
    /// Returns [`EdcClientError::Transport`] when the request fails.
    pub fn fetch_by_id(
        &self,
        endpoint: &str,
        asset_id: &str,
        bpn: &str,
    ) -> Result<Vec<CatalogItem>, EdcClientError> {
        self.fetch_by_filter(endpoint, NAMESPACE_EDC_ID, asset_id, bpn)
    }

    /// Pages through the catalog until `target_asset_id` appears.
    ///
    /// Returns every item collected so far, including the page holding the
    /// target. A repeated page is not appended.
    ///
    /// # Errors
    ///
    /// Returns [`EdcClientError::Transport`] when any page request fails.
    pub fn fetch_until_match(
        &self,
        endpoint: &str,
        target_asset_id: &str,
        bpn: &str,
    ) -> Result<Vec<CatalogItem>, EdcClientError> {
        let page_size = self.settings.page_size;
        info!(endpoint, target = target_asset_id, page_size, "paging provider catalog");
        if page_size == 0 {
            let request = self.request(endpoint, bpn, QuerySpec::default());
            return Ok(map_catalog(&self.client.get_catalog(&request)?));
        }

        let mut items = Vec::new();
        let mut previous_ids: Option<BTreeSet<String>> = None;
        let mut offset = 0;
        loop {
            let request = self.request(endpoint, bpn, QuerySpec {
                offset,
                limit: Some(page_size),
                filter: None,
            });
            let catalog = self.client.get_catalog(&request)?;
            let page = map_catalog(&catalog);
            let ids: BTreeSet<String> =
                catalog.datasets.iter().map(|dataset| dataset.id.clone()).collect();

            if page.iter().any(|item| item.asset_prop_id == target_asset_id) {
                debug!(offset, "target asset found in catalog page");
                items.extend(page);
                break;
            }
            if catalog.datasets.len() < page_size {
                items.extend(page);
                break;
            }
            if previous_ids.as_ref() == Some(&ids) {
                warn!(offset, "catalog page repeats previous page, stopping");
                break;
            }
            items.extend(page);
            previous_ids = Some(ids);
            offset += page_size;
        }
        Ok(items)
    }

    /// Builds a catalog request for `endpoint`.
    fn request(&self, endpoint: &str, bpn: &str, query_spec: QuerySpec) -> CatalogRequest {
        CatalogRequest {
            protocol: DATASPACE_PROTOCOL_HTTP.to_string(),
            counter_party_address: with_provider_suffix(endpoint, &self.settings.provider_suffix),
            counter_party_id: bpn.to_string(),
            query_spec,
        }
    }
}

// ============================================================================
// SECTION: Mapping
// ============================================================================

/// Maps every dataset with at least one offer into a catalog item.
fn map_catalog(catalog: &Catalog) -> Vec<CatalogItem> {
    let connector_id = catalog.connector_id();
    catalog
        .datasets
        .iter()
        .filter_map(|dataset| map_dataset(dataset, &connector_id))
        .collect()
}

/// Maps one dataset, keeping its first offer.
fn map_dataset(dataset: &Dataset, connector_id: &str) -> Option<CatalogItem> {
    if dataset.offers.len() > 1 {
        warn!(dataset = %dataset.id, offers = dataset.offers.len(), "dataset has several offers, using the first");
    }
    let Some(offer) = dataset.offers.first() else {
        warn!(dataset = %dataset.id, "dataset has no offer, skipping");
        return None;
    };
    Some(CatalogItem {
        item_id: dataset.id.clone(),
        asset_prop_id: dataset.asset_id(),
        offer_id: offer.id.clone(),
        connector_id: connector_id.to_string(),
        policy: offer.policy.clone(),
    })
}
