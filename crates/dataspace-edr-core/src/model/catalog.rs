// crates/dataspace-edr-core/src/model/catalog.rs
// ============================================================================
// Module: Catalog Model
// Description: Wire catalog, catalog query and resolved catalog items.
// Purpose: Describe what a provider connector offers and how to query it.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`Catalog`] is what a provider returns for a [`CatalogRequest`]. Each
//! [`Dataset`] maps to one [`CatalogItem`] carrying the first offer and the
//! resolved connector id.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::model::policy::Policy;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fully qualified asset id property of a dataset.
pub const NAMESPACE_EDC_ID: &str = "https://w3id.org/edc/v0.0.1/ns/id";
/// Provider-extension participant id property of a catalog.
pub const NAMESPACE_EDC_PARTICIPANT_ID: &str = "https://w3id.org/edc/v0.0.1/ns/participantId";
/// Legacy dataspace-protocol participant id property of a catalog.
pub const NAMESPACE_DSPACE_PARTICIPANT_ID: &str = "https://w3id.org/dspace/v0.8/participantId";

// ============================================================================
// SECTION: Wire Catalog
// ============================================================================

/// Catalog returned by a provider connector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Catalog identifier.
    pub id: String,
    /// Catalog-level participant id, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<String>,
    /// Expanded catalog properties.
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
    /// Datasets in provider order.
    #[serde(default)]
    pub datasets: Vec<Dataset>,
}

impl Catalog {
    /// Returns the connector id using the documented fallback order.
    ///
    /// Provider-extension property, then legacy participant property, then
    /// the catalog-level participant id, then the catalog id.
    #[must_use]
    pub fn connector_id(&self) -> String {
        string_property(&self.properties, NAMESPACE_EDC_PARTICIPANT_ID)
            .or_else(|| string_property(&self.properties, NAMESPACE_DSPACE_PARTICIPANT_ID))
            .or_else(|| self.participant_id.clone().filter(|id| !id.is_empty()))
            .unwrap_or_else(|| self.id.clone())
    }
}

/// Dataset entry of a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    /// Dataset identifier.
    pub id: String,
    /// Expanded dataset properties.
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
    /// Offers in provider order.
    #[serde(default)]
    pub offers: Vec<Offer>,
}

impl Dataset {
    /// Returns the asset id property, falling back to the dataset id.
    #[must_use]
    pub fn asset_id(&self) -> String {
        string_property(&self.properties, NAMESPACE_EDC_ID).unwrap_or_else(|| self.id.clone())
    }
}

/// Contract offer of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    /// Offer identifier.
    pub id: String,
    /// Usage policy of the offer.
    pub policy: Policy,
}

// ============================================================================
// SECTION: Catalog Items
// ============================================================================

/// Resolved catalog entry used to drive a negotiation.
///
/// # Invariants
/// - Immutable once constructed.
/// - `connector_id` is resolved with [`Catalog::connector_id`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Asset id.
    pub item_id: String,
    /// Asset property id.
    pub asset_prop_id: String,
    /// Offer id.
    pub offer_id: String,
    /// Provider connector id (BPN).
    pub connector_id: String,
    /// Usage policy of the offer.
    pub policy: Policy,
}

// ============================================================================
// SECTION: Catalog Requests
// ============================================================================

/// Catalog query sent to the local control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRequest {
    /// Dataspace protocol identifier.
    pub protocol: String,
    /// Provider connector address.
    pub counter_party_address: String,
    /// Provider connector id (BPN).
    pub counter_party_id: String,
    /// Paging and filtering.
    pub query_spec: QuerySpec,
}

/// Paging and filtering of a catalog query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    /// Zero-based dataset offset.
    pub offset: usize,
    /// Maximum number of datasets, unbounded when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Optional equality filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Criterion>,
}

/// Equality criterion of a catalog filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    /// Left operand, a dataset property key.
    pub operand_left: String,
    /// Operator, `=` for equality.
    pub operator: String,
    /// Right operand.
    pub operand_right: String,
}

impl Criterion {
    /// Builds an equality criterion.
    #[must_use]
    pub fn equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            operand_left: key.into(),
            operator: "=".to_string(),
            operand_right: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads a non-empty string property, unwrapping JSON-LD `@value` objects.
fn string_property(properties: &BTreeMap<String, Value>, key: &str) -> Option<String> {
    let value = properties.get(key)?;
    let text = match value {
        Value::String(text) => Some(text.as_str()),
        Value::Object(map) => map.get("@value").and_then(Value::as_str),
        _ => None,
    }?;
    if text.is_empty() { None } else { Some(text.to_string()) }
}
