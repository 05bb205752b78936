// crates/dataspace-edr-core/src/callback.rs
// ============================================================================
// Module: Endpoint Data Reference Callback
// Description: Parsing of pushed credentials and delivery into the cache.
// Purpose: Accept transfer-started callbacks from the connector.
// Dependencies: serde_json, tracing
// ============================================================================

//! ## Overview
//! The connector pushes an envelope once a transfer has started. The
//! credential lives under `payload.dataAddress.properties`; keys may be short,
//! `edc:`-prefixed or fully expanded. Older connectors push a flat reference
//! whose agreement id sits in `properties.cid` or `contractId`.
//! The HTTP listener receiving the envelope is owned by the host application.
//! Invariants:
//! - A parsed reference is stored under its agreement id, last write wins.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Map;
use serde_json::Value;
use tracing::info;

use crate::cache::EndpointDataReferenceCache;
use crate::error::EdcClientError;
use crate::model::EndpointDataReference;
use crate::util::mask;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Expanded EDC vocabulary namespace.
const EDC_NAMESPACE: &str = "https://w3id.org/edc/v0.0.1/ns/";
/// Compact EDC vocabulary prefix.
const EDC_PREFIX: &str = "edc:";
/// Header name used when the provider names none.
const DEFAULT_AUTH_KEY: &str = "Authorization";
/// Property keys consumed into dedicated reference fields.
const CONSUMED_KEYS: [&str; 8] = [
    "process_id",
    "agreement_id",
    "contractId",
    "endpoint",
    "authorization",
    "authKey",
    "authCode",
    "id",
];

// ============================================================================
// SECTION: Callback Handler
// ============================================================================

/// Stores pushed endpoint data references into the shared cache.
#[derive(Debug, Clone)]
pub struct EndpointDataReferenceCallback {
    /// Cache shared with the orchestrator.
    cache: Arc<EndpointDataReferenceCache>,
}

impl EndpointDataReferenceCallback {
    /// Creates a handler writing into `cache`.
    #[must_use]
    pub const fn new(cache: Arc<EndpointDataReferenceCache>) -> Self {
        Self {
            cache,
        }
    }

    /// Parses a raw callback body and stores the reference.
    ///
    /// Returns the agreement id the reference was stored under.
    ///
    /// # Errors
    ///
    /// Returns [`EdcClientError::Client`] when the body is not JSON or lacks
    /// the agreement id or endpoint.
    pub fn handle(&self, body: &[u8]) -> Result<String, EdcClientError> {
        let envelope: Value = serde_json::from_slice(body)
            .map_err(|err| EdcClientError::Client(format!("invalid callback body: {err}")))?;
        let reference = Self::parse(&envelope)?;
        let storage_id = reference.contract_id.clone();
        info!(storage_id = %mask(&storage_id), "received endpoint data reference");
        self.cache.put(storage_id.clone(), reference);
        Ok(storage_id)
    }

    /// Parses a callback envelope or a flat legacy reference.
    ///
    /// # Errors
    ///
    /// Returns [`EdcClientError::Client`] when the agreement id or endpoint
    /// is missing.
    pub fn parse(envelope: &Value) -> Result<EndpointDataReference, EdcClientError> {
        let address_properties = envelope
            .pointer("/payload/dataAddress/properties")
            .and_then(Value::as_object);
        match address_properties {
            Some(properties) => parse_properties(properties, envelope),
            None => parse_legacy(envelope),
        }
    }
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses the current `payload.dataAddress.properties` layout.
fn parse_properties(
    properties: &Map<String, Value>,
    envelope: &Value,
) -> Result<EndpointDataReference, EdcClientError> {
    let contract_id = lookup(properties, "agreement_id")
        .or_else(|| lookup(properties, "contractId"))
        .ok_or_else(|| missing("agreement_id"))?;
    let endpoint = lookup(properties, "endpoint").ok_or_else(|| missing("endpoint"))?;
    let id = lookup(properties, "process_id")
        .or_else(|| {
            envelope.pointer("/payload/transferProcessId").and_then(Value::as_str).map(str::to_string)
        })
        .unwrap_or_default();
    Ok(EndpointDataReference {
        id,
        contract_id,
        endpoint,
        auth_key: lookup(properties, "authKey").unwrap_or_else(|| DEFAULT_AUTH_KEY.to_string()),
        auth_code: lookup(properties, "authorization").or_else(|| lookup(properties, "authCode")),
        properties: remaining(properties),
    })
}

/// Parses the flat legacy reference layout.
fn parse_legacy(envelope: &Value) -> Result<EndpointDataReference, EdcClientError> {
    let object = envelope
        .as_object()
        .ok_or_else(|| EdcClientError::Client("callback body is not an object".to_string()))?;
    let nested = object.get("properties").and_then(Value::as_object);
    let contract_id = nested
        .and_then(|properties| lookup(properties, "cid"))
        .or_else(|| lookup(object, "contractId"))
        .or_else(|| nested.and_then(|properties| lookup(properties, "contractId")))
        .ok_or_else(|| missing("contractId"))?;
    let endpoint = lookup(object, "endpoint").ok_or_else(|| missing("endpoint"))?;
    Ok(EndpointDataReference {
        id: lookup(object, "id").unwrap_or_default(),
        contract_id,
        endpoint,
        auth_key: lookup(object, "authKey").unwrap_or_else(|| DEFAULT_AUTH_KEY.to_string()),
        auth_code: lookup(object, "authCode"),
        properties: nested.map(remaining).unwrap_or_default(),
    })
}

/// Looks up a non-empty string under its short, prefixed or expanded key.
fn lookup(properties: &Map<String, Value>, key: &str) -> Option<String> {
    [key.to_string(), format!("{EDC_PREFIX}{key}"), format!("{EDC_NAMESPACE}{key}")]
        .iter()
        .find_map(|candidate| properties.get(candidate).and_then(Value::as_str))
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Collects string properties not consumed into dedicated fields.
fn remaining(properties: &Map<String, Value>) -> BTreeMap<String, String> {
    properties
        .iter()
        .filter(|(key, _)| !CONSUMED_KEYS.iter().any(|consumed| *consumed == short_key(key)))
        .filter_map(|(key, value)| value.as_str().map(|text| (short_key(key).to_string(), text.to_string())))
        .collect()
}

/// Strips the EDC prefix or namespace from a key.
fn short_key(key: &str) -> &str {
    key.strip_prefix(EDC_NAMESPACE).or_else(|| key.strip_prefix(EDC_PREFIX)).unwrap_or(key)
}

/// Builds the missing-field error.
fn missing(field: &str) -> EdcClientError {
    EdcClientError::Client(format!("callback is missing '{field}'"))
}
