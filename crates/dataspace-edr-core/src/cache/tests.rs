// crates/dataspace-edr-core/src/cache/tests.rs
// ============================================================================
// Module: Endpoint Data Reference Cache Tests
// Description: Unit tests for storage, sweeping and classification.
// Purpose: Validate last-write-wins, age-based sweeps and status derivation.
// Dependencies: dataspace-edr-core
// ============================================================================

//! ## Overview
//! Covers [`super::EndpointDataReferenceCache`] storage semantics and
//! [`super::CredentialStatus`] classification.

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

use std::collections::BTreeMap;
use std::time::Duration;
use std::time::Instant;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::json;
use time::OffsetDateTime;

use super::CredentialStatus;
use super::EndpointDataReferenceCache;
use crate::model::EndpointDataReference;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn reference(contract_id: &str, auth_code: Option<String>) -> EndpointDataReference {
    EndpointDataReference {
        id: format!("tp-{contract_id}"),
        contract_id: contract_id.to_string(),
        endpoint: "https://provider.example/public".to_string(),
        auth_key: "Authorization".to_string(),
        auth_code,
        properties: BTreeMap::new(),
    }
}

fn token_expiring_at(exp: i64) -> String {
    let payload = URL_SAFE_NO_PAD.encode(json!({ "exp": exp, "cid": "c" }).to_string());
    format!("header.{payload}.sig")
}

// ============================================================================
// SECTION: Storage
// ============================================================================

#[test]
fn put_is_last_write_wins() {
    let cache = EndpointDataReferenceCache::default();
    cache.put("key", reference("first", None));
    cache.put("key", reference("second", None));
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get("key").unwrap().contract_id, "second");
}

#[test]
fn put_sweeps_entries_older_than_storage_duration() {
    let cache = EndpointDataReferenceCache::new(Duration::from_millis(30));
    cache.put("old", reference("old", None));
    std::thread::sleep(Duration::from_millis(60));
    cache.put("new", reference("new", None));
    assert!(cache.get("old").is_none());
    assert!(cache.get("new").is_some());
}

#[test]
fn put_keeps_entries_younger_than_storage_duration() {
    let cache = EndpointDataReferenceCache::new(Duration::from_secs(60));
    cache.put("a", reference("a", None));
    cache.put("b", reference("b", None));
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.remove("a").unwrap().contract_id, "a");
    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn get_if_stored_since_skips_entries_written_before_the_instant() {
    let cache = EndpointDataReferenceCache::default();
    cache.put("agreement", reference("old", Some("opaque-old".to_string())));
    std::thread::sleep(Duration::from_millis(5));
    let since = Instant::now();
    assert!(cache.get_if_stored_since("agreement", since).is_none());
    assert!(cache.get_if_stored_since("missing", since).is_none());

    cache.put("agreement", reference("new", Some("opaque-bearer-token".to_string())));
    let delivered = cache.get_if_stored_since("agreement", since).unwrap();
    assert_eq!(delivered.contract_id, "new");
    assert_eq!(delivered.auth_code.as_deref(), Some("opaque-bearer-token"));
}

// ============================================================================
// SECTION: Classification
// ============================================================================

#[test]
fn classify_absent_or_unauthenticated_requires_new() {
    let cache = EndpointDataReferenceCache::default();
    assert_eq!(cache.classify("missing"), CredentialStatus::RequiredNew);
    cache.put("plain", reference("plain", None));
    assert_eq!(cache.classify("plain"), CredentialStatus::RequiredNew);
}

#[test]
fn classify_uses_token_expiry() {
    let cache = EndpointDataReferenceCache::default();
    let now = OffsetDateTime::now_utc();
    let fresh = reference("fresh", Some(token_expiring_at(now.unix_timestamp() + 300)));
    let stale = reference("stale", Some(token_expiring_at(now.unix_timestamp() - 300)));
    cache.put("fresh", fresh.clone());
    cache.put("stale", stale.clone());
    assert_eq!(cache.classify_at("fresh", now), CredentialStatus::Valid(fresh));
    assert_eq!(cache.classify_at("stale", now), CredentialStatus::Expired(stale));
}

#[test]
fn classify_treats_undecodable_token_as_expired() {
    let cache = EndpointDataReferenceCache::default();
    let broken = reference("broken", Some("not-a-token".to_string()));
    cache.put("broken", broken.clone());
    assert_eq!(cache.classify("broken"), CredentialStatus::Expired(broken));
}

#[test]
fn classify_is_idempotent_and_does_not_mutate() {
    let cache = EndpointDataReferenceCache::default();
    let now = OffsetDateTime::now_utc();
    cache.put("key", reference("key", Some(token_expiring_at(now.unix_timestamp() + 300))));
    let first = cache.classify_at("key", now);
    let second = cache.classify_at("key", now);
    assert_eq!(first, second);
    assert_eq!(cache.len(), 1);
    assert_eq!(first.label(), "valid");
}
