// crates/dataspace-edr-core/src/cache.rs
// ============================================================================
// Module: Endpoint Data Reference Cache
// Description: Time-bounded in-memory store of data plane credentials.
// Purpose: Reuse valid credentials and classify stale ones for renewal.
// Dependencies: time, tracing
// ============================================================================

//! ## Overview
//! The cache maps a storage key to the last endpoint data reference stored
//! for it. Entries are swept on every insert once they are older than the
//! configured storage duration. Lookups are classified into
//! [`CredentialStatus`] from the auth token expiry.
//! Invariants:
//! - `put` is last-write-wins.
//! - The sweep never removes an entry younger than the storage duration.
//! - `classify` never mutates the cache.
//! - `get_if_stored_since` only returns entries written at or after the
//!   given instant.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;
use std::time::Instant;

use time::OffsetDateTime;
use tracing::debug;

use crate::model::EndpointDataReference;
use crate::util::mask;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default time an entry is retained.
pub const DEFAULT_STORAGE_DURATION: Duration = Duration::from_secs(60 * 60);

// ============================================================================
// SECTION: Credential Status
// ============================================================================

/// Classification of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialStatus {
    /// Stored credential is still valid.
    Valid(EndpointDataReference),
    /// Stored credential exists but its token has expired.
    Expired(EndpointDataReference),
    /// Nothing usable is stored; negotiate from scratch.
    RequiredNew,
}

impl CredentialStatus {
    /// Returns a stable label for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Valid(_) => "valid",
            Self::Expired(_) => "expired",
            Self::RequiredNew => "required_new",
        }
    }
}

// ============================================================================
// SECTION: Cache
// ============================================================================

/// Cache entry with its insertion instant.
#[derive(Debug, Clone)]
struct CacheEntry {
    /// Stored reference.
    reference: EndpointDataReference,
    /// Insertion instant.
    stored_at: Instant,
}

/// Thread-safe, time-bounded endpoint data reference cache.
///
/// # Invariants
/// - Keys are storage ids: agreement ids from the callback or
///   `asset_id + endpoint` from the orchestrator.
#[derive(Debug)]
pub struct EndpointDataReferenceCache {
    /// Stored entries.
    entries: Mutex<HashMap<String, CacheEntry>>,
    /// Maximum entry age.
    storage_duration: Duration,
}

impl EndpointDataReferenceCache {
    /// Creates a cache retaining entries for `storage_duration`.
    #[must_use]
    pub fn new(storage_duration: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            storage_duration,
        }
    }

    /// Returns the configured storage duration.
    #[must_use]
    pub const fn storage_duration(&self) -> Duration {
        self.storage_duration
    }

    /// Stores a reference under `key` and sweeps aged entries.
    pub fn put(&self, key: impl Into<String>, reference: EndpointDataReference) {
        let key = key.into();
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.clone(), CacheEntry {
            reference,
            stored_at: now,
        });
        let before = entries.len();
        entries.retain(|_, entry| now.saturating_duration_since(entry.stored_at) <= self.storage_duration);
        debug!(
            storage_id = %mask(&key),
            swept = before - entries.len(),
            size = entries.len(),
            "stored endpoint data reference"
        );
    }

    /// Returns the reference stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<EndpointDataReference> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).map(|entry| entry.reference.clone())
    }

    /// Returns the reference stored under `key` when it was stored at or
    /// after `since`.
    ///
    /// Credentials delivered while a caller waits are accepted whatever
    /// their token holds; an entry left over from before the wait is not.
    #[must_use]
    pub fn get_if_stored_since(&self, key: &str, since: Instant) -> Option<EndpointDataReference> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).filter(|entry| entry.stored_at >= since).map(|entry| entry.reference.clone())
    }

    /// Removes and returns the reference stored under `key`.
    pub fn remove(&self, key: &str) -> Option<EndpointDataReference> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key).map(|entry| entry.reference)
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Returns the number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Classifies the reference stored under `key` at the current instant.
    #[must_use]
    pub fn classify(&self, key: &str) -> CredentialStatus {
        self.classify_at(key, OffsetDateTime::now_utc())
    }

    /// Classifies the reference stored under `key` at `now`.
    ///
    /// A stored reference without an auth code is treated as absent. A token
    /// that cannot be decoded is treated as expired.
    #[must_use]
    pub fn classify_at(&self, key: &str, now: OffsetDateTime) -> CredentialStatus {
        let Some(reference) = self.get(key) else {
            return CredentialStatus::RequiredNew;
        };
        if reference.auth_code.is_none() {
            return CredentialStatus::RequiredNew;
        }
        match reference.auth_claims() {
            Some(claims) if claims.is_valid_at(now) => CredentialStatus::Valid(reference),
            _ => CredentialStatus::Expired(reference),
        }
    }
}

impl Default for EndpointDataReferenceCache {
    fn default() -> Self {
        Self::new(DEFAULT_STORAGE_DURATION)
    }
}

#[cfg(test)]
mod tests;
