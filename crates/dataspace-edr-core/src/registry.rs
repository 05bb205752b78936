// crates/dataspace-edr-core/src/registry.rs
// ============================================================================
// Module: Ongoing Negotiation Registry
// Description: Keyed store of in-flight negotiation futures.
// Purpose: Let concurrent callers for one key share a single negotiation.
// Dependencies: none
// ============================================================================

//! ## Overview
//! A lock-guarded map from negotiation key to the shared future of the
//! negotiation running for it. The registry holds no business logic; the
//! orchestrator decides when to add and remove.
//! Invariants:
//! - Every operation is O(1) and safe under concurrent callers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::PoisonError;
use std::sync::RwLock;

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Registry of in-flight negotiations keyed by `asset_id + endpoint`.
///
/// # Invariants
/// - `F` is cheap to clone; lookups hand out clones.
#[derive(Debug)]
pub struct OngoingNegotiations<F: Clone> {
    /// In-flight futures.
    entries: RwLock<HashMap<String, F>>,
}

impl<F: Clone> OngoingNegotiations<F> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Registers `future` under `key`, replacing any previous entry.
    pub fn add(&self, key: impl Into<String>, future: F) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).insert(key.into(), future);
    }

    /// Removes the entry under `key`.
    pub fn remove(&self, key: &str) -> Option<F> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).remove(key)
    }

    /// Returns a clone of the entry under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<F> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).get(key).cloned()
    }

    /// Returns true when a negotiation is registered under `key`.
    #[must_use]
    pub fn is_ongoing(&self, key: &str) -> bool {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).contains_key(key)
    }

    /// Returns the registered keys.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).keys().cloned().collect()
    }
}

impl<F: Clone> Default for OngoingNegotiations<F> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
