// crates/dataspace-edr-core/src/util.rs
// ============================================================================
// Module: Pipeline Utilities
// Description: Log masking and provider address normalisation helpers.
// Purpose: Share small string helpers across pipeline components.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Helpers used by several pipeline components.

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Dataspace protocol path suffix of provider connector addresses.
pub const DEFAULT_PROVIDER_SUFFIX: &str = "/api/v1/dsp";

/// Number of leading characters kept visible by [`mask`].
const MASK_VISIBLE_PREFIX: usize = 6;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Masks an identifier for logging, keeping a short prefix.
#[must_use]
pub fn mask(value: &str) -> String {
    let visible: String = value.chars().take(MASK_VISIBLE_PREFIX).collect();
    if visible.len() == value.len() { "*".repeat(value.chars().count()) } else { format!("{visible}***") }
}

/// Appends the provider suffix to an address that does not already end with it.
///
/// An empty suffix leaves the address unchanged.
#[must_use]
pub fn with_provider_suffix(address: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        return address.to_string();
    }
    let trimmed = address.trim_end_matches('/');
    if trimmed.ends_with(suffix) { trimmed.to_string() } else { format!("{trimmed}{suffix}") }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
