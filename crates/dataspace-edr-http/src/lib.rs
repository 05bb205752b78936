// crates/dataspace-edr-http/src/lib.rs
// ============================================================================
// Module: Dataspace EDR HTTP Library
// Description: Blocking HTTP transport to the connector management API.
// Purpose: Implement the control-plane client over JSON-LD request bodies.
// Dependencies: dataspace-edr-core, reqwest, serde_json, tracing
// ============================================================================

//! ## Overview
//! [`HttpControlPlaneClient`] implements
//! [`dataspace_edr_core::ControlPlaneClient`] against the management API of
//! the consumer connector. Request bodies are compacted JSON-LD; responses
//! are read leniently, accepting short, prefixed and expanded keys.
//! Invariants:
//! - Redirects are never followed.
//! - Response bodies are bounded by the configured size limit.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod client;
pub mod jsonld;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use client::ApiKey;
pub use client::HttpControlPlaneClient;
pub use client::HttpControlPlaneConfig;
