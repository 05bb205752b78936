// crates/dataspace-edr-config/src/lib.rs
// ============================================================================
// Module: Dataspace EDR Config Library
// Description: Canonical config model, validation and component wiring.
// Purpose: Single source of truth for dataspace-edr.toml semantics.
// Dependencies: dataspace-edr-core, dataspace-edr-http, serde, toml
// ============================================================================

//! ## Overview
//! `dataspace-edr-config` defines the configuration model of the EDR
//! acquisition pipeline. It provides strict, fail-closed validation and
//! converts a validated [`EdcConfig`] into core settings or a fully wired
//! [`EdcRuntime`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use runtime::EdcRuntime;
