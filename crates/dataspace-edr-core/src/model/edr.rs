// crates/dataspace-edr-core/src/model/edr.rs
// ============================================================================
// Module: Endpoint Data Reference Model
// Description: Data plane credentials and their decoded token claims.
// Purpose: Carry the short-lived credential used to pull data from a provider.
// Dependencies: base64, serde, serde_json, time
// ============================================================================

//! ## Overview
//! An [`EndpointDataReference`] is pushed by the provider once a transfer has
//! started. Its `auth_code` is a JWT-shaped token whose payload decodes into
//! [`EdrAuthCode`]; the embedded `exp` drives credential expiry.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Endpoint Data Reference
// ============================================================================

/// Credential for pulling data from a provider data plane.
///
/// # Invariants
/// - `contract_id` is the agreement the transfer ran under and is the cache key
///   the callback stores the reference with.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDataReference {
    /// Transfer process id.
    pub id: String,
    /// Agreement id.
    pub contract_id: String,
    /// Data plane endpoint.
    pub endpoint: String,
    /// Header name for the auth code.
    pub auth_key: String,
    /// Auth token, absent when the provider sent none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_code: Option<String>,
    /// Remaining provider properties.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl EndpointDataReference {
    /// Decodes the auth token claims, if a decodable token is present.
    #[must_use]
    pub fn auth_claims(&self) -> Option<EdrAuthCode> {
        self.auth_code.as_deref().and_then(EdrAuthCode::from_token)
    }
}

impl std::fmt::Debug for EndpointDataReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointDataReference")
            .field("id", &self.id)
            .field("contract_id", &self.contract_id)
            .field("endpoint", &self.endpoint)
            .field("auth_key", &self.auth_key)
            .field("auth_code", &self.auth_code.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Auth Token Claims
// ============================================================================

/// Claims of an endpoint data reference auth token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdrAuthCode {
    /// Expiry in epoch seconds.
    pub exp: i64,
    /// Contract id claim.
    #[serde(default)]
    pub cid: String,
    /// Encrypted data address claim.
    #[serde(default)]
    pub dad: String,
}

impl EdrAuthCode {
    /// Decodes the payload segment of a JWT-shaped token.
    ///
    /// Returns `None` when the token has no payload segment or the payload is
    /// not base64url-encoded JSON with an `exp` claim.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        let payload = token.split('.').nth(1)?;
        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Returns true when the token is not yet expired at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: OffsetDateTime) -> bool {
        self.exp > now.unix_timestamp()
    }
}
