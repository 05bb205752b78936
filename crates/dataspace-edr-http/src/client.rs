// crates/dataspace-edr-http/src/client.rs
// ============================================================================
// Module: HTTP Control Plane Client
// Description: Blocking reqwest client for the connector management API.
// Purpose: Carry catalog, negotiation and transfer calls over HTTP.
// Dependencies: dataspace-edr-core, reqwest, serde_json, tracing
// ============================================================================

//! ## Overview
//! Each [`ControlPlaneClient`] operation maps to one management API call:
//! - `POST {catalog}` for catalogs
//! - `POST {negotiations}`, `GET {negotiations}/{id}`, `GET {negotiations}/{id}/state`
//! - `POST {transfers}`, `GET {transfers}/{id}`, `GET {transfers}/{id}/state`
//!
//! Failures are classified so the retrying decorator can tell transient
//! ones apart: connect errors, timeouts and 5xx/429 statuses are retryable.
//! Invariants:
//! - The management URL must be `http` or `https` without embedded credentials.
//! - Redirects are not followed.
//! - Response bodies larger than `max_response_bytes` are rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::io::Read;
use std::time::Duration;

use dataspace_edr_core::Catalog;
use dataspace_edr_core::CatalogRequest;
use dataspace_edr_core::ControlPlaneClient;
use dataspace_edr_core::IdResponse;
use dataspace_edr_core::NegotiationRequest;
use dataspace_edr_core::NegotiationResponse;
use dataspace_edr_core::StateResponse;
use dataspace_edr_core::TransferProcessRequest;
use dataspace_edr_core::TransferProcessResponse;
use dataspace_edr_core::TransportError;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::blocking::RequestBuilder;
use reqwest::blocking::Response;
use reqwest::header::ACCEPT;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use serde_json::Value;
use tracing::debug;
use tracing::warn;

use crate::jsonld;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Media type of request and response bodies.
const APPLICATION_JSON: &str = "application/json";
/// Longest error body excerpt kept in a status error.
const STATUS_MESSAGE_LIMIT: usize = 256;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// API key header sent with every management call.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey {
    /// Header name, for example `X-Api-Key`.
    pub header: String,
    /// Header value.
    pub secret: String,
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey").field("header", &self.header).field("secret", &"<redacted>").finish()
    }
}

/// Configuration of the management API client.
///
/// # Invariants
/// - Paths are appended verbatim to `management_url`.
/// - `timeout_ms` applies to the full request lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpControlPlaneConfig {
    /// Base URL of the management API.
    pub management_url: String,
    /// Catalog request path.
    pub catalog_path: String,
    /// Contract negotiation collection path.
    pub negotiation_path: String,
    /// Transfer process collection path.
    pub transfer_path: String,
    /// Suffix of state resources.
    pub state_suffix: String,
    /// Optional API key header.
    pub api_key: Option<ApiKey>,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum response size, in bytes.
    pub max_response_bytes: usize,
    /// User agent of outbound requests.
    pub user_agent: String,
}

impl Default for HttpControlPlaneConfig {
    fn default() -> Self {
        Self {
            management_url: String::new(),
            catalog_path: "/v2/catalog/request".to_string(),
            negotiation_path: "/v2/contractnegotiations".to_string(),
            transfer_path: "/v2/transferprocesses".to_string(),
            state_suffix: "/state".to_string(),
            api_key: None,
            timeout_ms: 30_000,
            max_response_bytes: 8 * 1024 * 1024,
            user_agent: "dataspace-edr/0.1".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// [`ControlPlaneClient`] over the connector management API.
pub struct HttpControlPlaneClient {
    /// Client configuration.
    config: HttpControlPlaneConfig,
    /// Management base URL without trailing slash.
    base_url: String,
    /// HTTP client used for outbound requests.
    client: Client,
}

impl HttpControlPlaneClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Request`] when the management URL is invalid
    /// or the HTTP client cannot be built.
    pub fn new(config: HttpControlPlaneConfig) -> Result<Self, TransportError> {
        let url = Url::parse(&config.management_url)
            .map_err(|err| TransportError::Request(format!("invalid management url: {err}")))?;
        validate_url(&url)?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|err| TransportError::Request(format!("http client build failed: {err}")))?;
        Ok(Self {
            base_url: config.management_url.trim_end_matches('/').to_string(),
            config,
            client,
        })
    }

    /// Returns the host of the management API.
    #[must_use]
    pub fn host(&self) -> String {
        Url::parse(&self.base_url).ok().and_then(|url| url.host_str().map(str::to_string)).unwrap_or_default()
    }

    /// Joins the base URL and a path.
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Returns the URL of one resource of a collection.
    fn resource_url(&self, collection: &str, id: &str) -> String {
        self.url(&format!("{collection}/{id}"))
    }

    /// Returns the URL of the state of one resource.
    fn state_url(&self, collection: &str, id: &str) -> String {
        self.url(&format!("{collection}/{id}{}", self.config.state_suffix))
    }

    /// Sends a JSON body with `POST`.
    fn post(&self, url: &str, body: &Value) -> Result<Value, TransportError> {
        let payload = serde_json::to_vec(body)
            .map_err(|err| TransportError::Request(format!("request body encoding failed: {err}")))?;
        let request = self.client.post(url).header(CONTENT_TYPE, APPLICATION_JSON).body(payload);
        self.execute("POST", url, request)
    }

    /// Reads a JSON document with `GET`.
    fn get(&self, url: &str) -> Result<Value, TransportError> {
        self.execute("GET", url, self.client.get(url))
    }

    /// Sends a request and decodes the JSON response.
    fn execute(
        &self,
        method: &str,
        url: &str,
        request: RequestBuilder,
    ) -> Result<Value, TransportError> {
        let mut request = request.header(ACCEPT, APPLICATION_JSON);
        if let Some(api_key) = &self.config.api_key {
            request = request.header(api_key.header.as_str(), api_key.secret.as_str());
        }
        debug!(method, url, "calling management api");
        let mut response = request.send().map_err(classify)?;
        let status = response.status();
        let body = read_response_limited(&mut response, self.config.max_response_bytes)?;
        if !status.is_success() {
            warn!(method, url, status = status.as_u16(), "management api call failed");
            return Err(TransportError::Status {
                status: status.as_u16(),
                message: excerpt(&body),
            });
        }
        serde_json::from_slice(&body).map_err(|err| TransportError::Decode(err.to_string()))
    }
}

impl ControlPlaneClient for HttpControlPlaneClient {
    fn get_catalog(&self, request: &CatalogRequest) -> Result<Catalog, TransportError> {
        let document = self.post(&self.url(&self.config.catalog_path), &jsonld::catalog_request_body(request))?;
        jsonld::parse_catalog(&document)
    }

    fn start_negotiation(
        &self,
        request: &NegotiationRequest,
    ) -> Result<IdResponse, TransportError> {
        let document = self
            .post(&self.url(&self.config.negotiation_path), &jsonld::negotiation_request_body(request))?;
        jsonld::parse_id_response(&document)
    }

    fn get_negotiation(&self, negotiation_id: &str) -> Result<NegotiationResponse, TransportError> {
        let document = self.get(&self.resource_url(&self.config.negotiation_path, negotiation_id))?;
        jsonld::parse_negotiation(&document)
    }

    fn get_negotiation_state(&self, negotiation_id: &str) -> Result<StateResponse, TransportError> {
        let document = self.get(&self.state_url(&self.config.negotiation_path, negotiation_id))?;
        jsonld::parse_state(&document)
    }

    fn start_transfer_process(
        &self,
        request: &TransferProcessRequest,
    ) -> Result<IdResponse, TransportError> {
        let document =
            self.post(&self.url(&self.config.transfer_path), &jsonld::transfer_request_body(request))?;
        jsonld::parse_id_response(&document)
    }

    fn get_transfer_process(
        &self,
        transfer_process_id: &str,
    ) -> Result<TransferProcessResponse, TransportError> {
        let document = self.get(&self.resource_url(&self.config.transfer_path, transfer_process_id))?;
        jsonld::parse_transfer_process(&document)
    }

    fn get_transfer_process_state(
        &self,
        transfer_process_id: &str,
    ) -> Result<StateResponse, TransportError> {
        let document = self.get(&self.state_url(&self.config.transfer_path, transfer_process_id))?;
        jsonld::parse_state(&document)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates the management URL scheme and rejects embedded credentials.
fn validate_url(url: &Url) -> Result<(), TransportError> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(TransportError::Request("unsupported management url scheme".to_string()));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(TransportError::Request("management url credentials are not allowed".to_string()));
    }
    if url.host_str().is_none() {
        return Err(TransportError::Request("management url host required".to_string()));
    }
    Ok(())
}

/// Maps a send failure onto the transport error taxonomy.
fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_builder() {
        TransportError::Request(err.to_string())
    } else {
        TransportError::Connect(err.to_string())
    }
}

/// Returns a bounded excerpt of an error body.
fn excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    trimmed.chars().take(STATUS_MESSAGE_LIMIT).collect()
}

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(response: &mut Response, max_bytes: usize) -> Result<Vec<u8>, TransportError> {
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| TransportError::Decode("response size limit exceeds u64".to_string()))?;
    if let Some(expected) = response.content_length()
        && expected > max_bytes_u64
    {
        return Err(TransportError::Decode("response exceeds size limit".to_string()));
    }
    let mut buf = Vec::new();
    response
        .take(max_bytes_u64.saturating_add(1))
        .read_to_end(&mut buf)
        .map_err(|err| TransportError::Connect(format!("failed to read response: {err}")))?;
    if buf.len() > max_bytes {
        return Err(TransportError::Decode("response exceeds size limit".to_string()));
    }
    Ok(buf)
}
