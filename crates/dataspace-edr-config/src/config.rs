// crates/dataspace-edr-config/src/config.rs
// ============================================================================
// Module: Dataspace EDR Configuration
// Description: Configuration loading and validation for EDR acquisition.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: dataspace-edr-core, dataspace-edr-http, serde, time, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section has defaults matching a typical connector deployment; only
//! `controlplane.management_url` is mandatory. Missing or invalid
//! configuration fails closed.
//! Invariants:
//! - A loaded [`EdcConfig`] has passed [`EdcConfig::validate`].
//! - Durations are configured in milliseconds and bounded per field.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashSet;
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use dataspace_edr_core::AcceptedPolicy;
use dataspace_edr_core::AcceptedPolicyStore;
use dataspace_edr_core::CatalogSettings;
use dataspace_edr_core::EndpointDataReferenceCache;
use dataspace_edr_core::NegotiationSettings;
use dataspace_edr_core::OrchestratorSettings;
use dataspace_edr_core::RetryPolicy;
use dataspace_edr_core::RetryRegistry;
use dataspace_edr_core::WorkerPool;
use dataspace_edr_core::catalog::DEFAULT_PAGE_SIZE;
use dataspace_edr_core::pool::DEFAULT_POOL_SIZE;
use dataspace_edr_core::util::DEFAULT_PROVIDER_SUFFIX;
use dataspace_edr_http::ApiKey;
use dataspace_edr_http::HttpControlPlaneConfig;
use serde::Deserialize;
use thiserror::Error;
use time::OffsetDateTime;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "dataspace-edr.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "DATASPACE_EDR_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Minimum negotiation, transfer and EDR wait in milliseconds.
pub(crate) const MIN_PROCESS_TTL_MS: u64 = 1_000;
/// Maximum negotiation, transfer and EDR wait in milliseconds.
pub(crate) const MAX_PROCESS_TTL_MS: u64 = 24 * 60 * 60 * 1_000;
/// Minimum state poll interval in milliseconds.
pub(crate) const MIN_POLL_INTERVAL_MS: u64 = 10;
/// Maximum state poll interval in milliseconds.
pub(crate) const MAX_POLL_INTERVAL_MS: u64 = 60_000;
/// Minimum credential storage duration in milliseconds.
pub(crate) const MIN_STORAGE_DURATION_MS: u64 = 1_000;
/// Maximum credential storage duration in milliseconds.
pub(crate) const MAX_STORAGE_DURATION_MS: u64 = 7 * 24 * 60 * 60 * 1_000;
/// Minimum HTTP request timeout in milliseconds.
pub(crate) const MIN_HTTP_TIMEOUT_MS: u64 = 100;
/// Maximum HTTP request timeout in milliseconds.
pub(crate) const MAX_HTTP_TIMEOUT_MS: u64 = 300_000;
/// Minimum accepted response size limit in bytes.
pub(crate) const MIN_RESPONSE_BYTES: usize = 1024;
/// Maximum accepted response size limit in bytes.
pub(crate) const MAX_RESPONSE_BYTES: usize = 64 * 1024 * 1024;
/// Maximum catalog page size.
pub(crate) const MAX_CATALOG_PAGE_SIZE: usize = 10_000;
/// Maximum worker pool size.
pub(crate) const MAX_WORKER_POOL_SIZE: usize = 256;
/// Maximum calls per retried operation.
pub(crate) const MAX_RETRY_ATTEMPTS: u32 = 10;
/// Maximum single retry delay in milliseconds.
pub(crate) const MAX_RETRY_DELAY_MS: u64 = 60_000;
/// Maximum number of per-host retry overrides.
pub(crate) const MAX_RETRY_HOSTS: usize = 256;
/// Maximum number of configured accepted policies.
pub(crate) const MAX_ACCEPTED_POLICIES: usize = 1_024;
/// Default API key header name.
const DEFAULT_API_KEY_HEADER: &str = "X-Api-Key";

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Dataspace EDR configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EdcConfig {
    /// Connector management API configuration.
    #[serde(default)]
    pub controlplane: ControlPlaneConfig,
    /// Credential wait and storage configuration.
    #[serde(default)]
    pub edr: EdrConfig,
    /// Transport worker pool configuration.
    #[serde(default)]
    pub worker_pool: WorkerPoolConfig,
    /// Retry policy configuration.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Policies accepted from providers.
    #[serde(default)]
    pub accepted_policies: Vec<AcceptedPolicyConfig>,
}

impl EdcConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// The path is taken from `path`, then [`CONFIG_ENV_VAR`], then
    /// `dataspace-edr.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] when validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.controlplane.validate()?;
        self.edr.validate()?;
        self.worker_pool.validate()?;
        self.retry.validate()?;
        if self.accepted_policies.len() > MAX_ACCEPTED_POLICIES {
            return Err(ConfigError::Invalid(format!(
                "accepted_policies exceeds {MAX_ACCEPTED_POLICIES} entries"
            )));
        }
        for policy in &self.accepted_policies {
            policy.validate()?;
        }
        let poll_interval_ms = self.edr.poll_interval_ms;
        for (field, ttl_ms) in [
            ("edr.request_ttl_ms", self.edr.request_ttl_ms),
            ("controlplane.negotiation_ttl_ms", self.controlplane.negotiation_ttl_ms),
            ("controlplane.transfer_ttl_ms", self.controlplane.transfer_ttl_ms),
        ] {
            if poll_interval_ms >= ttl_ms {
                return Err(ConfigError::Invalid(format!("edr.poll_interval_ms must be below {field}")));
            }
        }
        Ok(())
    }

    /// Returns the orchestrator settings.
    #[must_use]
    pub const fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            edr_request_ttl: Duration::from_millis(self.edr.request_ttl_ms),
            poll_interval: Duration::from_millis(self.edr.poll_interval_ms),
        }
    }

    /// Returns the negotiation service settings.
    #[must_use]
    pub fn negotiation_settings(&self) -> NegotiationSettings {
        NegotiationSettings {
            negotiation_ttl: Duration::from_millis(self.controlplane.negotiation_ttl_ms),
            transfer_ttl: Duration::from_millis(self.controlplane.transfer_ttl_ms),
            poll_interval: Duration::from_millis(self.edr.poll_interval_ms),
            callback_url: self.controlplane.callback_url.clone(),
            provider_suffix: self.controlplane.provider_suffix.clone(),
        }
    }

    /// Returns the catalog facade settings.
    #[must_use]
    pub fn catalog_settings(&self) -> CatalogSettings {
        CatalogSettings {
            page_size: self.controlplane.catalog_page_size,
            provider_suffix: self.controlplane.provider_suffix.clone(),
        }
    }

    /// Returns the retry registry with every per-host override applied.
    #[must_use]
    pub fn retry_registry(&self) -> RetryRegistry {
        self.retry
            .hosts
            .iter()
            .fold(RetryRegistry::new(self.retry.policy.to_policy()), |registry, host| {
                registry.with_host(host.host.trim().to_ascii_lowercase(), host.policy.to_policy())
            })
    }

    /// Returns the management API client configuration.
    #[must_use]
    pub fn http_config(&self) -> HttpControlPlaneConfig {
        let controlplane = &self.controlplane;
        HttpControlPlaneConfig {
            management_url: controlplane.management_url.clone(),
            catalog_path: controlplane.catalog_path.clone(),
            negotiation_path: controlplane.negotiation_path.clone(),
            transfer_path: controlplane.transfer_path.clone(),
            state_suffix: controlplane.state_suffix.clone(),
            api_key: controlplane.api_key.as_ref().map(|key| ApiKey {
                header: key.header.clone(),
                secret: key.secret.clone(),
            }),
            timeout_ms: controlplane.timeout_ms,
            max_response_bytes: controlplane.max_response_bytes,
            user_agent: controlplane.user_agent.clone(),
        }
    }

    /// Returns a worker pool of the configured size.
    #[must_use]
    pub fn worker_pool(&self) -> WorkerPool {
        WorkerPool::new(self.worker_pool.size)
    }

    /// Returns an empty credential cache with the configured storage duration.
    #[must_use]
    pub fn credential_cache(&self) -> EndpointDataReferenceCache {
        EndpointDataReferenceCache::new(Duration::from_millis(self.edr.storage_duration_ms))
    }

    /// Returns a policy store seeded with the configured accepted policies.
    ///
    /// Entries without a `bpn` apply to every provider.
    #[must_use]
    pub fn policy_store(&self) -> AcceptedPolicyStore {
        let store = AcceptedPolicyStore::default();
        for entry in &self.accepted_policies {
            let policy = AcceptedPolicy::new(entry.policy_id.trim(), entry.valid_until);
            match &entry.bpn {
                Some(bpn) => store.add(bpn.trim(), policy),
                None => store.add_default(policy),
            }
        }
        store
    }
}

/// Connector management API configuration.
///
/// # Invariants
/// - `management_url` is an `http` or `https` URL with a host.
/// - Paths and the provider suffix start with `/`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlPlaneConfig {
    /// Base URL of the management API.
    pub management_url: String,
    /// Optional API key header.
    pub api_key: Option<ApiKeyConfig>,
    /// Catalog request path.
    pub catalog_path: String,
    /// Contract negotiation collection path.
    pub negotiation_path: String,
    /// Transfer process collection path.
    pub transfer_path: String,
    /// Suffix of state resources.
    pub state_suffix: String,
    /// Suffix appended to provider addresses lacking it; empty leaves
    /// provider addresses unchanged.
    pub provider_suffix: String,
    /// Datasets requested per catalog page; zero disables paging.
    pub catalog_page_size: usize,
    /// Maximum wait for a finalized negotiation.
    pub negotiation_ttl_ms: u64,
    /// Maximum wait for a started transfer.
    pub transfer_ttl_ms: u64,
    /// Consumer callback endpoint for pushed credentials.
    pub callback_url: Option<String>,
    /// HTTP request timeout.
    pub timeout_ms: u64,
    /// Maximum response body size in bytes.
    pub max_response_bytes: usize,
    /// User agent of outbound requests.
    pub user_agent: String,
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        let http = HttpControlPlaneConfig::default();
        Self {
            management_url: http.management_url,
            api_key: None,
            catalog_path: http.catalog_path,
            negotiation_path: http.negotiation_path,
            transfer_path: http.transfer_path,
            state_suffix: http.state_suffix,
            provider_suffix: DEFAULT_PROVIDER_SUFFIX.to_string(),
            catalog_page_size: DEFAULT_PAGE_SIZE,
            negotiation_ttl_ms: default_process_ttl_ms(),
            transfer_ttl_ms: default_process_ttl_ms(),
            callback_url: None,
            timeout_ms: http.timeout_ms,
            max_response_bytes: http.max_response_bytes,
            user_agent: http.user_agent,
        }
    }
}

impl ControlPlaneConfig {
    /// Validates management API configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.management_url.trim().is_empty() {
            return Err(ConfigError::Invalid("controlplane.management_url is required".to_string()));
        }
        validate_http_url("controlplane.management_url", &self.management_url)?;
        if let Some(callback_url) = &self.callback_url {
            validate_http_url("controlplane.callback_url", callback_url)?;
        }
        if let Some(api_key) = &self.api_key {
            api_key.validate()?;
        }
        validate_url_path("controlplane.catalog_path", &self.catalog_path)?;
        validate_url_path("controlplane.negotiation_path", &self.negotiation_path)?;
        validate_url_path("controlplane.transfer_path", &self.transfer_path)?;
        validate_url_path("controlplane.state_suffix", &self.state_suffix)?;
        if !self.provider_suffix.is_empty() {
            validate_url_path("controlplane.provider_suffix", &self.provider_suffix)?;
        }
        if self.catalog_page_size > MAX_CATALOG_PAGE_SIZE {
            return Err(ConfigError::Invalid(format!(
                "controlplane.catalog_page_size must be at most {MAX_CATALOG_PAGE_SIZE}"
            )));
        }
        validate_range(
            "controlplane.negotiation_ttl_ms",
            self.negotiation_ttl_ms,
            MIN_PROCESS_TTL_MS,
            MAX_PROCESS_TTL_MS,
        )?;
        validate_range("controlplane.transfer_ttl_ms", self.transfer_ttl_ms, MIN_PROCESS_TTL_MS, MAX_PROCESS_TTL_MS)?;
        validate_range("controlplane.timeout_ms", self.timeout_ms, MIN_HTTP_TIMEOUT_MS, MAX_HTTP_TIMEOUT_MS)?;
        if self.max_response_bytes < MIN_RESPONSE_BYTES || self.max_response_bytes > MAX_RESPONSE_BYTES {
            return Err(ConfigError::Invalid(format!(
                "controlplane.max_response_bytes must be between {MIN_RESPONSE_BYTES} and {MAX_RESPONSE_BYTES} bytes"
            )));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid("controlplane.user_agent must be non-empty".to_string()));
        }
        Ok(())
    }
}

/// API key header sent with every management call.
#[derive(Clone, Deserialize)]
pub struct ApiKeyConfig {
    /// Header name.
    #[serde(default = "default_api_key_header")]
    pub header: String,
    /// Header value.
    pub secret: String,
}

impl fmt::Debug for ApiKeyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyConfig").field("header", &self.header).field("secret", &"<redacted>").finish()
    }
}

impl ApiKeyConfig {
    /// Validates the API key header.
    fn validate(&self) -> Result<(), ConfigError> {
        let header = self.header.trim();
        if header.is_empty() {
            return Err(ConfigError::Invalid("controlplane.api_key.header must be non-empty".to_string()));
        }
        if !header.bytes().all(|byte| byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_') {
            return Err(ConfigError::Invalid(
                "controlplane.api_key.header must be a valid header name".to_string(),
            ));
        }
        if self.secret.is_empty() {
            return Err(ConfigError::Invalid("controlplane.api_key.secret must be non-empty".to_string()));
        }
        Ok(())
    }
}

/// Credential wait and storage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EdrConfig {
    /// Maximum wait for the callback to deliver a credential.
    pub request_ttl_ms: u64,
    /// Delay between cache and state polls.
    pub poll_interval_ms: u64,
    /// Maximum age of a cached credential.
    pub storage_duration_ms: u64,
}

impl Default for EdrConfig {
    fn default() -> Self {
        Self {
            request_ttl_ms: default_process_ttl_ms(),
            poll_interval_ms: 1_000,
            storage_duration_ms: 60 * 60 * 1_000,
        }
    }
}

impl EdrConfig {
    /// Validates credential timing configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_range("edr.request_ttl_ms", self.request_ttl_ms, MIN_PROCESS_TTL_MS, MAX_PROCESS_TTL_MS)?;
        validate_range("edr.poll_interval_ms", self.poll_interval_ms, MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS)?;
        validate_range(
            "edr.storage_duration_ms",
            self.storage_duration_ms,
            MIN_STORAGE_DURATION_MS,
            MAX_STORAGE_DURATION_MS,
        )
    }
}

/// Transport worker pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorkerPoolConfig {
    /// Maximum concurrent transport calls.
    pub size: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_POOL_SIZE,
        }
    }
}

impl WorkerPoolConfig {
    /// Validates the pool size.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.size == 0 || self.size > MAX_WORKER_POOL_SIZE {
            return Err(ConfigError::Invalid(format!(
                "worker_pool.size must be between 1 and {MAX_WORKER_POOL_SIZE}"
            )));
        }
        Ok(())
    }
}

/// Retry configuration with optional per-host overrides.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetryConfig {
    /// Policy for hosts without an override.
    #[serde(flatten)]
    pub policy: RetryPolicyConfig,
    /// Per-host overrides.
    #[serde(default)]
    pub hosts: Vec<HostRetryConfig>,
}

impl RetryConfig {
    /// Validates the default policy and every override.
    fn validate(&self) -> Result<(), ConfigError> {
        self.policy.validate("retry")?;
        if self.hosts.len() > MAX_RETRY_HOSTS {
            return Err(ConfigError::Invalid(format!("retry.hosts exceeds {MAX_RETRY_HOSTS} entries")));
        }
        let mut seen = HashSet::new();
        for host in &self.hosts {
            let name = host.host.trim();
            if name.is_empty() {
                return Err(ConfigError::Invalid("retry.hosts.host must be non-empty".to_string()));
            }
            if !seen.insert(name.to_ascii_lowercase()) {
                return Err(ConfigError::Invalid(format!("retry.hosts contains duplicate host {name}")));
            }
            host.policy.validate("retry.hosts")?;
        }
        Ok(())
    }
}

/// Bounded exponential backoff parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicyConfig {
    /// Maximum number of calls, counting the first.
    pub max_attempts: u32,
    /// Delay before the second call.
    pub initial_delay_ms: u64,
    /// Upper bound of any delay.
    pub max_delay_ms: u64,
    /// Factor applied to the delay after each failure.
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            initial_delay_ms: duration_ms(policy.initial_delay),
            max_delay_ms: duration_ms(policy.max_delay),
            backoff_multiplier: policy.backoff_multiplier,
        }
    }
}

impl RetryPolicyConfig {
    /// Converts into the core retry policy.
    #[must_use]
    pub const fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
        }
    }

    /// Validates the backoff parameters under `field`.
    fn validate(&self, field: &str) -> Result<(), ConfigError> {
        if self.max_attempts == 0 || self.max_attempts > MAX_RETRY_ATTEMPTS {
            return Err(ConfigError::Invalid(format!(
                "{field}.max_attempts must be between 1 and {MAX_RETRY_ATTEMPTS}"
            )));
        }
        validate_range(&format!("{field}.max_delay_ms"), self.max_delay_ms, 0, MAX_RETRY_DELAY_MS)?;
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(ConfigError::Invalid(format!("{field}.initial_delay_ms must be <= max_delay_ms")));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "{field}.backoff_multiplier must be a finite number >= 1.0"
            )));
        }
        Ok(())
    }
}

/// Retry override for one remote host.
#[derive(Debug, Clone, Deserialize)]
pub struct HostRetryConfig {
    /// Host name the override applies to.
    pub host: String,
    /// Backoff parameters.
    #[serde(flatten)]
    pub policy: RetryPolicyConfig,
}

/// Accepted policy entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AcceptedPolicyConfig {
    /// Policy identifier; `*` accepts every offer.
    pub policy_id: String,
    /// Expiry instant in RFC 3339 format.
    #[serde(with = "time::serde::rfc3339")]
    pub valid_until: OffsetDateTime,
    /// Provider BPN the policy is restricted to.
    #[serde(default)]
    pub bpn: Option<String>,
}

impl AcceptedPolicyConfig {
    /// Validates the accepted policy entry.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.policy_id.trim().is_empty() {
            return Err(ConfigError::Invalid("accepted_policies.policy_id must be non-empty".to_string()));
        }
        if self.bpn.as_deref().is_some_and(|bpn| bpn.trim().is_empty()) {
            return Err(ConfigError::Invalid("accepted_policies.bpn must be non-empty when set".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the argument or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates an `http` or `https` URL with a host and no credentials.
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|err| ConfigError::Invalid(format!("{field} is not a valid url: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid(format!("{field} must use http or https")));
    }
    if url.host_str().is_none() {
        return Err(ConfigError::Invalid(format!("{field} must include a host")));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(ConfigError::Invalid(format!("{field} must not embed credentials")));
    }
    Ok(())
}

/// Validates a URL path fragment.
fn validate_url_path(field: &str, value: &str) -> Result<(), ConfigError> {
    if !value.starts_with('/') {
        return Err(ConfigError::Invalid(format!("{field} must start with '/'")));
    }
    if value.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    if value.chars().any(|ch| ch.is_whitespace() || ch == '?' || ch == '#') {
        return Err(ConfigError::Invalid(format!("{field} must be a plain path")));
    }
    Ok(())
}

/// Validates a millisecond value against inclusive bounds.
fn validate_range(field: &str, value_ms: u64, min_ms: u64, max_ms: u64) -> Result<(), ConfigError> {
    if value_ms < min_ms || value_ms > max_ms {
        return Err(ConfigError::Invalid(format!("{field} must be between {min_ms} and {max_ms} milliseconds")));
    }
    Ok(())
}

/// Returns a duration in whole milliseconds, saturating at `u64::MAX`.
fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Default negotiation, transfer and EDR wait.
const fn default_process_ttl_ms() -> u64 {
    10 * 60 * 1_000
}

/// Default API key header name.
fn default_api_key_header() -> String {
    DEFAULT_API_KEY_HEADER.to_string()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
