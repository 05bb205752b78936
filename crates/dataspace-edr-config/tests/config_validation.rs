//! Config loading and validation tests for dataspace-edr-config.
// crates/dataspace-edr-config/tests/config_validation.rs
// =============================================================================
// Module: Config Loading and Validation Tests
// Description: Validate defaults, file limits and fail-closed validation.
// Purpose: Ensure a loaded config always converts into usable settings.
// =============================================================================

use std::io::Write;
use std::time::Duration;

use dataspace_edr_config::ConfigError;
use dataspace_edr_config::EdcConfig;
use dataspace_edr_config::MAX_CONFIG_FILE_SIZE;
use dataspace_edr_core::AcceptedPoliciesProvider;
use dataspace_edr_core::Constraint;
use dataspace_edr_core::Permission;
use dataspace_edr_core::Policy;
use dataspace_edr_core::PolicyChecker;
use dataspace_edr_core::util::with_provider_suffix;
use tempfile::NamedTempFile;

type TestResult = Result<(), String>;

const MINIMAL: &str = r#"
[controlplane]
management_url = "https://consumer.example/management"
"#;

fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error '{message}' did not contain '{needle}'"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}

fn minimal_config() -> Result<EdcConfig, String> {
    EdcConfig::from_toml(MINIMAL).map_err(|err| err.to_string())
}

fn write_config(content: &[u8]) -> Result<NamedTempFile, String> {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(content).map_err(|err| err.to_string())?;
    file.flush().map_err(|err| err.to_string())?;
    Ok(file)
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

#[test]
fn minimal_config_uses_deployment_defaults() -> TestResult {
    let config = minimal_config()?;
    let negotiation = config.negotiation_settings();
    let orchestrator = config.orchestrator_settings();
    let catalog = config.catalog_settings();
    if catalog.page_size != 50 || catalog.provider_suffix != "/api/v1/dsp" {
        return Err(format!("unexpected catalog defaults {}/{}", catalog.page_size, catalog.provider_suffix));
    }
    if negotiation.negotiation_ttl != Duration::from_secs(600) || negotiation.transfer_ttl != Duration::from_secs(600) {
        return Err("negotiation and transfer ttl should default to ten minutes".to_string());
    }
    if orchestrator.edr_request_ttl != Duration::from_secs(600) || orchestrator.poll_interval != Duration::from_secs(1) {
        return Err("edr wait should default to ten minutes polled every second".to_string());
    }
    if config.credential_cache().storage_duration() != Duration::from_secs(3600) {
        return Err("storage duration should default to one hour".to_string());
    }
    if config.worker_pool().size() != 20 {
        return Err("worker pool should default to twenty workers".to_string());
    }
    if config.retry_registry().policy_for("provider.example").max_attempts != 3 {
        return Err("retry should default to three attempts".to_string());
    }
    let http = config.http_config();
    if http.catalog_path != "/v2/catalog/request" || http.api_key.is_some() {
        return Err("unexpected http defaults".to_string());
    }
    Ok(())
}

#[test]
fn management_url_is_required() -> TestResult {
    assert_invalid(EdcConfig::from_toml(""), "controlplane.management_url is required")
}

// ============================================================================
// SECTION: Full Document
// ============================================================================

#[test]
fn full_document_converts_into_settings() -> TestResult {
    let config = EdcConfig::from_toml(
        r#"
[controlplane]
management_url = "https://consumer.example/management"
callback_url = "https://consumer.example/callback/endpoint-data-reference"
provider_suffix = "/dsp"
catalog_page_size = 0
negotiation_ttl_ms = 30000
transfer_ttl_ms = 20000
timeout_ms = 5000

[controlplane.api_key]
secret = "password"

[edr]
request_ttl_ms = 15000
poll_interval_ms = 250
storage_duration_ms = 60000

[worker_pool]
size = 4

[retry]
max_attempts = 2
initial_delay_ms = 100
max_delay_ms = 400

[[retry.hosts]]
host = "Provider.Example"
max_attempts = 5

[[accepted_policies]]
policy_id = "policy-default"
valid_until = "2099-12-31T23:59:59Z"

[[accepted_policies]]
policy_id = "policy-bpn"
valid_until = "2099-12-31T23:59:59Z"
bpn = "BPNL000000000001"
"#,
    )
    .map_err(|err| err.to_string())?;

    let negotiation = config.negotiation_settings();
    if negotiation.callback_url.as_deref() != Some("https://consumer.example/callback/endpoint-data-reference") {
        return Err("callback url not carried".to_string());
    }
    if negotiation.poll_interval != Duration::from_millis(250) || negotiation.transfer_ttl != Duration::from_secs(20) {
        return Err("negotiation timing not carried".to_string());
    }
    if config.catalog_settings().page_size != 0 || config.catalog_settings().provider_suffix != "/dsp" {
        return Err("catalog settings not carried".to_string());
    }
    let http = config.http_config();
    let api_key = http.api_key.ok_or("api key missing")?;
    if api_key.header != "X-Api-Key" || api_key.secret != "password" || http.timeout_ms != 5000 {
        return Err("http settings not carried".to_string());
    }
    let registry = config.retry_registry();
    if registry.policy_for("provider.example").max_attempts != 5 {
        return Err("host override should apply case-insensitively".to_string());
    }
    let fallback = registry.policy_for("other.example");
    if fallback.max_attempts != 2 || fallback.max_delay != Duration::from_millis(400) {
        return Err("default retry policy not carried".to_string());
    }

    let checker = PolicyChecker::new(config.policy_store());
    if checker.valid_policies_for("BPNL000000000001").len() != 2 {
        return Err("provider should see default and own policies".to_string());
    }
    if checker.valid_policies_for("BPNL000000000002").len() != 1 {
        return Err("other providers should only see default policies".to_string());
    }
    let offered = Policy {
        permissions: vec![Permission {
            action: "odrl:use".to_string(),
            constraints: vec![Constraint::eq("PURPOSE", "policy-bpn")],
        }],
        ..Policy::default()
    };
    if !checker.is_valid(&offered, "BPNL000000000001") {
        return Err("provider policy should be accepted for its own bpn".to_string());
    }
    if checker.is_valid(&offered, "BPNL000000000002") {
        return Err("provider policy should not be accepted for other bpns".to_string());
    }
    Ok(())
}

// ============================================================================
// SECTION: Validation
// ============================================================================

#[test]
fn invalid_values_are_rejected() -> TestResult {
    let cases = [
        ("management_url = \"ftp://consumer.example\"", "must use http or https"),
        ("management_url = \"https://user:pw@consumer.example\"", "must not embed credentials"),
        (
            "management_url = \"https://consumer.example\"\ncallback_url = \"not a url\"",
            "controlplane.callback_url is not a valid url",
        ),
        ("management_url = \"https://consumer.example\"\nprovider_suffix = \"dsp\"", "must start with '/'"),
        ("management_url = \"https://consumer.example\"\ncatalog_page_size = 20000", "catalog_page_size"),
        ("management_url = \"https://consumer.example\"\nnegotiation_ttl_ms = 10", "negotiation_ttl_ms"),
        ("management_url = \"https://consumer.example\"\ntimeout_ms = 1", "controlplane.timeout_ms"),
        ("management_url = \"https://consumer.example\"\nmax_response_bytes = 10", "max_response_bytes"),
    ];
    for (body, needle) in cases {
        assert_invalid(EdcConfig::from_toml(&format!("[controlplane]\n{body}\n")), needle)?;
    }
    Ok(())
}

#[test]
fn empty_provider_suffix_leaves_addresses_unchanged() -> TestResult {
    let config = EdcConfig::from_toml(
        "[controlplane]\nmanagement_url = \"https://consumer.example\"\nprovider_suffix = \"\"\n",
    )
    .map_err(|err| err.to_string())?;
    let catalog = config.catalog_settings();
    if !catalog.provider_suffix.is_empty() || !config.negotiation_settings().provider_suffix.is_empty() {
        return Err("empty provider suffix not carried".to_string());
    }
    let address = with_provider_suffix("https://provider.example/dsp", &catalog.provider_suffix);
    if address != "https://provider.example/dsp" {
        return Err(format!("address rewritten to {address}"));
    }
    Ok(())
}

#[test]
fn poll_interval_must_be_below_every_ttl() -> TestResult {
    let mut config = minimal_config()?;
    config.edr.poll_interval_ms = 5_000;
    config.controlplane.transfer_ttl_ms = 5_000;
    assert_invalid(config.validate(), "below controlplane.transfer_ttl_ms")
}

#[test]
fn worker_pool_and_retry_bounds_are_enforced() -> TestResult {
    let mut config = minimal_config()?;
    config.worker_pool.size = 0;
    assert_invalid(config.validate(), "worker_pool.size")?;

    let mut config = minimal_config()?;
    config.retry.policy.max_attempts = 0;
    assert_invalid(config.validate(), "retry.max_attempts")?;

    let mut config = minimal_config()?;
    config.retry.policy.initial_delay_ms = 10_000;
    config.retry.policy.max_delay_ms = 1_000;
    assert_invalid(config.validate(), "initial_delay_ms must be <= max_delay_ms")?;

    let mut config = minimal_config()?;
    config.retry.policy.backoff_multiplier = f64::NAN;
    assert_invalid(config.validate(), "backoff_multiplier")?;
    Ok(())
}

#[test]
fn duplicate_retry_hosts_are_rejected() -> TestResult {
    let document = format!("{MINIMAL}\n[[retry.hosts]]\nhost = \"a.example\"\n\n[[retry.hosts]]\nhost = \"A.example\"\n");
    assert_invalid(EdcConfig::from_toml(&document), "duplicate host")
}

#[test]
fn accepted_policy_entries_are_checked() -> TestResult {
    let blank = format!("{MINIMAL}\n[[accepted_policies]]\npolicy_id = \" \"\nvalid_until = \"2099-01-01T00:00:00Z\"\n");
    assert_invalid(EdcConfig::from_toml(&blank), "policy_id must be non-empty")?;
    let bad_date = format!("{MINIMAL}\n[[accepted_policies]]\npolicy_id = \"p\"\nvalid_until = \"tomorrow\"\n");
    assert_invalid(EdcConfig::from_toml(&bad_date), "config parse error")
}

#[test]
#[allow(clippy::use_debug, reason = "Asserts on the debug rendering.")]
fn api_key_debug_redacts_secret() -> TestResult {
    let document = format!("{MINIMAL}\n[controlplane.api_key]\nheader = \"X-Api-Key\"\nsecret = \"top-secret\"\n");
    let config = EdcConfig::from_toml(&document).map_err(|err| err.to_string())?;
    let rendered = format!("{:?}", config.controlplane);
    if rendered.contains("top-secret") {
        return Err("api key secret leaked into debug output".to_string());
    }
    Ok(())
}

// ============================================================================
// SECTION: Loading
// ============================================================================

#[test]
fn load_reads_file_from_explicit_path() -> TestResult {
    let file = write_config(MINIMAL.as_bytes())?;
    let config = EdcConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    if config.controlplane.management_url != "https://consumer.example/management" {
        return Err("management url not loaded".to_string());
    }
    Ok(())
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let mut content = MINIMAL.as_bytes().to_vec();
    content.extend(std::iter::repeat_n(b'#', MAX_CONFIG_FILE_SIZE));
    let file = write_config(&content)?;
    assert_invalid(EdcConfig::load(Some(file.path())), "config file exceeds size limit")
}

#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let file = write_config(&[0xff, 0xfe, 0x00])?;
    assert_invalid(EdcConfig::load(Some(file.path())), "config file must be utf-8")
}

#[test]
fn load_reports_missing_file_as_io_error() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let missing = dir.path().join("absent.toml");
    match EdcConfig::load(Some(&missing)) {
        Err(ConfigError::Io(_)) => Ok(()),
        Err(other) => Err(format!("unexpected error {other}")),
        Ok(_) => Err("missing file should fail".to_string()),
    }
}

#[test]
fn load_reports_malformed_toml_as_parse_error() -> TestResult {
    let file = write_config(b"[controlplane\nmanagement_url = 1")?;
    match EdcConfig::load(Some(file.path())) {
        Err(ConfigError::Parse(_)) => Ok(()),
        Err(other) => Err(format!("unexpected error {other}")),
        Ok(_) => Err("malformed toml should fail".to_string()),
    }
}
