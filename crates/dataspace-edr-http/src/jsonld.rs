// crates/dataspace-edr-http/src/jsonld.rs
// ============================================================================
// Module: JSON-LD Mapping
// Description: Request bodies and lenient response parsing for the management API.
// Purpose: Translate between pipeline models and compacted JSON-LD documents.
// Dependencies: dataspace-edr-core, serde_json
// ============================================================================

//! ## Overview
//! Connectors answer in compacted JSON-LD, but the compaction varies between
//! versions: a term may appear as `state`, `edc:state` or fully expanded,
//! and a single value may or may not be wrapped in an array. Lookups here
//! try every spelling of a term and treat one value and a one-element array
//! alike.
//! Invariants:
//! - Dataset and catalog properties are stored under expanded IRIs.
//! - Unknown constraint operators fail decoding instead of being dropped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use dataspace_edr_core::CallbackAddress;
use dataspace_edr_core::Catalog;
use dataspace_edr_core::CatalogRequest;
use dataspace_edr_core::Constraint;
use dataspace_edr_core::Dataset;
use dataspace_edr_core::IdResponse;
use dataspace_edr_core::NegotiationRequest;
use dataspace_edr_core::NegotiationResponse;
use dataspace_edr_core::Offer;
use dataspace_edr_core::Operator;
use dataspace_edr_core::Permission;
use dataspace_edr_core::Policy;
use dataspace_edr_core::StateResponse;
use dataspace_edr_core::TransferProcessRequest;
use dataspace_edr_core::TransferProcessResponse;
use dataspace_edr_core::TransportError;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Namespaces
// ============================================================================

/// EDC vocabulary, also the `@vocab` of every request.
pub const EDC_NAMESPACE: &str = "https://w3id.org/edc/v0.0.1/ns/";
/// ODRL vocabulary.
pub const ODRL_NAMESPACE: &str = "http://www.w3.org/ns/odrl/2/";
/// DCAT vocabulary.
pub const DCAT_NAMESPACE: &str = "http://www.w3.org/ns/dcat#";
/// Dublin Core terms.
pub const DCT_NAMESPACE: &str = "http://purl.org/dc/terms/";
/// Dataspace protocol vocabulary.
pub const DSPACE_NAMESPACE: &str = "https://w3id.org/dspace/v0.8/";

/// Known compact prefixes.
const PREFIXES: [(&str, &str); 5] = [
    ("edc", EDC_NAMESPACE),
    ("odrl", ODRL_NAMESPACE),
    ("dcat", DCAT_NAMESPACE),
    ("dct", DCT_NAMESPACE),
    ("dspace", DSPACE_NAMESPACE),
];

/// Returns the `@context` attached to request bodies.
fn context() -> Value {
    let mut context = Map::new();
    context.insert("@vocab".to_string(), Value::String(EDC_NAMESPACE.to_string()));
    for (prefix, namespace) in PREFIXES {
        context.insert(prefix.to_string(), Value::String(namespace.to_string()));
    }
    Value::Object(context)
}

// ============================================================================
// SECTION: Request Bodies
// ============================================================================

/// Builds the body of a catalog request.
#[must_use]
pub fn catalog_request_body(request: &CatalogRequest) -> Value {
    let query = &request.query_spec;
    let mut query_spec = Map::new();
    query_spec.insert("offset".to_string(), json!(query.offset));
    if let Some(limit) = query.limit {
        query_spec.insert("limit".to_string(), json!(limit));
    }
    if let Some(filter) = &query.filter {
        query_spec.insert(
            "filterExpression".to_string(),
            json!([{
                "operandLeft": filter.operand_left,
                "operator": filter.operator,
                "operandRight": filter.operand_right,
            }]),
        );
    }
    json!({
        "@context": context(),
        "@type": "CatalogRequest",
        "protocol": request.protocol,
        "counterPartyAddress": request.counter_party_address,
        "counterPartyId": request.counter_party_id,
        "querySpec": query_spec,
    })
}

/// Builds the body of a contract request.
///
/// The offered policy is sent as an `odrl:Offer` assigned by the provider
/// and targeting the asset.
#[must_use]
pub fn negotiation_request_body(request: &NegotiationRequest) -> Value {
    let offer = &request.offer;
    let target = offer.policy.target.clone().unwrap_or_else(|| offer.asset_id.clone());
    let mut policy = policy_body(&offer.policy);
    policy.insert("@id".to_string(), Value::String(offer.offer_id.clone()));
    policy.insert("@type".to_string(), Value::String("odrl:Offer".to_string()));
    policy.insert("odrl:assigner".to_string(), json!({ "@id": request.connector_id }));
    policy.insert("odrl:target".to_string(), json!({ "@id": target }));
    json!({
        "@context": context(),
        "@type": "ContractRequest",
        "protocol": request.protocol,
        "counterPartyAddress": request.counter_party_address,
        "providerId": request.connector_id,
        "policy": policy,
        "callbackAddresses": callback_addresses(&request.callback_addresses),
    })
}

/// Builds the body of a transfer request.
#[must_use]
pub fn transfer_request_body(request: &TransferProcessRequest) -> Value {
    json!({
        "@context": context(),
        "@type": "TransferRequest",
        "protocol": request.protocol,
        "counterPartyAddress": request.counter_party_address,
        "connectorId": request.connector_id,
        "contractId": request.contract_id,
        "assetId": request.asset_id,
        "transferType": request.transfer_type,
        "dataDestination": { "type": request.data_destination.kind },
        "privateProperties": request.private_properties,
        "callbackAddresses": callback_addresses(&request.callback_addresses),
    })
}

/// Serializes callback addresses.
fn callback_addresses(addresses: &[CallbackAddress]) -> Value {
    addresses
        .iter()
        .map(|address| {
            json!({
                "@type": "CallbackAddress",
                "uri": address.uri,
                "events": address.events,
                "transactional": address.transactional,
            })
        })
        .collect()
}

/// Serializes the rules of a policy.
fn policy_body(policy: &Policy) -> Map<String, Value> {
    let permissions: Vec<Value> = policy
        .permissions
        .iter()
        .map(|permission| {
            json!({
                "odrl:action": { "@id": permission.action },
                "odrl:constraint": permission.constraints.iter().map(constraint_body).collect::<Vec<_>>(),
            })
        })
        .collect();
    let mut body = Map::new();
    body.insert("odrl:permission".to_string(), Value::Array(permissions));
    body.insert("odrl:prohibition".to_string(), Value::Array(policy.prohibitions.clone()));
    body.insert("odrl:obligation".to_string(), Value::Array(policy.obligations.clone()));
    body
}

/// Serializes a constraint tree node.
fn constraint_body(constraint: &Constraint) -> Value {
    match constraint {
        Constraint::Atomic {
            left_operand,
            operator,
            right_operand,
        } => json!({
            "@type": "odrl:Constraint",
            "odrl:leftOperand": { "@id": left_operand },
            "odrl:operator": { "@id": operator.odrl_name() },
            "odrl:rightOperand": right_operand,
        }),
        Constraint::And {
            constraints,
        } => json!({ "odrl:and": constraints.iter().map(constraint_body).collect::<Vec<_>>() }),
        Constraint::Or {
            constraints,
        } => json!({ "odrl:or": constraints.iter().map(constraint_body).collect::<Vec<_>>() }),
        Constraint::Xone {
            constraints,
        } => json!({ "odrl:xone": constraints.iter().map(constraint_body).collect::<Vec<_>>() }),
    }
}

// ============================================================================
// SECTION: Response Parsing
// ============================================================================

/// Parses a catalog response.
///
/// # Errors
///
/// Returns [`TransportError::Decode`] when the document is not an object or
/// a dataset or policy is malformed.
pub fn parse_catalog(document: &Value) -> Result<Catalog, TransportError> {
    let object = as_object(document, "catalog")?;
    let datasets = lookup(object, "dcat:dataset")
        .map(as_list)
        .unwrap_or_default()
        .into_iter()
        .map(parse_dataset)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Catalog {
        id: id_of(object).unwrap_or_default(),
        participant_id: lookup(object, "dspace:participantId").and_then(text),
        properties: expanded_properties(object, &["dcat:dataset"]),
        datasets,
    })
}

/// Parses one dataset and its offers.
fn parse_dataset(document: &Value) -> Result<Dataset, TransportError> {
    let object = as_object(document, "dataset")?;
    let offers = lookup(object, "odrl:hasPolicy")
        .map(as_list)
        .unwrap_or_default()
        .into_iter()
        .map(parse_offer)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Dataset {
        id: id_of(object).unwrap_or_default(),
        properties: expanded_properties(object, &["odrl:hasPolicy"]),
        offers,
    })
}

/// Parses one offer.
fn parse_offer(document: &Value) -> Result<Offer, TransportError> {
    let object = as_object(document, "offer")?;
    Ok(Offer {
        id: id_of(object).ok_or_else(|| decode("offer is missing '@id'"))?,
        policy: parse_policy(object)?,
    })
}

/// Parses the rules of an ODRL policy.
///
/// # Errors
///
/// Returns [`TransportError::Decode`] when a permission or constraint is
/// malformed.
pub fn parse_policy(object: &Map<String, Value>) -> Result<Policy, TransportError> {
    let permissions = lookup(object, "odrl:permission")
        .map(as_list)
        .unwrap_or_default()
        .into_iter()
        .map(parse_permission)
        .collect::<Result<Vec<_>, _>>()?;
    let rules = |term: &str| -> Vec<Value> {
        lookup(object, term).map(as_list).unwrap_or_default().into_iter().cloned().collect()
    };
    Ok(Policy {
        permissions,
        prohibitions: rules("odrl:prohibition"),
        obligations: rules("odrl:obligation"),
        target: lookup(object, "odrl:target").and_then(text),
    })
}

/// Parses one permission.
fn parse_permission(document: &Value) -> Result<Permission, TransportError> {
    let object = as_object(document, "permission")?;
    let action = lookup(object, "odrl:action").and_then(action_name).unwrap_or_default();
    let constraints = lookup(object, "odrl:constraint")
        .map(as_list)
        .unwrap_or_default()
        .into_iter()
        .map(parse_constraint)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Permission {
        action,
        constraints,
    })
}

/// Reads an action from `"use"`, `{"@id": ..}` or `{"odrl:type": ..}`.
fn action_name(value: &Value) -> Option<String> {
    match value {
        Value::Object(object) => {
            id_of(object).or_else(|| lookup(object, "odrl:type").and_then(text))
        }
        other => text(other),
    }
}

/// Parses a constraint tree node.
fn parse_constraint(document: &Value) -> Result<Constraint, TransportError> {
    let object = as_object(document, "constraint")?;
    let children = |term: &str| -> Option<Result<Vec<Constraint>, TransportError>> {
        lookup(object, term)
            .map(|value| as_list(value).into_iter().map(parse_constraint).collect())
    };
    if let Some(constraints) = children("odrl:and") {
        return Ok(Constraint::And {
            constraints: constraints?,
        });
    }
    if let Some(constraints) = children("odrl:or") {
        return Ok(Constraint::Or {
            constraints: constraints?,
        });
    }
    if let Some(constraints) = children("odrl:xone") {
        return Ok(Constraint::Xone {
            constraints: constraints?,
        });
    }
    let left_operand = lookup(object, "odrl:leftOperand")
        .and_then(text)
        .ok_or_else(|| decode("constraint is missing 'leftOperand'"))?;
    let raw_operator = lookup(object, "odrl:operator")
        .and_then(text)
        .ok_or_else(|| decode("constraint is missing 'operator'"))?;
    let operator = Operator::parse(&raw_operator)
        .ok_or_else(|| decode(&format!("unsupported constraint operator '{raw_operator}'")))?;
    let right_operand = lookup(object, "odrl:rightOperand")
        .and_then(operand_text)
        .ok_or_else(|| decode("constraint is missing 'rightOperand'"))?;
    Ok(Constraint::Atomic {
        left_operand,
        operator,
        right_operand,
    })
}

/// Parses an `IdResponse`.
///
/// # Errors
///
/// Returns [`TransportError::Decode`] when `@id` is missing.
pub fn parse_id_response(document: &Value) -> Result<IdResponse, TransportError> {
    let object = as_object(document, "id response")?;
    Ok(IdResponse {
        response_id: id_of(object).ok_or_else(|| decode("id response is missing '@id'"))?,
    })
}

/// Parses a negotiation or transfer state response.
///
/// # Errors
///
/// Returns [`TransportError::Decode`] when `state` is missing.
pub fn parse_state(document: &Value) -> Result<StateResponse, TransportError> {
    let object = as_object(document, "state response")?;
    Ok(StateResponse {
        state: required_text(object, "state")?,
    })
}

/// Parses a contract negotiation.
///
/// # Errors
///
/// Returns [`TransportError::Decode`] when `@id` or `state` is missing.
pub fn parse_negotiation(document: &Value) -> Result<NegotiationResponse, TransportError> {
    let object = as_object(document, "contract negotiation")?;
    Ok(NegotiationResponse {
        response_id: id_of(object).ok_or_else(|| decode("negotiation is missing '@id'"))?,
        contract_agreement_id: lookup(object, "contractAgreementId").and_then(text),
        state: required_text(object, "state")?,
        error_detail: lookup(object, "errorDetail").and_then(text),
    })
}

/// Parses a transfer process.
///
/// # Errors
///
/// Returns [`TransportError::Decode`] when `@id` or `state` is missing.
pub fn parse_transfer_process(document: &Value) -> Result<TransferProcessResponse, TransportError> {
    let object = as_object(document, "transfer process")?;
    Ok(TransferProcessResponse {
        response_id: id_of(object).ok_or_else(|| decode("transfer process is missing '@id'"))?,
        state: required_text(object, "state")?,
        contract_id: lookup(object, "contractId").and_then(text).unwrap_or_default(),
        asset_id: lookup(object, "assetId").and_then(text).unwrap_or_default(),
        error_detail: lookup(object, "errorDetail").and_then(text),
    })
}

// ============================================================================
// SECTION: Term Lookup
// ============================================================================

/// Returns every spelling of a term.
///
/// `prefix:local` also matches `local` and the expanded IRI; a bare term is
/// read against the EDC vocabulary.
fn spellings(term: &str) -> Vec<String> {
    match term.split_once(':') {
        Some((prefix, local)) => {
            let mut spellings = vec![term.to_string(), local.to_string()];
            if let Some((_, namespace)) = PREFIXES.iter().find(|(known, _)| *known == prefix) {
                spellings.push(format!("{namespace}{local}"));
            }
            spellings
        }
        None => vec![term.to_string(), format!("edc:{term}"), format!("{EDC_NAMESPACE}{term}")],
    }
}

/// Looks up a term under any of its spellings.
fn lookup<'a>(object: &'a Map<String, Value>, term: &str) -> Option<&'a Value> {
    spellings(term).iter().find_map(|spelling| object.get(spelling))
}

/// Expands a compacted key to its IRI.
fn expand_key(key: &str) -> String {
    if key.starts_with('@') || key.contains("://") {
        return key.to_string();
    }
    match key.split_once(':') {
        Some((prefix, local)) => PREFIXES
            .iter()
            .find(|(known, _)| *known == prefix)
            .map_or_else(|| key.to_string(), |(_, namespace)| format!("{namespace}{local}")),
        None => format!("{EDC_NAMESPACE}{key}"),
    }
}

/// Copies properties under expanded keys, skipping keywords and `skipped` terms.
fn expanded_properties(object: &Map<String, Value>, skipped: &[&str]) -> BTreeMap<String, Value> {
    let skipped: Vec<String> = skipped.iter().map(|term| expand_key(term)).collect();
    object
        .iter()
        .filter(|(key, _)| !key.starts_with('@'))
        .map(|(key, value)| (expand_key(key), value.clone()))
        .filter(|(key, _)| !skipped.contains(key))
        .collect()
}

/// Returns the `@id` of a node.
fn id_of(object: &Map<String, Value>) -> Option<String> {
    object.get("@id").and_then(text)
}

/// Reads a required string term.
fn required_text(object: &Map<String, Value>, term: &str) -> Result<String, TransportError> {
    lookup(object, term).and_then(text).ok_or_else(|| decode(&format!("missing '{term}'")))
}

/// Reads a string from a literal, a value object, a node reference or the
/// first element of an array.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(literal) => Some(literal.clone()),
        Value::Object(object) => {
            object.get("@value").or_else(|| object.get("@id")).and_then(text)
        }
        Value::Array(items) => items.first().and_then(text),
        _ => None,
    }
}

/// Reads a right operand; lists are joined with commas.
fn operand_text(value: &Value) -> Option<String> {
    match value {
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(operand_text).collect();
            Some(parts.join(","))
        }
        other => text(other),
    }
}

/// Treats a single node and an array of nodes alike.
fn as_list(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// Requires a JSON object.
fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>, TransportError> {
    value.as_object().ok_or_else(|| decode(&format!("{what} is not a JSON object")))
}

/// Builds a decode error.
fn decode(message: &str) -> TransportError {
    TransportError::Decode(message.to_string())
}
