// crates/dataspace-edr-core/src/policy.rs
// ============================================================================
// Module: Accepted Policy Checking
// Description: In-memory accepted policy store and offered policy matching.
// Purpose: Decide whether a provider's usage policy is acceptable.
// Dependencies: time, tracing, url
// ============================================================================

//! ## Overview
//! [`AcceptedPolicyStore`] holds default and per-provider accepted policies.
//! [`PolicyChecker`] matches offered permissions against them.
//!
//! Every accepted policy id contributes two atomic matchers: `PURPOSE eq id`
//! and `id eq active`. Structured accepted policies additionally contribute
//! their own atomic constraints. An offered policy matches when every
//! permission has the `use` action and every constraint tree evaluates true
//! against the matchers.
//! Invariants:
//! - An accepted `*` id matches every offer.
//! - Ids also match their URL-encoded form.
//! - Expiry never affects [`AcceptedPoliciesProvider::is_valid`]; it only
//!   decides [`AcceptedPoliciesProvider::is_expired`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::PoisonError;
use std::sync::RwLock;

use time::OffsetDateTime;
use tracing::debug;
use url::form_urlencoded;

use crate::interfaces::AcceptedPoliciesProvider;
use crate::model::AcceptedPolicy;
use crate::model::Constraint;
use crate::model::Operator;
use crate::model::Permission;
use crate::model::Policy;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Accepted policy id matching every offer.
pub const WILDCARD_POLICY_ID: &str = "*";
/// Left operand pairing with an accepted policy id.
const PURPOSE_OPERAND: &str = "PURPOSE";
/// Right operand pairing with an accepted policy id.
const ACTIVE_OPERAND: &str = "active";
/// Permission action accepted by the checker.
const USE_ACTION: &str = "use";

// ============================================================================
// SECTION: Store
// ============================================================================

/// Thread-safe store of accepted policies.
///
/// # Invariants
/// - Default policies apply to every provider in addition to its own.
#[derive(Debug, Default)]
pub struct AcceptedPolicyStore {
    /// Policies accepted from every provider.
    defaults: RwLock<Vec<AcceptedPolicy>>,
    /// Policies accepted per provider BPN.
    by_bpn: RwLock<HashMap<String, Vec<AcceptedPolicy>>>,
}

impl AcceptedPolicyStore {
    /// Creates a store with the given default policies.
    #[must_use]
    pub fn with_defaults(defaults: Vec<AcceptedPolicy>) -> Self {
        Self {
            defaults: RwLock::new(defaults),
            by_bpn: RwLock::new(HashMap::new()),
        }
    }

    /// Adds a default policy, replacing one with the same id.
    pub fn add_default(&self, policy: AcceptedPolicy) {
        let mut defaults = self.defaults.write().unwrap_or_else(PoisonError::into_inner);
        defaults.retain(|existing| existing.policy_id != policy.policy_id);
        defaults.push(policy);
    }

    /// Adds a policy for one provider, replacing one with the same id.
    pub fn add(&self, bpn: impl Into<String>, policy: AcceptedPolicy) {
        let mut by_bpn = self.by_bpn.write().unwrap_or_else(PoisonError::into_inner);
        let policies = by_bpn.entry(bpn.into()).or_default();
        policies.retain(|existing| existing.policy_id != policy.policy_id);
        policies.push(policy);
    }

    /// Removes a policy id from the defaults and every provider.
    ///
    /// Returns true when anything was removed.
    pub fn remove(&self, policy_id: &str) -> bool {
        let mut removed = false;
        {
            let mut defaults = self.defaults.write().unwrap_or_else(PoisonError::into_inner);
            let before = defaults.len();
            defaults.retain(|policy| policy.policy_id != policy_id);
            removed |= defaults.len() != before;
        }
        let mut by_bpn = self.by_bpn.write().unwrap_or_else(PoisonError::into_inner);
        for policies in by_bpn.values_mut() {
            let before = policies.len();
            policies.retain(|policy| policy.policy_id != policy_id);
            removed |= policies.len() != before;
        }
        by_bpn.retain(|_, policies| !policies.is_empty());
        removed
    }

    /// Returns every accepted policy for a provider, expired ones included.
    #[must_use]
    pub fn policies_for(&self, bpn: &str) -> Vec<AcceptedPolicy> {
        let mut policies =
            self.defaults.read().unwrap_or_else(PoisonError::into_inner).clone();
        if let Some(own) = self.by_bpn.read().unwrap_or_else(PoisonError::into_inner).get(bpn) {
            policies.extend(own.iter().cloned());
        }
        policies
    }
}

// ============================================================================
// SECTION: Checker
// ============================================================================

/// Atomic comparison an offered constraint may match.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Matcher {
    /// Expected left operand.
    left: String,
    /// Expected operator.
    operator: Operator,
    /// Expected right operand.
    right: String,
}

/// Accepted policy matcher backed by an [`AcceptedPolicyStore`].
#[derive(Debug, Default)]
pub struct PolicyChecker {
    /// Accepted policies.
    store: AcceptedPolicyStore,
}

impl PolicyChecker {
    /// Creates a checker over `store`.
    #[must_use]
    pub const fn new(store: AcceptedPolicyStore) -> Self {
        Self {
            store,
        }
    }

    /// Returns the underlying store.
    #[must_use]
    pub const fn store(&self) -> &AcceptedPolicyStore {
        &self.store
    }

    /// Returns true when `offered` matches any of `accepted`.
    #[must_use]
    pub fn matches(offered: &Policy, accepted: &[AcceptedPolicy]) -> bool {
        if accepted.iter().any(|policy| policy.policy_id == WILDCARD_POLICY_ID) {
            return true;
        }
        if accepted.is_empty() {
            return false;
        }
        let matchers = matchers_for(accepted);
        offered.permissions.iter().all(|permission| permission_matches(permission, &matchers))
    }
}

impl AcceptedPoliciesProvider for PolicyChecker {
    fn is_valid(&self, policy: &Policy, bpn: &str) -> bool {
        let accepted = self.store.policies_for(bpn);
        let valid = Self::matches(policy, &accepted);
        debug!(bpn = %bpn, accepted = accepted.len(), valid, "checked offered policy");
        valid
    }

    fn is_expired(&self, policy: &Policy, bpn: &str) -> bool {
        let accepted = self.store.policies_for(bpn);
        if !Self::matches(policy, &accepted) {
            return false;
        }
        let now = OffsetDateTime::now_utc();
        let current: Vec<AcceptedPolicy> =
            accepted.into_iter().filter(|accepted| accepted.is_valid_at(now)).collect();
        !Self::matches(policy, &current)
    }

    fn valid_policies_for(&self, connector_id: &str) -> Vec<AcceptedPolicy> {
        let now = OffsetDateTime::now_utc();
        self.store
            .policies_for(connector_id)
            .into_iter()
            .filter(|policy| policy.is_valid_at(now))
            .collect()
    }
}

// ============================================================================
// SECTION: Matching
// ============================================================================

/// Builds the atomic matchers contributed by accepted policies.
fn matchers_for(accepted: &[AcceptedPolicy]) -> Vec<Matcher> {
    let mut matchers = Vec::new();
    for policy in accepted {
        for id in with_encoded(&policy.policy_id) {
            matchers.push(Matcher {
                left: PURPOSE_OPERAND.to_string(),
                operator: Operator::Eq,
                right: id.clone(),
            });
            matchers.push(Matcher {
                left: id,
                operator: Operator::Eq,
                right: ACTIVE_OPERAND.to_string(),
            });
        }
        let Some(structured) = &policy.policy else {
            continue;
        };
        let mut atomics = Vec::new();
        for permission in &structured.permissions {
            for constraint in &permission.constraints {
                constraint.atomics(&mut atomics);
            }
        }
        for atomic in atomics {
            if let Constraint::Atomic {
                left_operand,
                operator,
                right_operand,
            } = atomic
            {
                matchers.push(Matcher {
                    left: left_operand.clone(),
                    operator: *operator,
                    right: right_operand.clone(),
                });
            }
        }
    }
    matchers
}

/// Returns the id and, when different, its URL-encoded form.
fn with_encoded(id: &str) -> Vec<String> {
    let encoded = form_urlencoded::byte_serialize(id.as_bytes()).collect::<String>().replace('+', "%20");
    if encoded == id { vec![id.to_string()] } else { vec![id.to_string(), encoded] }
}

/// Checks one offered permission.
fn permission_matches(permission: &Permission, matchers: &[Matcher]) -> bool {
    let action = permission.action.rsplit([':', '/']).next().unwrap_or(&permission.action);
    action.eq_ignore_ascii_case(USE_ACTION)
        && permission.constraints.iter().all(|constraint| constraint_matches(constraint, matchers))
}

/// Evaluates an offered constraint tree.
fn constraint_matches(constraint: &Constraint, matchers: &[Matcher]) -> bool {
    match constraint {
        Constraint::Atomic {
            left_operand,
            operator,
            right_operand,
        } => matchers.iter().any(|matcher| {
            matcher.operator == *operator
                && operand_eq(&matcher.left, left_operand)
                && operand_eq(&matcher.right, right_operand)
        }),
        Constraint::And {
            constraints,
        } => constraints.iter().all(|child| constraint_matches(child, matchers)),
        Constraint::Or {
            constraints,
        } => constraints.iter().any(|child| constraint_matches(child, matchers)),
        Constraint::Xone {
            constraints,
        } => constraints.iter().filter(|child| constraint_matches(child, matchers)).count() == 1,
    }
}

/// Compares operands ignoring surrounding whitespace and namespace prefixes.
fn operand_eq(expected: &str, offered: &str) -> bool {
    let expected = expected.trim();
    let offered = offered.trim();
    expected == offered || strip_prefix(expected) == strip_prefix(offered)
}

/// Strips a compact namespace prefix such as `cx-policy:`.
fn strip_prefix(operand: &str) -> &str {
    if operand.contains("://") {
        return operand;
    }
    operand.split_once(':').map_or(operand, |(_, local)| local)
}

#[cfg(test)]
mod tests;
