// crates/dataspace-edr-core/src/policy/tests.rs
// ============================================================================
// Module: Accepted Policy Checking Tests
// Description: Unit tests for offered policy matching and expiry.
// Purpose: Validate constraint tree evaluation and store semantics.
// Dependencies: dataspace-edr-core
// ============================================================================

//! ## Overview
//! Covers wildcard acceptance, `and`/`or`/`xone` evaluation, URL-encoded ids
//! and the split between invalid and expired policies.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use time::Duration;
use time::OffsetDateTime;

use super::AcceptedPolicyStore;
use super::PolicyChecker;
use crate::interfaces::AcceptedPoliciesProvider;
use crate::model::AcceptedPolicy;
use crate::model::Constraint;
use crate::model::Permission;
use crate::model::Policy;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn offered(constraints: Vec<Constraint>) -> Policy {
    Policy {
        permissions: vec![Permission {
            action: "odrl:use".to_string(),
            constraints,
        }],
        ..Policy::default()
    }
}

fn accepted(id: &str, valid_for: Duration) -> AcceptedPolicy {
    AcceptedPolicy::new(id, OffsetDateTime::now_utc() + valid_for)
}

fn checker_with(bpn: &str, policies: Vec<AcceptedPolicy>) -> PolicyChecker {
    let store = AcceptedPolicyStore::default();
    for policy in policies {
        store.add(bpn, policy);
    }
    PolicyChecker::new(store)
}

// ============================================================================
// SECTION: Matching
// ============================================================================

#[test]
fn wildcard_accepts_any_offer() {
    let checker = checker_with("BPNL1", vec![accepted("*", Duration::hours(1))]);
    let policy = offered(vec![Constraint::eq("Membership", "inactive")]);
    assert!(checker.is_valid(&policy, "BPNL1"));
    assert!(!checker.is_expired(&policy, "BPNL1"));
}

#[test]
fn accepted_id_matches_both_operand_layouts() {
    let checker = checker_with("BPNL1", vec![accepted("ID 3.0 Trace", Duration::hours(1))]);
    assert!(checker.is_valid(&offered(vec![Constraint::eq("PURPOSE", "ID 3.0 Trace")]), "BPNL1"));
    assert!(checker.is_valid(&offered(vec![Constraint::eq("ID 3.0 Trace", "active")]), "BPNL1"));
    assert!(checker.is_valid(&offered(vec![Constraint::eq("PURPOSE", "ID%203.0%20Trace")]), "BPNL1"));
    assert!(!checker.is_valid(&offered(vec![Constraint::eq("PURPOSE", "Other")]), "BPNL1"));
}

#[test]
fn constraint_trees_follow_logical_semantics() {
    let checker = checker_with("BPNL1", vec![accepted("A", Duration::hours(1))]);
    let hit = Constraint::eq("PURPOSE", "A");
    let miss = Constraint::eq("PURPOSE", "B");
    let and = Constraint::And {
        constraints: vec![hit.clone(), miss.clone()],
    };
    let or = Constraint::Or {
        constraints: vec![hit.clone(), miss.clone()],
    };
    let xone_single = Constraint::Xone {
        constraints: vec![hit.clone(), miss],
    };
    let xone_double = Constraint::Xone {
        constraints: vec![hit.clone(), hit],
    };
    assert!(!checker.is_valid(&offered(vec![and]), "BPNL1"));
    assert!(checker.is_valid(&offered(vec![or]), "BPNL1"));
    assert!(checker.is_valid(&offered(vec![xone_single]), "BPNL1"));
    assert!(!checker.is_valid(&offered(vec![xone_double]), "BPNL1"));
}

#[test]
fn non_use_action_is_rejected() {
    let checker = checker_with("BPNL1", vec![accepted("A", Duration::hours(1))]);
    let policy = Policy {
        permissions: vec![Permission {
            action: "odrl:transfer".to_string(),
            constraints: vec![Constraint::eq("PURPOSE", "A")],
        }],
        ..Policy::default()
    };
    assert!(!checker.is_valid(&policy, "BPNL1"));
}

#[test]
fn structured_accepted_policy_contributes_its_constraints() {
    let mut record = accepted("framework", Duration::hours(1));
    record.policy = Some(offered(vec![Constraint::eq("cx-policy:Membership", "active")]));
    let checker = checker_with("BPNL1", vec![record]);
    assert!(checker.is_valid(&offered(vec![Constraint::eq("Membership", "active")]), "BPNL1"));
}

#[test]
fn defaults_apply_to_every_provider() {
    let store = AcceptedPolicyStore::with_defaults(vec![accepted("A", Duration::hours(1))]);
    let checker = PolicyChecker::new(store);
    assert!(checker.is_valid(&offered(vec![Constraint::eq("PURPOSE", "A")]), "BPNL-any"));
}

// ============================================================================
// SECTION: Expiry
// ============================================================================

#[test]
fn expired_acceptance_is_valid_but_expired() {
    let checker = checker_with("BPNL1", vec![accepted("A", Duration::hours(-1))]);
    let policy = offered(vec![Constraint::eq("PURPOSE", "A")]);
    assert!(checker.is_valid(&policy, "BPNL1"));
    assert!(checker.is_expired(&policy, "BPNL1"));
    assert!(checker.valid_policies_for("BPNL1").is_empty());
}

#[test]
fn unknown_policy_is_neither_valid_nor_expired() {
    let checker = checker_with("BPNL1", vec![accepted("A", Duration::hours(1))]);
    let policy = offered(vec![Constraint::eq("PURPOSE", "Z")]);
    assert!(!checker.is_valid(&policy, "BPNL1"));
    assert!(!checker.is_expired(&policy, "BPNL1"));
    assert!(!checker.is_valid(&policy, "BPNL-other"));
}

#[test]
fn remove_drops_policy_everywhere() {
    let checker = checker_with("BPNL1", vec![accepted("A", Duration::hours(1))]);
    checker.store().add_default(accepted("A", Duration::hours(1)));
    assert!(checker.store().remove("A"));
    assert!(checker.store().policies_for("BPNL1").is_empty());
    assert!(!checker.store().remove("A"));
}
