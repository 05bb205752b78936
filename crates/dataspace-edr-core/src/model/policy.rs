// crates/dataspace-edr-core/src/model/policy.rs
// ============================================================================
// Module: Usage Policy Model
// Description: ODRL-style usage policies and accepted policy records.
// Purpose: Represent offered policies and the consumer's accepted policy set.
// Dependencies: serde, serde_json, time
// ============================================================================

//! ## Overview
//! Offered policies are a list of permissions, each with an action and a tree
//! of constraints. Constraint trees are closed: atomic comparisons combined
//! with `and`, `or` and `xone`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Policies
// ============================================================================

/// Usage policy attached to a catalog offer.
///
/// # Invariants
/// - `prohibitions` and `obligations` are carried through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Granted permissions.
    #[serde(default)]
    pub permissions: Vec<Permission>,
    /// Prohibitions, passed through verbatim.
    #[serde(default)]
    pub prohibitions: Vec<Value>,
    /// Obligations, passed through verbatim.
    #[serde(default)]
    pub obligations: Vec<Value>,
    /// Target asset identifier, when stated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl Policy {
    /// Returns a copy of the policy targeting `asset_id`.
    #[must_use]
    pub fn with_target(mut self, asset_id: impl Into<String>) -> Self {
        self.target = Some(asset_id.into());
        self
    }
}

/// Single permission of a usage policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Action type, typically `use`.
    pub action: String,
    /// Constraints that must all hold.
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

// ============================================================================
// SECTION: Constraints
// ============================================================================

/// Comparison operator of an atomic constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Equality.
    Eq,
    /// Inequality.
    Neq,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Geq,
    /// Less than.
    Lt,
    /// Less than or equal.
    Leq,
    /// Membership.
    In,
    /// Any of a set.
    IsAnyOf,
    /// All of a set.
    IsAllOf,
    /// None of a set.
    IsNoneOf,
}

impl Operator {
    /// Parses an operator from its short or ODRL-prefixed form.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let name = raw.rsplit([':', '/']).next().unwrap_or(raw);
        match name.to_ascii_lowercase().as_str() {
            "eq" => Some(Self::Eq),
            "neq" => Some(Self::Neq),
            "gt" => Some(Self::Gt),
            "gteq" | "geq" => Some(Self::Geq),
            "lt" => Some(Self::Lt),
            "lteq" | "leq" => Some(Self::Leq),
            "in" => Some(Self::In),
            "isanyof" => Some(Self::IsAnyOf),
            "isallof" => Some(Self::IsAllOf),
            "isnoneof" => Some(Self::IsNoneOf),
            _ => None,
        }
    }

    /// Returns the ODRL operator name.
    #[must_use]
    pub const fn odrl_name(self) -> &'static str {
        match self {
            Self::Eq => "odrl:eq",
            Self::Neq => "odrl:neq",
            Self::Gt => "odrl:gt",
            Self::Geq => "odrl:gteq",
            Self::Lt => "odrl:lt",
            Self::Leq => "odrl:lteq",
            Self::In => "odrl:in",
            Self::IsAnyOf => "odrl:isAnyOf",
            Self::IsAllOf => "odrl:isAllOf",
            Self::IsNoneOf => "odrl:isNoneOf",
        }
    }
}

/// Constraint tree node.
///
/// # Invariants
/// - Logical nodes never hold zero children after parsing from the wire;
///   an empty `and` is vacuously true, an empty `or` or `xone` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Constraint {
    /// Single comparison.
    Atomic {
        /// Left operand, for example `PURPOSE` or a framework agreement key.
        left_operand: String,
        /// Comparison operator.
        operator: Operator,
        /// Right operand.
        right_operand: String,
    },
    /// All children must hold.
    And {
        /// Child constraints.
        constraints: Vec<Self>,
    },
    /// At least one child must hold.
    Or {
        /// Child constraints.
        constraints: Vec<Self>,
    },
    /// Exactly one child must hold.
    Xone {
        /// Child constraints.
        constraints: Vec<Self>,
    },
}

impl Constraint {
    /// Builds an atomic equality constraint.
    #[must_use]
    pub fn eq(left_operand: impl Into<String>, right_operand: impl Into<String>) -> Self {
        Self::Atomic {
            left_operand: left_operand.into(),
            operator: Operator::Eq,
            right_operand: right_operand.into(),
        }
    }

    /// Collects every atomic leaf of the tree.
    pub fn atomics<'a>(&'a self, out: &mut Vec<&'a Self>) {
        match self {
            Self::Atomic {
                ..
            } => out.push(self),
            Self::And {
                constraints,
            }
            | Self::Or {
                constraints,
            }
            | Self::Xone {
                constraints,
            } => {
                for constraint in constraints {
                    constraint.atomics(out);
                }
            }
        }
    }
}

// ============================================================================
// SECTION: Accepted Policies
// ============================================================================

/// Policy the consumer has agreed to accept from providers.
///
/// # Invariants
/// - A policy is expired once `valid_until` is not after the current instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedPolicy {
    /// Policy identifier; `*` accepts every offer.
    pub policy_id: String,
    /// Expiry instant.
    #[serde(with = "time::serde::rfc3339")]
    pub valid_until: OffsetDateTime,
    /// Optional structured policy whose constraints are also accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<Policy>,
}

impl AcceptedPolicy {
    /// Creates an accepted policy record without structured constraints.
    #[must_use]
    pub fn new(policy_id: impl Into<String>, valid_until: OffsetDateTime) -> Self {
        Self {
            policy_id: policy_id.into(),
            valid_until,
            policy: None,
        }
    }

    /// Returns true when the record is still valid at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: OffsetDateTime) -> bool {
        self.valid_until > now
    }
}
