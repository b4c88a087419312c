//! Error types produced by the validate crate.
//!
//! Validation failures are data, not control flow: the validator returns a
//! [`ValidationError`] value and the partitioner turns it into a
//! [`ValidationDiagnostic`](crate::ValidationDiagnostic). Nothing in this
//! crate panics or unwinds on a bad row.
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`Violation`] | One field failed one constraint |
//! | [`ValidationError`] | All violations for one record (never empty) |
//! | [`ConfigError`](crate::ConfigError) | The rule table could not be built |
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::SalesField;

/// Broad category of a constraint failure.
///
/// The engine does not treat these differently; the category only helps
/// whoever reads the rejected-record artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Field absent or `null`.
    Missing,
    /// Value present but not coercible to the field's type.
    InvalidType,
    /// Value has the right type but breaks a length or sign rule.
    OutOfRange,
    /// Value does not match the required syntax (email, date).
    InvalidFormat,
}

/// A single failed constraint on a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub field: SalesField,
    pub kind: ViolationKind,
    pub message: String,
}

impl Violation {
    pub fn new(field: SalesField, kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            field,
            kind,
            message: message.into(),
        }
    }

    pub fn missing(field: SalesField) -> Self {
        Self::new(field, ViolationKind::Missing, "field required")
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every violation found for one record, in rule order.
///
/// Displays as one aggregated message so a rejected row carries a single
/// diagnostic text, e.g.
/// `customer_email: value is not a valid email address; quantity: Quantity must be greater than zero.`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render_violations(.violations))]
pub struct ValidationError {
    violations: Vec<Violation>,
}

impl ValidationError {
    /// Wraps a list of violations. Returns `None` for an empty list, since a
    /// record with no violations is valid.
    pub fn new(violations: Vec<Violation>) -> Option<Self> {
        if violations.is_empty() {
            None
        } else {
            Some(Self { violations })
        }
    }

    pub fn single(violation: Violation) -> Self {
        Self {
            violations: vec![violation],
        }
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// The first failing field in rule order.
    pub fn first(&self) -> &Violation {
        &self.violations[0]
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }

    pub fn mentions(&self, field: SalesField) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

fn render_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
