//! Input validation for the Courier mediator.
//!
//! This module provides:
//!
//! - **Outcomes** – [`Violation`] and [`ValidationOutcome`], the result of
//!   checking a message's shape
//! - **Rules** ([`rules`]) – the [`Validator`] trait and the declarative
//!   [`RuleSet`]
//! - **Registry** ([`registry`]) – [`ValidatorRegistry`], which maps message
//!   types to their validators
//! - **Behavior** ([`behavior`]) – [`ValidationBehavior`], the pipeline stage
//!   that runs the validators and short-circuits on failure
//!
//! Validation is an optional stage: a mediator built without a
//! [`ValidationBehavior`] never validates anything.

pub mod behavior;
pub mod registry;
pub mod rules;

use std::fmt;

use serde::Serialize;
use thiserror::Error;

pub use behavior::ValidationBehavior;
pub use registry::ValidatorRegistry;
pub use rules::{RuleSet, Validator};

// =============================================================================
// Violation / ValidationOutcome
// =============================================================================

/// A single broken rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// The offending field.
    pub field: String,
    /// Human-readable description of the problem.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// The violations found when checking a message. Empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    violations: Vec<Violation>,
}

impl ValidationOutcome {
    /// Creates an empty (valid) outcome.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a violation.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.violations.push(Violation {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Appends every violation of `other`, keeping order.
    pub fn merge(&mut self, other: ValidationOutcome) {
        self.violations.extend(other.violations);
    }

    /// Returns `true` if no rule was violated.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Returns the number of violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Returns `true` if there are no violations.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// The first violation, if any.
    pub fn first(&self) -> Option<&Violation> {
        self.violations.first()
    }

    /// All violations, in evaluation order.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Returns `true` if any violation concerns `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }

    fn summary(&self) -> String {
        match self.violations.as_slice() {
            [] => "no violations".to_string(),
            [only] => only.message.clone(),
            [first, rest @ ..] => format!("{} (and {} more)", first.message, rest.len()),
        }
    }
}

impl IntoIterator for ValidationOutcome {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.into_iter()
    }
}

impl FromIterator<Violation> for ValidationOutcome {
    fn from_iter<I: IntoIterator<Item = Violation>>(iter: I) -> Self {
        Self {
            violations: iter.into_iter().collect(),
        }
    }
}

// =============================================================================
// ValidationError
// =============================================================================

/// A message was rejected because it violates one or more rules.
///
/// Raised before the handler runs, so no handler side effect has happened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation failed for '{name}': {}", .outcome.summary())]
pub struct ValidationError {
    name: &'static str,
    outcome: ValidationOutcome,
}

impl ValidationError {
    /// Creates a validation error for the message `name`.
    pub fn new(name: &'static str, outcome: ValidationOutcome) -> Self {
        Self { name, outcome }
    }

    /// The name of the rejected message.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The full set of violations.
    pub fn outcome(&self) -> &ValidationOutcome {
        &self.outcome
    }

    /// Shorthand for `self.outcome().violations()`.
    pub fn violations(&self) -> &[Violation] {
        self.outcome.violations()
    }
}
