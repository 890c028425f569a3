//! Validators and declarative rule sets.
//!
//! A [`RuleSet<M>`] is an ordered list of predicate + message-template rules.
//! Every rule is evaluated, so the outcome lists every violation rather than
//! only the first one. Templates may reference the rule's field as `{field}`.
//!
//! ```rust,ignore
//! let rules = RuleSet::<CreateProduct>::new()
//!     .not_empty("Name", |c| c.name.as_str())
//!     .greater_than("Price", |c| c.price, 0.0)
//!     .rule("Name", |c| c.name.len() <= 150, "{field} is too long");
//! ```

use std::fmt;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::ValidationOutcome;
use crate::message::Request;

// =============================================================================
// Validator
// =============================================================================

/// Checks the shape of a message of type `M`.
///
/// Validators may suspend, e.g. to consult an external collaborator.
#[async_trait]
pub trait Validator<M: Request>: Send + Sync + 'static {
    /// Evaluates every rule against `message` and returns all violations.
    async fn validate(&self, message: &M, cancel: &CancellationToken) -> ValidationOutcome;
}

// =============================================================================
// RuleSet
// =============================================================================

type Predicate<M> = Box<dyn Fn(&M) -> bool + Send + Sync>;

struct Rule<M> {
    field: &'static str,
    predicate: Predicate<M>,
    template: String,
}

impl<M> Rule<M> {
    fn message(&self) -> String {
        self.template.replace("{field}", self.field)
    }
}

/// An ordered set of synchronous rules for message type `M`.
pub struct RuleSet<M> {
    rules: Vec<Rule<M>>,
}

impl<M> Default for RuleSet<M> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<M: Request> RuleSet<M> {
    /// Creates an empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule: `predicate` must hold, otherwise `template` is reported
    /// against `field`.
    pub fn rule<P>(mut self, field: &'static str, predicate: P, template: impl Into<String>) -> Self
    where
        P: Fn(&M) -> bool + Send + Sync + 'static,
    {
        self.rules.push(Rule {
            field,
            predicate: Box::new(predicate),
            template: template.into(),
        });
        self
    }

    /// The string returned by `accessor` must contain non-whitespace text.
    pub fn not_empty<F>(self, field: &'static str, accessor: F) -> Self
    where
        F: Fn(&M) -> &str + Send + Sync + 'static,
    {
        self.rule(
            field,
            move |message| !accessor(message).trim().is_empty(),
            "{field} is required",
        )
    }

    /// The slice returned by `accessor` must contain at least one element.
    pub fn not_empty_list<T, F>(self, field: &'static str, accessor: F) -> Self
    where
        F: Fn(&M) -> &[T] + Send + Sync + 'static,
    {
        self.rule(
            field,
            move |message| !accessor(message).is_empty(),
            "{field} is required",
        )
    }

    /// The number returned by `accessor` must be strictly greater than `bound`.
    pub fn greater_than<F>(self, field: &'static str, accessor: F, bound: f64) -> Self
    where
        F: Fn(&M) -> f64 + Send + Sync + 'static,
    {
        self.rule(
            field,
            move |message| accessor(message) > bound,
            format!("{{field}} must be greater than {bound}"),
        )
    }

    /// Replaces the message template of the most recently added rule.
    pub fn with_message(mut self, template: impl Into<String>) -> Self {
        if let Some(rule) = self.rules.last_mut() {
            rule.template = template.into();
        }
        self
    }

    /// Evaluates every rule against `message`.
    pub fn evaluate(&self, message: &M) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::new();
        for rule in &self.rules {
            if !(rule.predicate)(message) {
                outcome.push(rule.field, rule.message());
            }
        }
        outcome
    }

    /// Returns the number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if the set has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[async_trait]
impl<M: Request> Validator<M> for RuleSet<M> {
    async fn validate(&self, message: &M, _cancel: &CancellationToken) -> ValidationOutcome {
        self.evaluate(message)
    }
}

impl<M> fmt::Debug for RuleSet<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.rules.iter().map(|rule| rule.field))
            .finish()
    }
}
