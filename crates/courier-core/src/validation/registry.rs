//! Validator registry.
//!
//! Maps concrete message types to the validators that check them. Several
//! validators may be attached to one type; they run in registration order
//! and their outcomes are concatenated.

use std::any::TypeId;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::debug;

use super::ValidationOutcome;
use super::rules::{RuleSet, Validator};
use crate::message::{Envelope, Request};

/// Object-safe form of [`Validator`], working on envelopes.
pub trait ErasedValidator: Send + Sync + 'static {
    /// Validates the message carried by `envelope`.
    fn validate<'a>(&'a self, envelope: &'a Envelope) -> BoxFuture<'a, ValidationOutcome>;
}

struct TypedValidator<M, V> {
    inner: V,
    _marker: PhantomData<fn() -> M>,
}

impl<M, V> ErasedValidator for TypedValidator<M, V>
where
    M: Request,
    V: Validator<M>,
{
    fn validate<'a>(&'a self, envelope: &'a Envelope) -> BoxFuture<'a, ValidationOutcome> {
        match envelope.message::<M>() {
            Some(message) => self.inner.validate(message, envelope.cancellation()),
            None => async { ValidationOutcome::new() }.boxed(),
        }
    }
}

/// Maps message types to their validators.
#[derive(Default)]
pub struct ValidatorRegistry {
    validators: HashMap<TypeId, Vec<Arc<dyn ErasedValidator>>>,
}

impl ValidatorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `validator` to message type `M`.
    pub fn add<M, V>(&mut self, validator: V)
    where
        M: Request,
        V: Validator<M>,
    {
        debug!(request = M::NAME, "Registered validator");
        self.validators
            .entry(TypeId::of::<M>())
            .or_default()
            .push(Arc::new(TypedValidator {
                inner: validator,
                _marker: PhantomData,
            }));
    }

    /// Attaches a rule set to `M`.
    ///
    /// An empty rule set is not recorded, so `M` keeps behaving as if it had
    /// no rules at all.
    pub fn add_rules<M: Request>(&mut self, rules: RuleSet<M>) {
        if rules.is_empty() {
            return;
        }
        self.add::<M, _>(rules);
    }

    /// Builder-style variant of [`add`](Self::add).
    pub fn with<M, V>(mut self, validator: V) -> Self
    where
        M: Request,
        V: Validator<M>,
    {
        self.add::<M, V>(validator);
        self
    }

    /// Returns `true` if any validator is attached to the type `type_id`.
    pub fn contains(&self, type_id: TypeId) -> bool {
        self.validators
            .get(&type_id)
            .is_some_and(|validators| !validators.is_empty())
    }

    /// Returns the number of message types with validators.
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Returns `true` if no validators are registered.
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Runs every validator attached to the envelope's message type.
    pub async fn validate(&self, envelope: &Envelope) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::new();
        let Some(validators) = self.validators.get(&envelope.meta().type_id()) else {
            return outcome;
        };
        for validator in validators {
            outcome.merge(validator.validate(envelope).await);
        }
        outcome
    }
}

impl std::fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("message_types", &self.validators.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Command;
    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    #[derive(Debug)]
    struct Rename {
        name: String,
    }

    impl Request for Rename {
        type Response = ();
        const NAME: &'static str = "Rename";
    }

    impl Command for Rename {}

    struct NoShouting;

    #[async_trait]
    impl Validator<Rename> for NoShouting {
        async fn validate(&self, message: &Rename, _cancel: &CancellationToken) -> ValidationOutcome {
            let mut outcome = ValidationOutcome::new();
            if message.name.chars().any(char::is_uppercase) {
                outcome.push("Name", "Name must be lowercase");
            }
            outcome
        }
    }

    fn envelope(name: &str) -> Envelope {
        Envelope::command(
            Rename {
                name: name.to_string(),
            },
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn test_validators_run_in_registration_order() {
        let mut registry = ValidatorRegistry::new();
        registry.add_rules(RuleSet::new().not_empty("Name", |r: &Rename| r.name.as_str()));
        registry.add::<Rename, _>(NoShouting);

        let outcome = registry.validate(&envelope("OK")).await;
        assert_eq!(outcome.len(), 1);
        assert_eq!(outcome.violations()[0].message, "Name must be lowercase");

        let outcome = registry.validate(&envelope("")).await;
        assert_eq!(outcome.violations()[0].message, "Name is required");
    }

    #[tokio::test]
    async fn test_empty_rule_set_is_not_recorded() {
        let mut registry = ValidatorRegistry::new();
        registry.add_rules(RuleSet::<Rename>::new());

        assert!(!registry.contains(TypeId::of::<Rename>()));
        assert!(registry.validate(&envelope("")).await.is_valid());
    }
}
