//! The validation pipeline stage.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{ValidationError, ValidatorRegistry};
use crate::error::DispatchError;
use crate::message::{BoxedResponse, Envelope, MessageMeta};
use crate::pipeline::{Behavior, Next};

/// Runs the validators registered for a message before the rest of the
/// pipeline, and short-circuits with [`DispatchError::Validation`] when any
/// rule is violated.
///
/// Message types without validators are left out of the chain, so their
/// dispatch is identical with or without this behavior.
#[derive(Debug, Clone)]
pub struct ValidationBehavior {
    validators: Arc<ValidatorRegistry>,
}

impl ValidationBehavior {
    /// Creates a validation behavior over `validators`.
    pub fn new(validators: impl Into<Arc<ValidatorRegistry>>) -> Self {
        Self {
            validators: validators.into(),
        }
    }

    /// The validators this behavior consults.
    pub fn validators(&self) -> &ValidatorRegistry {
        &self.validators
    }
}

#[async_trait]
impl Behavior for ValidationBehavior {
    fn name(&self) -> &'static str {
        "validation"
    }

    fn applies_to(&self, meta: &MessageMeta) -> bool {
        self.validators.contains(meta.type_id())
    }

    async fn handle(&self, envelope: Envelope, next: Next) -> Result<BoxedResponse, DispatchError> {
        let outcome = self.validators.validate(&envelope).await;
        if !outcome.is_valid() {
            debug!(
                request = envelope.name(),
                violations = outcome.len(),
                "Request rejected by validation"
            );
            return Err(ValidationError::new(envelope.name(), outcome).into());
        }
        next.run(envelope).await
    }
}
