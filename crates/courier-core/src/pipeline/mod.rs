//! Behavior pipeline for the Courier mediator.
//!
//! A [`Behavior`] is a decorator around the rest of the pipeline. It receives
//! the [`Envelope`] and a [`Next`] continuation and must either:
//!
//! - call `next.run(envelope)` exactly once and return (or replace) its
//!   result, or
//! - short-circuit by returning a response or an error without calling it.
//!
//! [`Next::run`] consumes the continuation, so calling it twice does not
//! compile.
//!
//! # Architecture
//!
//! The chain is assembled out of ordinary tower pieces (see [`service`]):
//!
//! ```text
//! BehaviorService(A)          ← first configured, runs first
//!   └─ BehaviorService(B)
//!        └─ BehaviorService(C)
//!             └─ HandlerService(H)
//! ```
//!
//! Behaviors preserve the response type: a behavior may substitute a value
//! but it must be of the request's declared response type.
//!
//! # Example
//!
//! ```rust,ignore
//! use courier_core::pipeline::{Behavior, Next};
//!
//! struct Audit;
//!
//! #[async_trait]
//! impl Behavior for Audit {
//!     async fn handle(&self, envelope: Envelope, next: Next) -> Result<BoxedResponse, DispatchError> {
//!         info!(request = envelope.name(), "audit");
//!         next.run(envelope).await
//!     }
//! }
//! ```

pub mod logging;
pub mod service;

use std::sync::Arc;

use async_trait::async_trait;
use tower::ServiceExt;

use crate::error::DispatchError;
use crate::message::{BoxedResponse, Envelope, MessageKind, MessageMeta};

pub use logging::LoggingBehavior;
pub use service::{BehaviorLayer, BehaviorService, HandlerService, PipelineService, assemble};

// ============================================================================
// Behavior Trait
// ============================================================================

/// A composable pipeline stage wrapping handler invocation.
#[async_trait]
pub trait Behavior: Send + Sync + 'static {
    /// Name used in logs and introspection.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Whether this behavior wraps messages described by `meta`.
    ///
    /// Behaviors that do not apply are left out of the chain entirely.
    fn applies_to(&self, _meta: &MessageMeta) -> bool {
        true
    }

    /// Processes the envelope, delegating to `next` to continue the chain.
    async fn handle(&self, envelope: Envelope, next: Next) -> Result<BoxedResponse, DispatchError>;
}

/// A shared, type-erased behavior.
pub type BoxedBehavior = Arc<dyn Behavior>;

// ============================================================================
// Next
// ============================================================================

/// The continuation handed to a [`Behavior`]: the rest of the pipeline.
pub struct Next {
    inner: PipelineService,
}

impl Next {
    pub(crate) fn new(inner: PipelineService) -> Self {
        Self { inner }
    }

    /// Runs the remainder of the pipeline.
    ///
    /// Fails with [`DispatchError::Cancelled`] without invoking the next stage
    /// if the envelope's token has been cancelled.
    pub async fn run(self, envelope: Envelope) -> Result<BoxedResponse, DispatchError> {
        if envelope.is_cancelled() {
            return Err(DispatchError::Cancelled {
                name: envelope.name(),
            });
        }
        self.inner.oneshot(envelope).await
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

// ============================================================================
// KindScoped
// ============================================================================

/// Restricts an inner behavior to one [`MessageKind`].
///
/// Used by [`MediatorBuilder::behavior_for`](crate::mediator::MediatorBuilder::behavior_for)
/// to give commands and queries different default chains.
pub struct KindScoped {
    kind: MessageKind,
    inner: BoxedBehavior,
}

impl KindScoped {
    /// Wraps `inner` so it only applies to messages of `kind`.
    pub fn new(kind: MessageKind, inner: BoxedBehavior) -> Self {
        Self { kind, inner }
    }
}

#[async_trait]
impl Behavior for KindScoped {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn applies_to(&self, meta: &MessageMeta) -> bool {
        meta.kind() == self.kind && self.inner.applies_to(meta)
    }

    async fn handle(&self, envelope: Envelope, next: Next) -> Result<BoxedResponse, DispatchError> {
        self.inner.handle(envelope, next).await
    }
}
