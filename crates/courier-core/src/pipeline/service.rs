//! Tower services that make up a dispatch pipeline.
//!
//! [`HandlerService`] is the innermost service: it wraps a resolved handler
//! and implements `tower::Service<Envelope>`. Every behavior is stacked on
//! top through a [`BehaviorLayer`]. The fully assembled chain is type-erased
//! into a [`PipelineService`].

use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use tower::util::BoxCloneSyncService;
use tower::{Layer, Service};

use super::{BoxedBehavior, Next};
use crate::error::DispatchError;
use crate::handler::BoxedHandler;
use crate::message::{BoxedResponse, Envelope, MessageMeta};

/// A type-erased, `Clone + Send + Sync` pipeline stage.
pub type PipelineService = BoxCloneSyncService<Envelope, BoxedResponse, DispatchError>;

// ============================================================================
// HandlerService
// ============================================================================

/// A tower [`Service`] that calls a single resolved handler.
#[derive(Clone)]
pub struct HandlerService {
    handler: BoxedHandler,
}

impl HandlerService {
    /// Wraps `handler` in a `HandlerService`.
    pub fn new(handler: BoxedHandler) -> Self {
        Self { handler }
    }
}

impl Service<Envelope> for HandlerService {
    type Response = BoxedResponse;
    type Error = DispatchError;
    type Future = BoxFuture<'static, Result<BoxedResponse, DispatchError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, envelope: Envelope) -> Self::Future {
        if envelope.is_cancelled() {
            let name = envelope.name();
            return async move { Err(DispatchError::Cancelled { name }) }.boxed();
        }
        self.handler.call(envelope)
    }
}

// ============================================================================
// BehaviorLayer
// ============================================================================

/// A tower [`Layer`] that wraps a service with a [`Behavior`](super::Behavior).
#[derive(Clone)]
pub struct BehaviorLayer {
    behavior: BoxedBehavior,
}

impl BehaviorLayer {
    /// Creates a layer for `behavior`.
    pub fn new(behavior: BoxedBehavior) -> Self {
        Self { behavior }
    }
}

impl<S> Layer<S> for BehaviorLayer {
    type Service = BehaviorService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BehaviorService {
            behavior: self.behavior.clone(),
            inner,
        }
    }
}

/// A service that runs a behavior around its inner service.
pub struct BehaviorService<S> {
    behavior: BoxedBehavior,
    inner: S,
}

impl<S> Clone for BehaviorService<S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        BehaviorService {
            behavior: self.behavior.clone(),
            inner: self.inner.clone(),
        }
    }
}

impl<S> Service<Envelope> for BehaviorService<S>
where
    S: Service<Envelope, Response = BoxedResponse, Error = DispatchError>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
{
    type Response = BoxedResponse;
    type Error = DispatchError;
    type Future = BoxFuture<'static, Result<BoxedResponse, DispatchError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // The inner service is driven through `Next`, which polls it itself.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, envelope: Envelope) -> Self::Future {
        let behavior = self.behavior.clone();
        let next = Next::new(PipelineService::new(self.inner.clone()));
        async move { behavior.handle(envelope, next).await }.boxed()
    }
}

// ============================================================================
// Assembly
// ============================================================================

/// Builds the pipeline for one dispatch.
///
/// The handler is wrapped by every behavior that applies to `meta`, from the
/// last configured to the first, so the first configured behavior is the
/// outermost one and runs first.
pub fn assemble(
    handler: BoxedHandler,
    behaviors: &[BoxedBehavior],
    meta: &MessageMeta,
) -> PipelineService {
    behaviors
        .iter()
        .rev()
        .filter(|behavior| behavior.applies_to(meta))
        .fold(
            PipelineService::new(HandlerService::new(handler)),
            |inner, behavior| {
                PipelineService::new(BehaviorLayer::new(behavior.clone()).layer(inner))
            },
        )
}
