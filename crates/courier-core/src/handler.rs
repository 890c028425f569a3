//! Handler system for the Courier mediator.
//!
//! Business logic lives in handlers. There are two typed handler traits that
//! mirror the two message flavours:
//!
//! - [`CommandHandler<C>`] for [`Command`]s
//! - [`QueryHandler<Q>`] for [`Query`]s
//!
//! Exactly one handler is bound to each message type. The registry stores
//! handlers type-erased as [`BoxedHandler`] so that a single map can hold all
//! of them; [`command_handler`] and [`query_handler`] perform that erasure.
//!
//! Plain async closures can be used as handlers through [`handler_fn`], which
//! is convenient for tests and small services:
//!
//! ```rust,ignore
//! use courier_core::handler_fn;
//!
//! let ping = handler_fn(|query: Ping, _cancel| async move { Ok(query.0 + 1) });
//! builder = builder.query::<Ping, _>(ping)?;
//! ```

use std::any::type_name;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{BoxError, DispatchError};
use crate::message::{BoxedResponse, Command, Envelope, Query, Request};

// ============================================================================
// Typed Handler Traits
// ============================================================================

/// Processes a [`Command`] of type `C`.
///
/// Handlers are shared between concurrent dispatches and must not rely on
/// per-call mutable state of their own. Shared resources are reached through
/// injected collaborators, which handle their own synchronisation.
#[async_trait]
pub trait CommandHandler<C: Command>: Send + Sync + 'static {
    /// Executes the command.
    async fn handle(&self, command: C, cancel: CancellationToken) -> Result<C::Response, BoxError>;
}

/// Processes a [`Query`] of type `Q`.
#[async_trait]
pub trait QueryHandler<Q: Query>: Send + Sync + 'static {
    /// Executes the query.
    async fn handle(&self, query: Q, cancel: CancellationToken) -> Result<Q::Response, BoxError>;
}

// ============================================================================
// HandlerFn - Use async closures as handlers
// ============================================================================

/// Adapts an async closure `Fn(M, CancellationToken) -> Future` into a handler.
///
/// Created with [`handler_fn`].
#[derive(Clone)]
pub struct HandlerFn<F> {
    f: F,
}

/// Wraps an async closure so it can be registered as a command or query handler.
pub fn handler_fn<F>(f: F) -> HandlerFn<F> {
    HandlerFn { f }
}

#[async_trait]
impl<C, F, Fut> CommandHandler<C> for HandlerFn<F>
where
    C: Command,
    F: Fn(C, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<C::Response, BoxError>> + Send + 'static,
{
    async fn handle(&self, command: C, cancel: CancellationToken) -> Result<C::Response, BoxError> {
        (self.f)(command, cancel).await
    }
}

#[async_trait]
impl<Q, F, Fut> QueryHandler<Q> for HandlerFn<F>
where
    Q: Query,
    F: Fn(Q, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Q::Response, BoxError>> + Send + 'static,
{
    async fn handle(&self, query: Q, cancel: CancellationToken) -> Result<Q::Response, BoxError> {
        (self.f)(query, cancel).await
    }
}

// ============================================================================
// ErasedHandler - Type-erased handler stored in the registry
// ============================================================================

/// Type-erased handler trait for dynamic dispatch.
///
/// Implemented by the adapters produced by [`command_handler`] and
/// [`query_handler`]. The adapter unwraps the envelope into its concrete
/// message type, runs the typed handler and boxes the response.
pub trait ErasedHandler: Send + Sync {
    /// Executes the handler with the given envelope.
    fn call(&self, envelope: Envelope) -> BoxFuture<'static, Result<BoxedResponse, DispatchError>>;
}

/// A type-erased handler that can be stored in collections.
pub type BoxedHandler = Arc<dyn ErasedHandler>;

struct CommandAdapter<C, H> {
    handler: Arc<H>,
    // PhantomData<fn() -> C> is Send + Sync regardless of C.
    _marker: PhantomData<fn() -> C>,
}

impl<C, H> ErasedHandler for CommandAdapter<C, H>
where
    C: Command,
    H: CommandHandler<C>,
{
    fn call(&self, envelope: Envelope) -> BoxFuture<'static, Result<BoxedResponse, DispatchError>> {
        let handler = Arc::clone(&self.handler);
        async move {
            let (command, cancel) = unwrap_envelope::<C>(envelope)?;
            let response = handler
                .handle(command, cancel)
                .await
                .map_err(DispatchError::Handler)?;
            Ok(Box::new(response) as BoxedResponse)
        }
        .boxed()
    }
}

struct QueryAdapter<Q, H> {
    handler: Arc<H>,
    _marker: PhantomData<fn() -> Q>,
}

impl<Q, H> ErasedHandler for QueryAdapter<Q, H>
where
    Q: Query,
    H: QueryHandler<Q>,
{
    fn call(&self, envelope: Envelope) -> BoxFuture<'static, Result<BoxedResponse, DispatchError>> {
        let handler = Arc::clone(&self.handler);
        async move {
            let (query, cancel) = unwrap_envelope::<Q>(envelope)?;
            let response = handler
                .handle(query, cancel)
                .await
                .map_err(DispatchError::Handler)?;
            Ok(Box::new(response) as BoxedResponse)
        }
        .boxed()
    }
}

fn unwrap_envelope<M: Request>(
    envelope: Envelope,
) -> Result<(M, CancellationToken), DispatchError> {
    envelope
        .into_parts::<M>()
        .map_err(|envelope| DispatchError::MessageTypeMismatch {
            name: envelope.name(),
            expected: type_name::<M>(),
        })
}

/// Erases a command handler.
pub fn command_handler<C, H>(handler: H) -> BoxedHandler
where
    C: Command,
    H: CommandHandler<C>,
{
    Arc::new(CommandAdapter::<C, H> {
        handler: Arc::new(handler),
        _marker: PhantomData,
    })
}

/// Erases a query handler.
pub fn query_handler<Q, H>(handler: H) -> BoxedHandler
where
    Q: Query,
    H: QueryHandler<Q>,
{
    Arc::new(QueryAdapter::<Q, H> {
        handler: Arc::new(handler),
        _marker: PhantomData,
    })
}

// ============================================================================
// HandlerFactory
// ============================================================================

/// How often a handler instance is constructed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifetime {
    /// One instance, built at registration and shared by every dispatch.
    #[default]
    Singleton,
    /// A fresh instance for every dispatch.
    Transient,
}

/// Produces the handler bound to a message type.
#[derive(Clone)]
pub enum HandlerFactory {
    /// Always hands out the same instance.
    Singleton(BoxedHandler),
    /// Builds a new instance on every call.
    Transient(Arc<dyn Fn() -> BoxedHandler + Send + Sync>),
}

impl HandlerFactory {
    /// A factory that always returns `handler`.
    pub fn singleton(handler: BoxedHandler) -> Self {
        Self::Singleton(handler)
    }

    /// A factory that calls `f` for every dispatch.
    pub fn transient<F>(f: F) -> Self
    where
        F: Fn() -> BoxedHandler + Send + Sync + 'static,
    {
        Self::Transient(Arc::new(f))
    }

    /// The lifetime policy of this factory.
    pub fn lifetime(&self) -> Lifetime {
        match self {
            Self::Singleton(_) => Lifetime::Singleton,
            Self::Transient(_) => Lifetime::Transient,
        }
    }

    /// Returns a handler instance according to the lifetime policy.
    pub fn produce(&self) -> BoxedHandler {
        match self {
            Self::Singleton(handler) => Arc::clone(handler),
            Self::Transient(f) => f(),
        }
    }
}

impl std::fmt::Debug for HandlerFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerFactory")
            .field("lifetime", &self.lifetime())
            .finish()
    }
}
