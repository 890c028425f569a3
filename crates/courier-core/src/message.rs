//! Message contracts for the Courier mediator.
//!
//! Every unit of intent sent through the pipeline is a [`Request`] with a
//! single associated response type fixed at compile time. Requests come in
//! two nominal flavours:
//!
//! - [`Command`] – intent to change state
//! - [`Query`] – intent to read state
//!
//! The pipeline treats both the same way, but they are registered through
//! separate handler traits so that a mediator can scope behaviors to one
//! kind only (see [`MessageKind`]).
//!
//! Inside the pipeline a message travels as an [`Envelope`]: the boxed
//! message, its [`MessageMeta`] and the caller's cancellation token.
//!
//! # Example
//!
//! ```rust,ignore
//! use courier_core::{Command, Request};
//!
//! #[derive(Debug)]
//! struct RenameProduct {
//!     id: Uuid,
//!     name: String,
//! }
//!
//! impl Request for RenameProduct {
//!     type Response = ();
//!     const NAME: &'static str = "RenameProduct";
//! }
//!
//! impl Command for RenameProduct {}
//! ```

use std::any::{Any, TypeId};
use std::fmt;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Request / Command / Query
// ============================================================================

/// The base trait for every message dispatched by the mediator.
///
/// A request is an immutable value constructed by the caller for a single
/// dispatch. Commands without a meaningful result use `()` as their
/// response so generic pipeline code never has to special-case "no result".
pub trait Request: Send + Sync + 'static {
    /// The value produced by this request's handler.
    type Response: Send + 'static;

    /// Stable, human-readable tag used in logs and error messages.
    ///
    /// Identity inside the registry is the Rust [`TypeId`]; the name must
    /// nevertheless be unique per mediator.
    const NAME: &'static str;
}

/// Marker for requests that change state.
pub trait Command: Request {}

/// Marker for requests that only read state.
pub trait Query: Request {}

// ============================================================================
// MessageKind
// ============================================================================

/// Nominal classification of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// A state-changing [`Command`].
    Command,
    /// A read-only [`Query`].
    Query,
}

impl MessageKind {
    /// Returns the lowercase name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Query => "query",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// MessageMeta
// ============================================================================

/// Runtime description of a registered message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageMeta {
    type_id: TypeId,
    name: &'static str,
    kind: MessageKind,
}

impl MessageMeta {
    /// Describes the command type `C`.
    pub fn command<C: Command>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            name: C::NAME,
            kind: MessageKind::Command,
        }
    }

    /// Describes the query type `Q`.
    pub fn query<Q: Query>() -> Self {
        Self {
            type_id: TypeId::of::<Q>(),
            name: Q::NAME,
            kind: MessageKind::Query,
        }
    }

    /// The [`TypeId`] of the concrete message type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The message's [`Request::NAME`].
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the message is a command or a query.
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Returns `true` if this describes the concrete type `M`.
    pub fn is<M: Request>(&self) -> bool {
        self.type_id == TypeId::of::<M>()
    }
}

// ============================================================================
// Envelope
// ============================================================================

/// A type-erased response travelling back through the pipeline.
///
/// The mediator downcasts it to the request's declared response type once the
/// outermost behavior returns.
pub type BoxedResponse = Box<dyn Any + Send>;

/// A message in flight, together with its metadata and cancellation token.
///
/// Behaviors receive the envelope by value and hand it on to their
/// continuation. They can inspect the typed message with
/// [`message`](Self::message) without knowing every message type up front.
pub struct Envelope {
    meta: MessageMeta,
    message: Box<dyn Any + Send + Sync>,
    cancel: CancellationToken,
}

impl Envelope {
    /// Wraps a command for dispatch.
    pub fn command<C: Command>(message: C, cancel: CancellationToken) -> Self {
        Self::with_meta(MessageMeta::command::<C>(), message, cancel)
    }

    /// Wraps a query for dispatch.
    pub fn query<Q: Query>(message: Q, cancel: CancellationToken) -> Self {
        Self::with_meta(MessageMeta::query::<Q>(), message, cancel)
    }

    /// Wraps `message` with metadata taken from its registration.
    pub(crate) fn with_meta<M: Request>(
        meta: MessageMeta,
        message: M,
        cancel: CancellationToken,
    ) -> Self {
        debug_assert!(meta.is::<M>(), "metadata does not describe {}", M::NAME);
        Self {
            meta,
            message: Box::new(message),
            cancel,
        }
    }

    /// Returns the message metadata.
    pub fn meta(&self) -> &MessageMeta {
        &self.meta
    }

    /// Shorthand for `self.meta().name()`.
    pub fn name(&self) -> &'static str {
        self.meta.name
    }

    /// Shorthand for `self.meta().kind()`.
    pub fn kind(&self) -> MessageKind {
        self.meta.kind
    }

    /// Returns the caller's cancellation token.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns `true` if the caller has cancelled this dispatch.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Borrows the message as the concrete type `M`.
    ///
    /// Returns `None` if the envelope carries a different message type.
    pub fn message<M: Request>(&self) -> Option<&M> {
        self.message.downcast_ref::<M>()
    }

    /// Returns `true` if the envelope carries a message of type `M`.
    pub fn is<M: Request>(&self) -> bool {
        self.message.is::<M>()
    }

    /// Unwraps the message as `M`, handing back the envelope on mismatch.
    pub(crate) fn into_parts<M: Request>(self) -> Result<(M, CancellationToken), Self> {
        let Self {
            meta,
            message,
            cancel,
        } = self;
        match message.downcast::<M>() {
            Ok(message) => Ok((*message, cancel)),
            Err(message) => Err(Self {
                meta,
                message,
                cancel,
            }),
        }
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("name", &self.meta.name)
            .field("kind", &self.meta.kind)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
