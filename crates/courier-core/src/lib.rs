//! # Courier Core
//!
//! A typed, in-process command/query mediator.
//!
//! Callers send a [`Command`] or [`Query`] to a [`Mediator`], which looks up
//! the single handler bound to the message's concrete type, wraps it in the
//! configured chain of [`Behavior`]s and returns the handler's statically
//! typed response.
//!
//! ```text
//! caller ──send(msg)──▶ Mediator ──▶ Behavior A ──▶ Behavior B ──▶ Handler
//!        ◀──Response───          ◀──           ◀──            ◀──
//! ```
//!
//! This crate provides:
//!
//! - **Message contracts** ([`message`]): [`Request`], [`Command`], [`Query`],
//!   [`Envelope`]
//! - **Handlers** ([`handler`]): [`CommandHandler`], [`QueryHandler`],
//!   [`handler_fn`], [`Lifetime`]
//! - **Registry** ([`registry`]): [`HandlerRegistry`], exact type lookup
//! - **Pipeline** ([`pipeline`]): [`Behavior`], [`Next`], tower-based chain
//!   assembly, [`LoggingBehavior`]
//! - **Validation** ([`validation`]): [`RuleSet`], [`ValidatorRegistry`],
//!   [`ValidationBehavior`]
//! - **Dispatcher** ([`mediator`]): [`MediatorBuilder`], [`Mediator`]
//! - **Errors** ([`error`]): [`DispatchError`], [`RegistrationError`]

pub mod error;
pub mod handler;
pub mod mediator;
pub mod message;
pub mod pipeline;
pub mod registry;
pub mod validation;

pub use error::{BoxError, DispatchError, DispatchResult, ErrorKind, RegistrationError};
pub use handler::{
    BoxedHandler, CommandHandler, ErasedHandler, HandlerFactory, HandlerFn, Lifetime,
    QueryHandler, command_handler, handler_fn, query_handler,
};
pub use mediator::{Mediator, MediatorBuilder};
pub use message::{BoxedResponse, Command, Envelope, MessageKind, MessageMeta, Query, Request};
pub use pipeline::{Behavior, BoxedBehavior, KindScoped, LoggingBehavior, Next};
pub use registry::{HandlerRegistry, Registration};
pub use validation::{
    RuleSet, ValidationBehavior, ValidationError, ValidationOutcome, Validator, ValidatorRegistry,
    Violation,
};

pub use tokio_util::sync::CancellationToken;
