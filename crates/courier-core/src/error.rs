//! Error types for the Courier mediator.
//!
//! Two families of failures exist:
//!
//! - [`RegistrationError`] – configuration mistakes detected while the
//!   mediator is being built. These are fatal to start-up.
//! - [`DispatchError`] – failures of a single `send` call. They are fatal to
//!   that call only and are surfaced to the caller unchanged.

use thiserror::Error;

use crate::validation::ValidationError;

/// A boxed, thread-safe error as returned by handlers and collaborators.
pub use tower::BoxError;

// =============================================================================
// Registration Errors
// =============================================================================

/// Errors raised while binding handlers to message types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// A handler is already bound to this message type.
    #[error("a handler is already registered for '{name}'")]
    DuplicateHandler {
        /// The message name.
        name: &'static str,
    },

    /// Another message type already uses this name.
    #[error("message name '{name}' is already used by another message type")]
    DuplicateName {
        /// The clashing message name.
        name: &'static str,
    },
}

// =============================================================================
// Dispatch Errors
// =============================================================================

/// Coarse classification of a [`DispatchError`].
///
/// Inbound collaborators (route layers, CLIs) map this to their own response
/// shape without having to match on error payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No handler is bound to the message type.
    Unregistered,
    /// The message failed validation.
    Validation,
    /// The caller cancelled the dispatch.
    Cancelled,
    /// The handler or one of its collaborators failed.
    Handler,
    /// A type invariant of the pipeline was broken.
    Internal,
}

/// Errors that can occur while dispatching a single message.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No handler is bound to the message type.
    #[error("no handler registered for '{name}'")]
    UnregisteredHandler {
        /// The message name.
        name: &'static str,
    },

    /// A validation behavior rejected the message.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The cancellation token fired before the pipeline completed.
    #[error("dispatch of '{name}' was cancelled")]
    Cancelled {
        /// The message name.
        name: &'static str,
    },

    /// A handler received an envelope carrying a different message type.
    #[error("handler for '{name}' received a message that is not '{expected}'")]
    MessageTypeMismatch {
        /// The message name recorded in the envelope.
        name: &'static str,
        /// The message type the handler expects.
        expected: &'static str,
    },

    /// A behavior substituted a response of the wrong type.
    #[error("response for '{name}' is not of type '{expected}'")]
    ResponseTypeMismatch {
        /// The message name.
        name: &'static str,
        /// The declared response type.
        expected: &'static str,
    },

    /// The handler or a collaborator failed. The inner error is passed
    /// through untouched.
    #[error("{0}")]
    Handler(#[source] BoxError),
}

impl DispatchError {
    /// Wraps a handler or collaborator failure.
    pub fn handler(err: impl Into<BoxError>) -> Self {
        Self::Handler(err.into())
    }

    /// Returns the coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnregisteredHandler { .. } => ErrorKind::Unregistered,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Handler(_) => ErrorKind::Handler,
            Self::MessageTypeMismatch { .. } | Self::ResponseTypeMismatch { .. } => {
                ErrorKind::Internal
            }
        }
    }

    /// Returns the validation error, if this is one.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }

    /// Downcasts a handler failure to a concrete error type.
    pub fn handler_error<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Handler(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
