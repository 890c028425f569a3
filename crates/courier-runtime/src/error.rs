//! Runtime error types.

use courier_core::RegistrationError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while bootstrapping a mediator.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A service installer tried to bind a message type twice.
    #[error("Failed to register handlers: {0}")]
    Registration(#[from] RegistrationError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
