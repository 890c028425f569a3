//! Configuration module for the Courier runtime.
//!
//! This module provides layered configuration loading (figment) and
//! validation for logging and the dispatch pipeline.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    CourierConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, PipelineConfig,
    SpanEventConfig,
};
pub use validation::validate_config;
