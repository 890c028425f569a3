//! Courier Runtime - configuration, logging and bootstrap.
//!
//! This crate provides:
//! - Layered configuration loading with figment (`courier.toml`, `COURIER_*`)
//! - Logging initialization with `tracing-subscriber`
//! - [`CourierRuntime`], which wires the built-in behaviors according to the
//!   configuration and hands out ready [`Mediator`](courier_core::Mediator)s
//!
//! # Example
//!
//! ```rust,ignore
//! use courier_runtime::CourierRuntime;
//!
//! let runtime = CourierRuntime::new()?;
//! let mediator = runtime.build(|builder| {
//!     builder.command::<CreateProduct, _>(CreateProductHandler::new(store))
//! })?;
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, CourierConfig, PipelineConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{CourierRuntime, pipeline_builder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
