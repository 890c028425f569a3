//! # Courier
//!
//! A typed, in-process command/query mediator for Rust.
//!
//! ## Overview
//!
//! Callers hand a message to the [`Mediator`](core::Mediator) without knowing
//! who handles it. The mediator looks up the single handler registered for
//! the message's type and runs it behind an ordered chain of behaviors:
//!
//! ```text
//! ┌────────┐    ┌─────────┐    ┌──────────────────────────────────┐    ┌─────────┐
//! │ caller │───▶│ Mediator│───▶│ logging ▶ validation ▶ ...       │───▶│ handler │
//! └────────┘    └─────────┘    └──────────────────────────────────┘    └─────────┘
//! ```
//!
//! - **Messages**: commands change state, queries read it; each declares its
//!   response type
//! - **Handlers**: exactly one per message type, bound at startup
//! - **Behaviors**: cross-cutting stages (logging, validation) that may
//!   short-circuit
//! - **Runtime**: configuration and logging bootstrap
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courier::prelude::*;
//! use courier::catalog::{self, CreateProduct, InMemoryDocumentStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = CourierRuntime::new()?;
//!     let mediator =
//!         runtime.build(|builder| catalog::install(builder, InMemoryDocumentStore::shared()))?;
//!
//!     let created = mediator.send_default(CreateProduct { .. }).await?;
//!     println!("{}", created.id);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `catalog`: the bundled product catalog service
//! - `toml-config`: read `courier.toml` (default)
//! - `yaml-config`: read `courier.yaml`
//! - `json-log`: JSON log output

pub use courier_core as core;
pub use courier_runtime as runtime;

#[cfg(feature = "catalog")]
pub use courier_catalog as catalog;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use courier::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use courier_runtime::{CourierConfig, CourierRuntime, LoggingBuilder, SpanEvents};

    // Messages and handlers
    pub use courier_core::{
        CancellationToken, Command, CommandHandler, Lifetime, Query, QueryHandler, Request,
        handler_fn,
    };

    // Dispatch
    pub use courier_core::{DispatchError, ErrorKind, Mediator, MediatorBuilder};

    // Pipeline
    pub use courier_core::{Behavior, LoggingBehavior, Next};

    // Validation
    pub use courier_core::{RuleSet, ValidationError, Validator};
}
