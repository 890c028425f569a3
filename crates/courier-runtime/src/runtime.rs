//! Bootstrap: turns configuration into a ready-to-use mediator.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use courier_runtime::CourierRuntime;
//!
//! // Loads courier.toml / COURIER_* variables and initializes logging.
//! let runtime = CourierRuntime::new()?;
//!
//! let mediator = runtime.build(|builder| catalog::install(builder, store))?;
//! ```

use courier_core::{LoggingBehavior, Mediator, MediatorBuilder, RegistrationError};
use tracing::info;

use crate::config::{ConfigLoader, CourierConfig, PipelineConfig};
use crate::error::RuntimeResult;
use crate::logging;

/// Holds the loaded configuration and builds mediators from it.
#[derive(Debug, Clone)]
pub struct CourierRuntime {
    config: CourierConfig,
}

impl CourierRuntime {
    /// Loads configuration from the default locations and initializes
    /// logging.
    pub fn new() -> RuntimeResult<Self> {
        let config = ConfigLoader::new().load()?;
        Ok(Self::from_config(config))
    }

    /// Creates a runtime from pre-loaded configuration and initializes
    /// logging. An already installed global subscriber is kept.
    pub fn from_config(config: CourierConfig) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            log_level = %config.logging.level,
            validation = config.pipeline.validation,
            logging = config.pipeline.logging,
            handler_lifetime = ?config.pipeline.handler_lifetime,
            "Runtime initialized from configuration"
        );

        Self { config }
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &CourierConfig {
        &self.config
    }

    /// Returns a builder with the built-in behaviors enabled by the
    /// configuration.
    pub fn mediator_builder(&self) -> MediatorBuilder {
        pipeline_builder(&self.config.pipeline)
    }

    /// Builds a mediator, letting `install` register services on the
    /// configured builder.
    pub fn build<F>(&self, install: F) -> RuntimeResult<Mediator>
    where
        F: FnOnce(MediatorBuilder) -> Result<MediatorBuilder, RegistrationError>,
    {
        let mediator = install(self.mediator_builder())?.build();
        info!(
            handlers = mediator.handler_count(),
            behaviors = ?mediator.behavior_names(),
            "Mediator ready"
        );
        Ok(mediator)
    }
}

/// Creates a [`MediatorBuilder`] wired according to `config`.
///
/// Logging, when enabled, is the outermost behavior so it also records
/// validation failures. Validation comes next.
pub fn pipeline_builder(config: &PipelineConfig) -> MediatorBuilder {
    let mut builder = MediatorBuilder::new().handler_lifetime(config.handler_lifetime);
    if config.logging {
        builder = builder.behavior(LoggingBehavior::new());
    }
    if config.validation {
        builder = builder.validation();
    }
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{
        BoxError, CancellationToken, Command, Lifetime, Request, RuleSet, handler_fn,
    };

    #[derive(Debug)]
    struct Rename(String);

    impl Request for Rename {
        type Response = ();
        const NAME: &'static str = "Rename";
    }

    impl Command for Rename {}

    fn install(builder: MediatorBuilder) -> Result<MediatorBuilder, RegistrationError> {
        builder
            .rules(RuleSet::new().not_empty("Name", |r: &Rename| r.0.as_str()))
            .command::<Rename, _>(handler_fn(|_: Rename, _: CancellationToken| async {
                Ok::<(), BoxError>(())
            }))
    }

    #[test]
    fn test_pipeline_builder_follows_config() {
        let all = pipeline_builder(&PipelineConfig::default()).build();
        assert_eq!(all.behavior_names(), vec!["logging", "validation"]);

        let none = pipeline_builder(&PipelineConfig {
            validation: false,
            logging: false,
            handler_lifetime: Lifetime::Transient,
        });
        assert_eq!(none.lifetime(), Lifetime::Transient);
        assert!(none.build().behavior_names().is_empty());
    }

    #[tokio::test]
    async fn test_validation_can_be_switched_off() {
        let mut config = CourierConfig::default();
        let runtime = CourierRuntime::from_config(config.clone());
        let mediator = runtime.build(install).unwrap();
        assert!(mediator.send_default(Rename(String::new())).await.is_err());

        config.pipeline.validation = false;
        let runtime = CourierRuntime::from_config(config);
        let mediator = runtime.build(install).unwrap();
        assert!(mediator.send_default(Rename(String::new())).await.is_ok());
    }

    #[test]
    fn test_registration_errors_surface() {
        let runtime = CourierRuntime::from_config(CourierConfig::default());
        let err = runtime
            .build(|builder| install(install(builder)?))
            .unwrap_err();
        assert!(matches!(err, crate::RuntimeError::Registration(_)));
    }
}
