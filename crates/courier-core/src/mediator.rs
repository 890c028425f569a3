//! The mediator: builder and dispatcher.
//!
//! A [`MediatorBuilder`] collects handler bindings, validators and the ordered
//! list of behaviors during start-up. [`MediatorBuilder::build`] freezes all of
//! it into a [`Mediator`], which is cheap to clone and safe to share between
//! tasks.
//!
//! # Dispatch
//!
//! [`Mediator::send`] performs four steps:
//!
//! 1. Resolve the handler bound to the message's concrete type.
//! 2. Wrap it with every applicable behavior, innermost first.
//! 3. Run the outermost stage with the message and cancellation token.
//! 4. Return the response (downcast to the declared type) or the failure
//!    raised by any stage, unchanged.
//!
//! # Example
//!
//! ```rust,ignore
//! let mediator = MediatorBuilder::new()
//!     .behavior(LoggingBehavior::new())
//!     .validation()
//!     .rules(RuleSet::new().not_empty("Name", |c: &CreateProduct| c.name.as_str()))
//!     .command::<CreateProduct, _>(CreateProductHandler::new(store))?
//!     .build();
//!
//! let result = mediator.send_default(command).await?;
//! ```

use std::any::type_name;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use tracing::{Instrument, Level, debug, span};

use crate::error::{DispatchError, RegistrationError};
use crate::handler::{CommandHandler, Lifetime, QueryHandler};
use crate::message::{Command, Envelope, MessageKind, Query, Request};
use crate::pipeline::{Behavior, BoxedBehavior, KindScoped, assemble};
use crate::registry::HandlerRegistry;
use crate::validation::{RuleSet, ValidationBehavior, Validator, ValidatorRegistry};

// ============================================================================
// MediatorBuilder
// ============================================================================

enum Stage {
    Behavior(BoxedBehavior),
    Validation,
}

/// Collects registrations and behaviors for a [`Mediator`].
///
/// Behaviors run in the order they are added. The validation stage is only
/// part of the chain if [`validation`](Self::validation) is called; rules
/// attached without it are never evaluated.
pub struct MediatorBuilder {
    registry: HandlerRegistry,
    validators: ValidatorRegistry,
    stages: Vec<Stage>,
    lifetime: Lifetime,
}

impl Default for MediatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MediatorBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self {
            registry: HandlerRegistry::new(),
            validators: ValidatorRegistry::new(),
            stages: Vec::new(),
            lifetime: Lifetime::default(),
        }
    }

    /// Sets the lifetime that service installers should use for their
    /// handlers.
    pub fn handler_lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// The lifetime configured with [`handler_lifetime`](Self::handler_lifetime).
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// Binds command `C` to a shared `handler`.
    pub fn command<C, H>(mut self, handler: H) -> Result<Self, RegistrationError>
    where
        C: Command,
        H: CommandHandler<C>,
    {
        self.registry.register_command::<C, H>(handler)?;
        Ok(self)
    }

    /// Binds command `C` to handlers built by `factory` under `lifetime`.
    pub fn command_with<C, H, F>(
        mut self,
        lifetime: Lifetime,
        factory: F,
    ) -> Result<Self, RegistrationError>
    where
        C: Command,
        H: CommandHandler<C>,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.registry
            .register_command_with::<C, H, F>(lifetime, factory)?;
        Ok(self)
    }

    /// Binds query `Q` to a shared `handler`.
    pub fn query<Q, H>(mut self, handler: H) -> Result<Self, RegistrationError>
    where
        Q: Query,
        H: QueryHandler<Q>,
    {
        self.registry.register_query::<Q, H>(handler)?;
        Ok(self)
    }

    /// Binds query `Q` to handlers built by `factory` under `lifetime`.
    pub fn query_with<Q, H, F>(
        mut self,
        lifetime: Lifetime,
        factory: F,
    ) -> Result<Self, RegistrationError>
    where
        Q: Query,
        H: QueryHandler<Q>,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.registry
            .register_query_with::<Q, H, F>(lifetime, factory)?;
        Ok(self)
    }

    /// Appends a behavior that wraps every message.
    pub fn behavior(mut self, behavior: impl Behavior) -> Self {
        self.stages.push(Stage::Behavior(Arc::new(behavior)));
        self
    }

    /// Appends a behavior that only wraps messages of `kind`.
    pub fn behavior_for(mut self, kind: MessageKind, behavior: impl Behavior) -> Self {
        let scoped = KindScoped::new(kind, Arc::new(behavior));
        self.stages.push(Stage::Behavior(Arc::new(scoped)));
        self
    }

    /// Appends the validation stage at this position of the chain.
    ///
    /// It consults every validator attached to this builder, including those
    /// attached after this call.
    pub fn validation(mut self) -> Self {
        if self.stages.iter().any(|stage| matches!(stage, Stage::Validation)) {
            debug!("Validation stage already configured");
            return self;
        }
        self.stages.push(Stage::Validation);
        self
    }

    /// Attaches `validator` to message type `M`.
    pub fn validator<M, V>(mut self, validator: V) -> Self
    where
        M: Request,
        V: Validator<M>,
    {
        self.validators.add::<M, V>(validator);
        self
    }

    /// Attaches a rule set to message type `M`.
    pub fn rules<M: Request>(mut self, rules: RuleSet<M>) -> Self {
        self.validators.add_rules(rules);
        self
    }

    /// Direct access to the handler registry.
    pub fn registry_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.registry
    }

    /// Direct access to the validator registry.
    pub fn validators_mut(&mut self) -> &mut ValidatorRegistry {
        &mut self.validators
    }

    /// Freezes the configuration into a [`Mediator`].
    pub fn build(self) -> Mediator {
        let validators = Arc::new(self.validators);
        let behaviors = self
            .stages
            .into_iter()
            .map(|stage| match stage {
                Stage::Behavior(behavior) => behavior,
                Stage::Validation => {
                    Arc::new(ValidationBehavior::new(Arc::clone(&validators))) as BoxedBehavior
                }
            })
            .collect();
        Mediator::new(self.registry, behaviors)
    }
}

impl std::fmt::Debug for MediatorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediatorBuilder")
            .field("handlers", &self.registry.len())
            .field("stages", &self.stages.len())
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

// ============================================================================
// Mediator
// ============================================================================

struct MediatorInner {
    registry: HandlerRegistry,
    behaviors: Vec<BoxedBehavior>,
}

/// Dispatches commands and queries to their handlers through the behavior
/// chain.
///
/// Cloning is cheap: all clones share the same frozen registry.
#[derive(Clone)]
pub struct Mediator {
    inner: Arc<MediatorInner>,
}

impl Mediator {
    /// Creates a mediator from a populated registry and an ordered list of
    /// behaviors. The first behavior runs first.
    pub fn new(registry: HandlerRegistry, behaviors: Vec<BoxedBehavior>) -> Self {
        debug!(
            handlers = registry.len(),
            behaviors = behaviors.len(),
            "Mediator built"
        );
        Self {
            inner: Arc::new(MediatorInner {
                registry,
                behaviors,
            }),
        }
    }

    /// Returns a new [`MediatorBuilder`].
    pub fn builder() -> MediatorBuilder {
        MediatorBuilder::new()
    }

    /// Sends `message` through the pipeline and returns its typed response.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::UnregisteredHandler`] if no handler is bound to `M`;
    ///   no behavior runs in that case.
    /// - [`DispatchError::Cancelled`] if `cancel` fires before a stage starts.
    /// - Any failure raised by a behavior or the handler, unchanged.
    pub async fn send<M: Request>(
        &self,
        message: M,
        cancel: CancellationToken,
    ) -> Result<M::Response, DispatchError> {
        let registration = self.inner.registry.registration::<M>()?;
        let meta = *registration.meta();

        let span = span!(
            Level::DEBUG,
            "dispatch",
            request = meta.name(),
            kind = %meta.kind()
        );

        async move {
            if cancel.is_cancelled() {
                return Err(DispatchError::Cancelled { name: meta.name() });
            }

            let pipeline = assemble(registration.handler(), &self.inner.behaviors, &meta);
            let response = pipeline
                .oneshot(Envelope::with_meta(meta, message, cancel))
                .await?;

            response
                .downcast::<M::Response>()
                .map(|response| *response)
                .map_err(|_| DispatchError::ResponseTypeMismatch {
                    name: meta.name(),
                    expected: type_name::<M::Response>(),
                })
        }
        .instrument(span)
        .await
    }

    /// Sends `message` with a token that is never cancelled.
    pub async fn send_default<M: Request>(&self, message: M) -> Result<M::Response, DispatchError> {
        self.send(message, CancellationToken::new()).await
    }

    /// Returns the number of bound message types.
    pub fn handler_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Returns the names of the configured behaviors, in execution order.
    pub fn behavior_names(&self) -> Vec<&'static str> {
        self.inner
            .behaviors
            .iter()
            .map(|behavior| behavior.name())
            .collect()
    }

    /// Returns `true` if a handler is bound to `M`.
    pub fn is_registered<M: Request>(&self) -> bool {
        self.inner.registry.contains::<M>()
    }

    /// The frozen handler registry.
    pub fn registry(&self) -> &HandlerRegistry {
        &self.inner.registry
    }
}

impl std::fmt::Debug for Mediator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mediator")
            .field("handlers", &self.handler_count())
            .field("behaviors", &self.behavior_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BoxError, ErrorKind};
    use crate::handler::handler_fn;
    use crate::message::BoxedResponse;
    use crate::pipeline::Next;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio_test::assert_ok;

    #[derive(Debug, Clone)]
    struct CreateItem {
        name: String,
        price: f64,
    }

    impl Request for CreateItem {
        type Response = u64;
        const NAME: &'static str = "CreateItem";
    }

    impl Command for CreateItem {}

    #[derive(Debug)]
    struct CountItems;

    impl Request for CountItems {
        type Response = usize;
        const NAME: &'static str = "CountItems";
    }

    impl Query for CountItems {}

    #[derive(Debug)]
    struct Forget;

    impl Request for Forget {
        type Response = ();
        const NAME: &'static str = "Forget";
    }

    impl Command for Forget {}

    type Trace = Arc<Mutex<Vec<String>>>;

    struct Record {
        label: &'static str,
        trace: Trace,
    }

    #[async_trait]
    impl Behavior for Record {
        fn name(&self) -> &'static str {
            self.label
        }

        async fn handle(
            &self,
            envelope: Envelope,
            next: Next,
        ) -> Result<BoxedResponse, DispatchError> {
            self.trace.lock().unwrap().push(format!("{} in", self.label));
            let result = next.run(envelope).await;
            self.trace.lock().unwrap().push(format!("{} out", self.label));
            result
        }
    }

    /// Replaces every response with a value of the wrong type.
    struct Saboteur;

    #[async_trait]
    impl Behavior for Saboteur {
        async fn handle(
            &self,
            envelope: Envelope,
            next: Next,
        ) -> Result<BoxedResponse, DispatchError> {
            next.run(envelope).await?;
            Ok(Box::new("not a number"))
        }
    }

    /// Answers `CountItems` itself without reaching the handler.
    struct Cached(usize);

    #[async_trait]
    impl Behavior for Cached {
        fn applies_to(&self, meta: &crate::message::MessageMeta) -> bool {
            meta.is::<CountItems>()
        }

        async fn handle(
            &self,
            _envelope: Envelope,
            _next: Next,
        ) -> Result<BoxedResponse, DispatchError> {
            Ok(Box::new(self.0))
        }
    }

    fn create_handler(
        calls: Arc<AtomicUsize>,
    ) -> impl CommandHandler<CreateItem> {
        handler_fn(move |_: CreateItem, _: CancellationToken| {
            let calls = calls.clone();
            async move { Ok::<_, BoxError>(calls.fetch_add(1, Ordering::SeqCst) as u64 + 100) }
        })
    }

    fn count_handler(calls: Arc<AtomicUsize>) -> impl QueryHandler<CountItems> {
        handler_fn(move |_: CountItems, _: CancellationToken| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, BoxError>(3usize)
            }
        })
    }

    fn item(name: &str, price: f64) -> CreateItem {
        CreateItem {
            name: name.to_string(),
            price,
        }
    }

    #[tokio::test]
    async fn test_send_invokes_handler_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mediator = MediatorBuilder::new()
            .command::<CreateItem, _>(create_handler(calls.clone()))
            .unwrap()
            .build();

        let id = assert_ok!(mediator.send_default(item("Pen", 5.0)).await);
        assert_eq!(id, 100);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(mediator.is_registered::<CreateItem>());
        assert!(!mediator.is_registered::<CountItems>());
    }

    #[tokio::test]
    async fn test_unregistered_message_never_enters_the_chain() {
        let trace = Trace::default();
        let mediator = MediatorBuilder::new()
            .behavior(Record {
                label: "A",
                trace: trace.clone(),
            })
            .build();

        let err = mediator.send_default(CountItems).await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::UnregisteredHandler { name: "CountItems" }
        ));
        assert_eq!(err.kind(), ErrorKind::Unregistered);
        assert!(trace.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_behaviors_run_in_configured_order() {
        let trace = Trace::default();
        let record = |label| Record {
            label,
            trace: trace.clone(),
        };

        let handler_trace = trace.clone();
        let mediator = MediatorBuilder::new()
            .behavior(record("A"))
            .behavior(record("B"))
            .behavior(record("C"))
            .query::<CountItems, _>(handler_fn(move |_: CountItems, _: CancellationToken| {
                let trace = handler_trace.clone();
                async move {
                    trace.lock().unwrap().push("H".to_string());
                    Ok::<_, BoxError>(7usize)
                }
            }))
            .unwrap()
            .build();

        assert_eq!(mediator.behavior_names(), vec!["A", "B", "C"]);
        assert_eq!(assert_ok!(mediator.send_default(CountItems).await), 7);
        assert_eq!(
            *trace.lock().unwrap(),
            vec!["A in", "B in", "C in", "H", "C out", "B out", "A out"]
        );
    }

    #[tokio::test]
    async fn test_behavior_may_short_circuit_with_same_type() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mediator = MediatorBuilder::new()
            .behavior(Cached(42))
            .query::<CountItems, _>(count_handler(calls.clone()))
            .unwrap()
            .build();

        assert_eq!(mediator.send_default(CountItems).await.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_wrong_response_type_is_an_error_not_a_panic() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mediator = MediatorBuilder::new()
            .behavior(Saboteur)
            .query::<CountItems, _>(count_handler(calls))
            .unwrap()
            .build();

        let err = mediator.send_default(CountItems).await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::ResponseTypeMismatch {
                name: "CountItems",
                ..
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[tokio::test]
    async fn test_validation_rejects_before_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mediator = MediatorBuilder::new()
            .validation()
            .rules(RuleSet::new().not_empty("Name", |c: &CreateItem| c.name.as_str()))
            .command::<CreateItem, _>(create_handler(calls.clone()))
            .unwrap()
            .build();

        let err = mediator.send_default(item("", 10.0)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("Name is required"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        mediator.send_default(item("Pen", 10.0)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rules_without_validation_stage_are_ignored() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mediator = MediatorBuilder::new()
            .rules(RuleSet::new().greater_than("Price", |c: &CreateItem| c.price, 0.0))
            .command::<CreateItem, _>(create_handler(calls.clone()))
            .unwrap()
            .build();

        mediator.send_default(item("Pen", 0.0)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(mediator.behavior_names().is_empty());
    }

    #[tokio::test]
    async fn test_kind_scoped_behavior() {
        let trace = Trace::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let mediator = MediatorBuilder::new()
            .behavior_for(
                MessageKind::Command,
                Record {
                    label: "commands",
                    trace: trace.clone(),
                },
            )
            .command::<CreateItem, _>(create_handler(calls.clone()))
            .unwrap()
            .query::<CountItems, _>(count_handler(calls.clone()))
            .unwrap()
            .build();

        mediator.send_default(CountItems).await.unwrap();
        assert!(trace.lock().unwrap().is_empty());

        mediator.send_default(item("Pen", 1.0)).await.unwrap();
        assert_eq!(*trace.lock().unwrap(), vec!["commands in", "commands out"]);
    }

    #[tokio::test]
    async fn test_unit_response_for_commands_without_payload() {
        let mediator = MediatorBuilder::new()
            .command::<Forget, _>(handler_fn(|_: Forget, _: CancellationToken| async {
                Ok::<(), BoxError>(())
            }))
            .unwrap()
            .build();

        let () = mediator.send_default(Forget).await.unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_token_aborts_before_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mediator = MediatorBuilder::new()
            .query::<CountItems, _>(count_handler(calls.clone()))
            .unwrap()
            .build();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = mediator.send(CountItems, cancel).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_handler_failure_is_passed_through() {
        #[derive(Debug, thiserror::Error)]
        #[error("storage unavailable")]
        struct Unavailable;

        let mediator = MediatorBuilder::new()
            .query::<CountItems, _>(handler_fn(|_: CountItems, _: CancellationToken| async {
                Err::<usize, BoxError>(Box::new(Unavailable))
            }))
            .unwrap()
            .build();

        let err = mediator.send_default(CountItems).await.unwrap_err();
        assert_eq!(err.to_string(), "storage unavailable");
        assert!(err.handler_error::<Unavailable>().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_registration_fails_at_startup() {
        let calls = Arc::new(AtomicUsize::new(0));
        let err = MediatorBuilder::new()
            .query::<CountItems, _>(count_handler(calls.clone()))
            .unwrap()
            .query::<CountItems, _>(count_handler(calls))
            .unwrap_err();
        assert_eq!(
            err,
            RegistrationError::DuplicateHandler { name: "CountItems" }
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_sends_do_not_interfere() {
        let creates = Arc::new(AtomicUsize::new(0));
        let counts = Arc::new(AtomicUsize::new(0));

        let slow_count = {
            let counts = counts.clone();
            handler_fn(move |_: CountItems, _: CancellationToken| {
                let counts = counts.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    counts.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, BoxError>(1usize)
                }
            })
        };

        let mediator = MediatorBuilder::new()
            .validation()
            .rules(RuleSet::new().not_empty("Name", |c: &CreateItem| c.name.as_str()))
            .command::<CreateItem, _>(create_handler(creates.clone()))
            .unwrap()
            .query::<CountItems, _>(slow_count)
            .unwrap()
            .build();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let mediator = mediator.clone();
                tokio::spawn(async move {
                    if i % 2 == 0 {
                        mediator.send_default(CountItems).await.map(|n| n as u64)
                    } else {
                        mediator.send_default(item("Pen", 1.0)).await
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(creates.load(Ordering::SeqCst), 4);
        assert_eq!(counts.load(Ordering::SeqCst), 4);
        assert_eq!(mediator.handler_count(), 2);
    }

    #[tokio::test]
    async fn test_transient_handlers_are_built_per_dispatch() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let calls = Arc::new(AtomicUsize::new(0));

        let mediator = MediatorBuilder::new()
            .query_with::<CountItems, _, _>(Lifetime::Transient, move || {
                counter.fetch_add(1, Ordering::SeqCst);
                count_handler(calls.clone())
            })
            .unwrap()
            .build();

        mediator.send_default(CountItems).await.unwrap();
        mediator.send_default(CountItems).await.unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }
}
