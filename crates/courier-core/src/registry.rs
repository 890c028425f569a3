//! Handler registry.
//!
//! The [`HandlerRegistry`] binds each concrete message type to exactly one
//! [`HandlerFactory`]. Lookup is by [`TypeId`] with no fallback matching, so
//! resolution is a single hash lookup.
//!
//! Registration happens during start-up on a [`MediatorBuilder`]. Building
//! the [`Mediator`] moves the registry behind an `Arc`, after which it can no
//! longer be mutated.
//!
//! [`MediatorBuilder`]: crate::mediator::MediatorBuilder
//! [`Mediator`]: crate::mediator::Mediator

use std::any::TypeId;
use std::collections::HashMap;

use tracing::debug;

use crate::error::{DispatchError, RegistrationError};
use crate::handler::{
    BoxedHandler, CommandHandler, HandlerFactory, Lifetime, QueryHandler, command_handler,
    query_handler,
};
use crate::message::{Command, MessageMeta, Query, Request};

/// A message type bound to its handler factory.
#[derive(Debug, Clone)]
pub struct Registration {
    meta: MessageMeta,
    factory: HandlerFactory,
}

impl Registration {
    /// The metadata of the bound message type.
    pub fn meta(&self) -> &MessageMeta {
        &self.meta
    }

    /// The lifetime policy of the bound handler.
    pub fn lifetime(&self) -> Lifetime {
        self.factory.lifetime()
    }

    /// Returns a handler instance.
    pub fn handler(&self) -> BoxedHandler {
        self.factory.produce()
    }
}

/// Maps message types to their handlers.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    entries: HashMap<TypeId, Registration>,
    names: HashMap<&'static str, TypeId>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the message type described by `meta` to `factory`.
    ///
    /// Fails if the type, or another type with the same name, is already
    /// bound.
    pub fn register(
        &mut self,
        meta: MessageMeta,
        factory: HandlerFactory,
    ) -> Result<(), RegistrationError> {
        if self.entries.contains_key(&meta.type_id()) {
            return Err(RegistrationError::DuplicateHandler { name: meta.name() });
        }
        if self.names.contains_key(meta.name()) {
            return Err(RegistrationError::DuplicateName { name: meta.name() });
        }

        debug!(
            request = meta.name(),
            kind = %meta.kind(),
            lifetime = ?factory.lifetime(),
            "Registered handler"
        );

        self.names.insert(meta.name(), meta.type_id());
        self.entries
            .insert(meta.type_id(), Registration { meta, factory });
        Ok(())
    }

    /// Binds command `C` to a single shared `handler`.
    pub fn register_command<C, H>(&mut self, handler: H) -> Result<(), RegistrationError>
    where
        C: Command,
        H: CommandHandler<C>,
    {
        self.register(
            MessageMeta::command::<C>(),
            HandlerFactory::singleton(command_handler::<C, H>(handler)),
        )
    }

    /// Binds command `C` to handlers built by `factory` under `lifetime`.
    ///
    /// With [`Lifetime::Singleton`] the factory is called once, immediately.
    pub fn register_command_with<C, H, F>(
        &mut self,
        lifetime: Lifetime,
        factory: F,
    ) -> Result<(), RegistrationError>
    where
        C: Command,
        H: CommandHandler<C>,
        F: Fn() -> H + Send + Sync + 'static,
    {
        let factory = match lifetime {
            Lifetime::Singleton => HandlerFactory::singleton(command_handler::<C, H>(factory())),
            Lifetime::Transient => {
                HandlerFactory::transient(move || command_handler::<C, H>(factory()))
            }
        };
        self.register(MessageMeta::command::<C>(), factory)
    }

    /// Binds query `Q` to a single shared `handler`.
    pub fn register_query<Q, H>(&mut self, handler: H) -> Result<(), RegistrationError>
    where
        Q: Query,
        H: QueryHandler<Q>,
    {
        self.register(
            MessageMeta::query::<Q>(),
            HandlerFactory::singleton(query_handler::<Q, H>(handler)),
        )
    }

    /// Binds query `Q` to handlers built by `factory` under `lifetime`.
    pub fn register_query_with<Q, H, F>(
        &mut self,
        lifetime: Lifetime,
        factory: F,
    ) -> Result<(), RegistrationError>
    where
        Q: Query,
        H: QueryHandler<Q>,
        F: Fn() -> H + Send + Sync + 'static,
    {
        let factory = match lifetime {
            Lifetime::Singleton => HandlerFactory::singleton(query_handler::<Q, H>(factory())),
            Lifetime::Transient => {
                HandlerFactory::transient(move || query_handler::<Q, H>(factory()))
            }
        };
        self.register(MessageMeta::query::<Q>(), factory)
    }

    /// Looks up the registration for message type `M`.
    pub fn registration<M: Request>(&self) -> Result<&Registration, DispatchError> {
        self.entries
            .get(&TypeId::of::<M>())
            .ok_or(DispatchError::UnregisteredHandler { name: M::NAME })
    }

    /// Returns the handler bound to `message`'s type.
    pub fn resolve<M: Request>(&self, _message: &M) -> Result<BoxedHandler, DispatchError> {
        self.registration::<M>().map(Registration::handler)
    }

    /// Returns `true` if a handler is bound to `M`.
    pub fn contains<M: Request>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<M>())
    }

    /// Iterates over the metadata of every bound message type.
    pub fn messages(&self) -> impl Iterator<Item = &MessageMeta> {
        self.entries.values().map(Registration::meta)
    }

    /// Returns the number of bound message types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::handler::handler_fn;
    use crate::message::Envelope;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_util::sync::CancellationToken;

    #[derive(Debug)]
    struct Add(u32, u32);

    impl Request for Add {
        type Response = u32;
        const NAME: &'static str = "Add";
    }

    impl Query for Add {}

    #[derive(Debug)]
    struct Impostor;

    impl Request for Impostor {
        type Response = ();
        const NAME: &'static str = "Add";
    }

    impl Command for Impostor {}

    struct AddHandler;

    #[async_trait]
    impl QueryHandler<Add> for AddHandler {
        async fn handle(&self, query: Add, _cancel: CancellationToken) -> Result<u32, BoxError> {
            Ok(query.0 + query.1)
        }
    }

    #[tokio::test]
    async fn test_resolve_returns_bound_handler() {
        let mut registry = HandlerRegistry::new();
        registry.register_query::<Add, _>(AddHandler).unwrap();

        let message = Add(2, 3);
        let handler = registry.resolve(&message).unwrap();
        let response = handler
            .call(Envelope::query(message, CancellationToken::new()))
            .await
            .unwrap();
        assert_eq!(*response.downcast::<u32>().unwrap(), 5);
        assert_eq!(registry.len(), 1);
        assert!(registry.contains::<Add>());
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut registry = HandlerRegistry::new();
        registry.register_query::<Add, _>(AddHandler).unwrap();

        let err = registry.register_query::<Add, _>(AddHandler).unwrap_err();
        assert_eq!(err, RegistrationError::DuplicateHandler { name: "Add" });
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let mut registry = HandlerRegistry::new();
        registry.register_query::<Add, _>(AddHandler).unwrap();

        let err = registry
            .register_command::<Impostor, _>(handler_fn(
                |_: Impostor, _: CancellationToken| async { Ok::<(), BoxError>(()) },
            ))
            .unwrap_err();
        assert_eq!(err, RegistrationError::DuplicateName { name: "Add" });
        assert!(!registry.contains::<Impostor>());
    }

    #[test]
    fn test_unregistered_lookup_fails() {
        let registry = HandlerRegistry::new();
        let err = registry.resolve(&Add(1, 1)).err().unwrap();
        assert!(matches!(err, DispatchError::UnregisteredHandler { name: "Add" }));
    }

    #[test]
    fn test_singleton_factory_is_called_once() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);

        let mut registry = HandlerRegistry::new();
        registry
            .register_query_with::<Add, _, _>(Lifetime::Singleton, move || {
                counter.fetch_add(1, Ordering::SeqCst);
                AddHandler
            })
            .unwrap();

        let registration = registry.registration::<Add>().unwrap();
        registration.handler();
        registration.handler();
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert_eq!(registration.lifetime(), Lifetime::Singleton);
    }

    #[test]
    fn test_transient_factory_is_called_per_resolve() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);

        let mut registry = HandlerRegistry::new();
        registry
            .register_query_with::<Add, _, _>(Lifetime::Transient, move || {
                counter.fetch_add(1, Ordering::SeqCst);
                AddHandler
            })
            .unwrap();

        registry.resolve(&Add(0, 0)).unwrap();
        registry.resolve(&Add(0, 0)).unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }
}
