//! Product catalog service built on the Courier mediator.
//!
//! The catalog exposes one command and three queries:
//!
//! | Message | Kind | Response |
//! |---------|------|----------|
//! | [`CreateProduct`] | command | [`CreateProductResult`] |
//! | [`GetProducts`] | query | [`GetProductsResult`] |
//! | [`GetProductByCategory`] | query | [`GetProductByCategoryResult`] |
//! | [`GetProductById`] | query | [`GetProductByIdResult`] |
//!
//! Handlers are bound to a [`MediatorBuilder`] with [`install`]. Products
//! live in a [`DocumentStore`]; [`InMemoryDocumentStore`] is the bundled
//! implementation.
//!
//! ```rust,ignore
//! let mediator = install(Mediator::builder().validation(), InMemoryDocumentStore::shared())?
//!     .build();
//!
//! let created = mediator.send_default(CreateProduct { .. }).await?;
//! ```

pub mod error;
pub mod model;
pub mod products;
pub mod store;

use courier_core::{MediatorBuilder, RegistrationError};

pub use error::{CatalogError, StoreError, StoreResult};
pub use model::Product;
pub use products::*;
pub use store::{DocumentStore, InMemoryDocumentStore, ProductFilter, SharedStore};

/// Binds every catalog handler to `builder` and attaches the catalog's
/// input rules.
///
/// Handlers are created with the builder's configured lifetime and share
/// `store`. The rules only take effect when the builder carries the
/// validation stage.
pub fn install(
    builder: MediatorBuilder,
    store: SharedStore,
) -> Result<MediatorBuilder, RegistrationError> {
    let lifetime = builder.lifetime();

    let create = store.clone();
    let list = store.clone();
    let by_category = store.clone();
    let by_id = store;

    let builder = builder
        .command_with::<CreateProduct, _, _>(lifetime, move || {
            CreateProductHandler::new(create.clone())
        })?
        .query_with::<GetProducts, _, _>(lifetime, move || GetProductsHandler::new(list.clone()))?
        .query_with::<GetProductByCategory, _, _>(lifetime, move || {
            GetProductByCategoryHandler::new(by_category.clone())
        })?
        .query_with::<GetProductById, _, _>(lifetime, move || {
            GetProductByIdHandler::new(by_id.clone())
        })?
        .rules(create_product::rules());

    tracing::debug!(?lifetime, "Installed catalog handlers");
    Ok(builder)
}
