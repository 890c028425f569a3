//! Document store collaborator.
//!
//! Handlers persist and read products through the [`DocumentStore`] trait and
//! never see the storage technology behind it. [`InMemoryDocumentStore`] is
//! the bundled implementation.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::model::Product;

/// A predicate selecting products in [`DocumentStore::query`].
pub type ProductFilter<'a> = &'a (dyn Fn(&Product) -> bool + Send + Sync);

/// Persistence for catalog documents.
///
/// Implementations handle their own synchronisation.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Inserts or replaces `product`.
    async fn store(&self, product: Product, cancel: &CancellationToken) -> StoreResult<()>;

    /// Returns every product matching `filter`, in insertion order.
    async fn query(
        &self,
        filter: ProductFilter<'_>,
        cancel: &CancellationToken,
    ) -> StoreResult<Vec<Product>>;

    /// Loads the product with `id`.
    async fn load(&self, id: Uuid, cancel: &CancellationToken) -> StoreResult<Option<Product>>;
}

/// A shared document store handle.
pub type SharedStore = Arc<dyn DocumentStore>;

#[derive(Default)]
struct Documents {
    order: Vec<Uuid>,
    products: HashMap<Uuid, Product>,
}

/// An in-process [`DocumentStore`].
///
/// The store can be switched offline with [`set_available`](Self::set_available),
/// after which every operation fails with [`StoreError::Unavailable`].
#[derive(Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<Documents>,
    offline: AtomicBool,
}

impl InMemoryDocumentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store behind a [`SharedStore`] handle.
    pub fn shared() -> SharedStore {
        Arc::new(Self::new())
    }

    /// Marks the store as reachable or unreachable.
    pub fn set_available(&self, available: bool) {
        self.offline.store(!available, Ordering::SeqCst);
    }

    /// Returns the number of stored products.
    pub fn len(&self) -> usize {
        self.documents.read().products.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.documents.read().products.is_empty()
    }

    fn check(&self, cancel: &CancellationToken) -> StoreResult<()> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store is offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn store(&self, product: Product, cancel: &CancellationToken) -> StoreResult<()> {
        self.check(cancel)?;
        let mut documents = self.documents.write();
        let id = product.id;
        if documents.products.insert(id, product).is_none() {
            documents.order.push(id);
        }
        debug!(%id, "Stored product");
        Ok(())
    }

    async fn query(
        &self,
        filter: ProductFilter<'_>,
        cancel: &CancellationToken,
    ) -> StoreResult<Vec<Product>> {
        self.check(cancel)?;
        let documents = self.documents.read();
        let products: Vec<Product> = documents
            .order
            .iter()
            .filter_map(|id| documents.products.get(id))
            .filter(|product| filter(product))
            .cloned()
            .collect();
        trace!(matched = products.len(), "Queried products");
        Ok(products)
    }

    async fn load(&self, id: Uuid, cancel: &CancellationToken) -> StoreResult<Option<Product>> {
        self.check(cancel)?;
        Ok(self.documents.read().products.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, category: &[&str]) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            category: category.iter().map(|c| c.to_string()).collect(),
            description: String::new(),
            image_file: format!("{name}.png"),
            price: 1.0,
        }
    }

    #[tokio::test]
    async fn test_query_keeps_insertion_order() {
        let store = InMemoryDocumentStore::new();
        let cancel = CancellationToken::new();
        for name in ["c", "a", "b"] {
            store.store(product(name, &["X"]), &cancel).await.unwrap();
        }

        let names: Vec<_> = store
            .query(&|_: &Product| true, &cancel)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, ["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_store_replaces_existing_document() {
        let store = InMemoryDocumentStore::new();
        let cancel = CancellationToken::new();
        let mut pen = product("Pen", &["Office"]);
        store.store(pen.clone(), &cancel).await.unwrap();

        pen.price = 2.5;
        store.store(pen.clone(), &cancel).await.unwrap();

        assert_eq!(store.len(), 1);
        let loaded = store.load(pen.id, &cancel).await.unwrap().unwrap();
        assert_eq!(loaded.price, 2.5);
    }

    #[tokio::test]
    async fn test_offline_and_cancelled_operations_fail() {
        let store = InMemoryDocumentStore::new();
        store.set_available(false);
        let err = store
            .load(Uuid::new_v4(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));

        store.set_available(true);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = store.store(product("Pen", &[]), &cancel).await.unwrap_err();
        assert_eq!(err, StoreError::Cancelled);
        assert!(store.is_empty());
    }
}
