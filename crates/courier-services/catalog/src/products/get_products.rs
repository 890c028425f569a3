//! `GetProducts`: lists the whole catalog.

use async_trait::async_trait;
use courier_core::{BoxError, Query, QueryHandler, Request};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::model::Product;
use crate::store::SharedStore;

/// Returns every product, in store order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetProducts;

impl Request for GetProducts {
    type Response = GetProductsResult;
    const NAME: &'static str = "GetProducts";
}

impl Query for GetProducts {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetProductsResult {
    pub products: Vec<Product>,
}

pub struct GetProductsHandler {
    store: SharedStore,
}

impl GetProductsHandler {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl QueryHandler<GetProducts> for GetProductsHandler {
    async fn handle(
        &self,
        query: GetProducts,
        cancel: CancellationToken,
    ) -> Result<GetProductsResult, BoxError> {
        info!(?query, "GetProductsHandler called");

        let products = self.store.query(&|_: &Product| true, &cancel).await?;

        Ok(GetProductsResult { products })
    }
}

/// Response body of the list-products route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetProductsResponse {
    pub products: Vec<Product>,
}

impl From<GetProductsResult> for GetProductsResponse {
    fn from(result: GetProductsResult) -> Self {
        Self {
            products: result.products,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocumentStore, InMemoryDocumentStore};
    use std::sync::Arc;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_empty_store_yields_empty_list() {
        let handler = GetProductsHandler::new(InMemoryDocumentStore::shared());
        let result = handler
            .handle(GetProducts, CancellationToken::new())
            .await
            .unwrap();
        assert!(result.products.is_empty());
    }

    #[tokio::test]
    async fn test_lists_every_product() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let cancel = CancellationToken::new();
        for name in ["Pen", "Desk"] {
            let product = Product {
                id: Uuid::new_v4(),
                name: name.into(),
                category: vec!["Office".into()],
                description: String::new(),
                image_file: format!("{}.png", name.to_lowercase()),
                price: 1.0,
            };
            store.store(product, &cancel).await.unwrap();
        }

        let handler = GetProductsHandler::new(store);
        let response = GetProductsResponse::from(handler.handle(GetProducts, cancel).await.unwrap());
        let names: Vec<_> = response.products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Pen", "Desk"]);
    }
}
