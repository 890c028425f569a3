//! `GetProductByCategory`: products tagged with one category.

use async_trait::async_trait;
use courier_core::{BoxError, Query, QueryHandler, Request};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::model::Product;
use crate::store::SharedStore;

/// Returns products whose category list contains `category` exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetProductByCategory {
    pub category: String,
}

impl Request for GetProductByCategory {
    type Response = GetProductByCategoryResult;
    const NAME: &'static str = "GetProductByCategory";
}

impl Query for GetProductByCategory {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetProductByCategoryResult {
    pub products: Vec<Product>,
}

pub struct GetProductByCategoryHandler {
    store: SharedStore,
}

impl GetProductByCategoryHandler {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl QueryHandler<GetProductByCategory> for GetProductByCategoryHandler {
    async fn handle(
        &self,
        query: GetProductByCategory,
        cancel: CancellationToken,
    ) -> Result<GetProductByCategoryResult, BoxError> {
        info!(?query, "GetProductByCategoryHandler called");

        let category = query.category.as_str();
        let products = self
            .store
            .query(&|product: &Product| product.in_category(category), &cancel)
            .await?;

        Ok(GetProductByCategoryResult { products })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocumentStore, InMemoryDocumentStore};
    use std::sync::Arc;
    use uuid::Uuid;

    async fn seeded() -> Arc<InMemoryDocumentStore> {
        let store = Arc::new(InMemoryDocumentStore::new());
        let cancel = CancellationToken::new();
        for (name, category) in [("Pen", "Office"), ("Lamp", "Home"), ("Desk", "Office")] {
            let product = Product {
                id: Uuid::new_v4(),
                name: name.into(),
                category: vec![category.into()],
                description: String::new(),
                image_file: "img.png".into(),
                price: 1.0,
            };
            store.store(product, &cancel).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_filters_by_exact_category() {
        let handler = GetProductByCategoryHandler::new(seeded().await);

        let result = handler
            .handle(
                GetProductByCategory {
                    category: "Office".into(),
                },
                CancellationToken::new(),
            )
            .await
            .unwrap();
        let names: Vec<_> = result.products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Pen", "Desk"]);

        let result = handler
            .handle(
                GetProductByCategory {
                    category: "office".into(),
                },
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(result.products.is_empty());
    }
}
