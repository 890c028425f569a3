//! `GetProductById`: a single product.

use async_trait::async_trait;
use courier_core::{BoxError, Query, QueryHandler, Request};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::error::CatalogError;
use crate::model::Product;
use crate::store::SharedStore;

/// Returns the product with `id`, or fails with
/// [`CatalogError::ProductNotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetProductById {
    pub id: Uuid,
}

impl Request for GetProductById {
    type Response = GetProductByIdResult;
    const NAME: &'static str = "GetProductById";
}

impl Query for GetProductById {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetProductByIdResult {
    pub product: Product,
}

pub struct GetProductByIdHandler {
    store: SharedStore,
}

impl GetProductByIdHandler {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl QueryHandler<GetProductById> for GetProductByIdHandler {
    async fn handle(
        &self,
        query: GetProductById,
        cancel: CancellationToken,
    ) -> Result<GetProductByIdResult, BoxError> {
        info!(?query, "GetProductByIdHandler called");

        let product = self
            .store
            .load(query.id, &cancel)
            .await?
            .ok_or(CatalogError::ProductNotFound(query.id))?;

        Ok(GetProductByIdResult { product })
    }
}
