//! `CreateProduct`: adds a product to the catalog.

use async_trait::async_trait;
use courier_core::{BoxError, Command, CommandHandler, Request, RuleSet};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::model::Product;
use crate::store::SharedStore;

/// Creates a product and returns its generated id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProduct {
    pub name: String,
    pub category: Vec<String>,
    pub description: String,
    pub image_file: String,
    pub price: f64,
}

impl Request for CreateProduct {
    type Response = CreateProductResult;
    const NAME: &'static str = "CreateProduct";
}

impl Command for CreateProduct {}

/// The id of the created product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProductResult {
    pub id: Uuid,
}

/// Input rules for [`CreateProduct`].
pub fn rules() -> RuleSet<CreateProduct> {
    RuleSet::new()
        .not_empty("Name", |c: &CreateProduct| c.name.as_str())
        .not_empty_list("Category", |c: &CreateProduct| c.category.as_slice())
        .greater_than("Price", |c: &CreateProduct| c.price, 0.0)
}

/// Stores a new [`Product`] built from the command.
pub struct CreateProductHandler {
    store: SharedStore,
}

impl CreateProductHandler {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CommandHandler<CreateProduct> for CreateProductHandler {
    async fn handle(
        &self,
        command: CreateProduct,
        cancel: CancellationToken,
    ) -> Result<CreateProductResult, BoxError> {
        info!(?command, "CreateProductHandler called");

        let product = Product {
            id: Uuid::new_v4(),
            name: command.name,
            category: command.category,
            description: command.description,
            image_file: command.image_file,
            price: command.price,
        };
        let id = product.id;

        self.store.store(product, &cancel).await?;

        Ok(CreateProductResult { id })
    }
}

// =============================================================================
// Route boundary
// =============================================================================

/// Request body of the create-product route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub category: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_file: String,
    pub price: f64,
}

impl From<CreateProductRequest> for CreateProduct {
    fn from(request: CreateProductRequest) -> Self {
        Self {
            name: request.name,
            category: request.category,
            description: request.description,
            image_file: request.image_file,
            price: request.price,
        }
    }
}

/// Response body of the create-product route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProductResponse {
    pub id: Uuid,
}

impl CreateProductResponse {
    /// The location of the created resource.
    pub fn location(&self) -> String {
        format!("/products/{}", self.id)
    }
}

impl From<CreateProductResult> for CreateProductResponse {
    fn from(result: CreateProductResult) -> Self {
        Self { id: result.id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocumentStore, InMemoryDocumentStore};
    use std::sync::Arc;

    fn pen() -> CreateProduct {
        CreateProduct {
            name: "Pen".into(),
            category: vec!["Office".into()],
            description: "Blue ink".into(),
            image_file: "pen.png".into(),
            price: 5.0,
        }
    }

    #[test]
    fn test_rules_accept_complete_command() {
        assert!(rules().evaluate(&pen()).is_valid());
    }

    #[test]
    fn test_rules_leave_description_and_image_optional() {
        let command = CreateProduct {
            description: String::new(),
            image_file: String::new(),
            ..pen()
        };
        assert!(rules().evaluate(&command).is_valid());
    }

    #[test]
    fn test_rules_report_every_missing_field() {
        let command = CreateProduct {
            name: String::new(),
            category: vec![],
            description: String::new(),
            image_file: " ".into(),
            price: -1.0,
        };

        let outcome = rules().evaluate(&command);
        let messages: Vec<_> = outcome
            .violations()
            .iter()
            .map(|v| v.message.as_str())
            .collect();
        assert_eq!(
            messages,
            [
                "Name is required",
                "Category is required",
                "Price must be greater than 0",
            ]
        );
    }

    #[tokio::test]
    async fn test_handler_stores_product_with_generated_id() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let handler = CreateProductHandler::new(store.clone());

        let result = handler
            .handle(pen(), CancellationToken::new())
            .await
            .unwrap();

        let stored = store
            .load(result.id, &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.name, "Pen");
        assert_eq!(stored.category, ["Office"]);
    }

    #[test]
    fn test_request_and_response_mapping() {
        let request: CreateProductRequest = serde_json::from_str(
            r#"{"name":"Pen","category":["Office"],"imageFile":"pen.png","price":5}"#,
        )
        .unwrap();
        let command = CreateProduct::from(request);
        assert_eq!(command.image_file, "pen.png");
        assert!(command.description.is_empty());

        let id = Uuid::new_v4();
        let response = CreateProductResponse::from(CreateProductResult { id });
        assert_eq!(response.location(), format!("/products/{id}"));
    }
}
