//! Catalog domain model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A product in the catalog. A product may belong to several categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub category: Vec<String>,
    pub description: String,
    pub image_file: String,
    pub price: f64,
}

impl Product {
    /// Returns `true` if `category` is one of the product's categories.
    ///
    /// Matching is exact and case-sensitive.
    pub fn in_category(&self, category: &str) -> bool {
        self.category.iter().any(|c| c == category)
    }
}
