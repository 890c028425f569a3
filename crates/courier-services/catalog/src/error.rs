//! Catalog error types.

use thiserror::Error;
use uuid::Uuid;

/// Failures of the document store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store cannot be reached.
    #[error("Document store unavailable: {0}")]
    Unavailable(String),

    /// The caller cancelled the operation before it completed.
    #[error("Document store operation cancelled")]
    Cancelled,
}

/// Failures of catalog handlers that are not storage failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// No product with this id exists.
    #[error("Product not found: {0}")]
    ProductNotFound(Uuid),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
