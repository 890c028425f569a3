//! Product commands and queries, one module per message.

pub mod create_product;
pub mod get_product_by_category;
pub mod get_product_by_id;
pub mod get_products;

pub use create_product::{
    CreateProduct, CreateProductHandler, CreateProductRequest, CreateProductResponse,
    CreateProductResult,
};
pub use get_product_by_category::{
    GetProductByCategory, GetProductByCategoryHandler, GetProductByCategoryResult,
};
pub use get_product_by_id::{GetProductById, GetProductByIdHandler, GetProductByIdResult};
pub use get_products::{GetProducts, GetProductsHandler, GetProductsResponse, GetProductsResult};
