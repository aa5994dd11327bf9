//! Cache types for catalog responses.

use digistore_core::{Category, CategoryId, Product};

/// Cache key for product and category lists.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Products { category: Option<CategoryId> },
    Categories,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(Vec<Product>),
    Categories(Vec<Category>),
}
