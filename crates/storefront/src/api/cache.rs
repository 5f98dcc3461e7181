//! Cache types for catalogue responses.

use aether_core::ProductId;

use super::types::{Banner, Category, Product};

/// Cache key for catalogue reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Categories,
    Banners,
    Products { page: u32, limit: u32 },
    Product(ProductId),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Categories(Vec<Category>),
    Banners(Vec<Banner>),
    Products(Vec<Product>),
    Product(Box<Product>),
}
