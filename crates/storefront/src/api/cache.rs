//! Cache types for catalog responses.
//!
//! Only read-only catalog data is cached. Carts and customers always go to
//! the backend.

use mystery_box_core::{Category, Collection, Product};

use super::types::{CategoryList, CollectionList, ProductList};

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(String),
    ProductByHandle(String),
    Products(String),
    Category(String),
    Categories,
    Collection(String),
    Collections,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(ProductList),
    Category(Category),
    Categories(CategoryList),
    Collection(Collection),
    Collections(CollectionList),
}
