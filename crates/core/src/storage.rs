//! Storage port shared by every persistence backend.
//!
//! Backends live in `storefront-db`; services only ever see
//! `Arc<dyn StorageAdapter>` and never branch on which backend is behind it.

use std::cmp::Ordering;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::cart::{Cart, CartId};
use crate::domain::product::{NewProduct, Product, ProductId, ProductPatch, ProductStatus};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage i/o failure on `{path}`: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("serialization failure: {0}")]
    Serialization(String),
    #[error("backend failure: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StorageError {
    pub fn backend(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(error))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn compare(&self, left: &Product, right: &Product) -> Ordering {
        match self {
            Self::Asc => left.price.cmp(&right.price),
            Self::Desc => right.price.cmp(&left.price),
        }
    }
}

/// Exact-match predicate over products. Empty fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub status: Option<ProductStatus>,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        let category_ok =
            self.category.as_ref().map(|category| &product.category == category).unwrap_or(true);
        let status_ok = self.status.map(|status| product.status == status).unwrap_or(true);
        category_ok && status_ok
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub filter: ProductFilter,
    pub sort: SortOrder,
    pub skip: u64,
    /// `None` returns every matching record.
    pub limit: Option<u64>,
}

impl ProductQuery {
    pub fn all() -> Self {
        Self::default()
    }

    /// Applies filter, stable price sort and offset pagination to an
    /// already-loaded collection in insertion order.
    pub fn apply(&self, products: Vec<Product>) -> Vec<Product> {
        let mut matching: Vec<Product> =
            products.into_iter().filter(|product| self.filter.matches(product)).collect();
        matching.sort_by(|left, right| self.sort.compare(left, right));

        let skip = usize::try_from(self.skip).unwrap_or(usize::MAX);
        let take = self.limit.and_then(|limit| usize::try_from(limit).ok()).unwrap_or(usize::MAX);
        matching.into_iter().skip(skip).take(take).collect()
    }
}

#[async_trait]
pub trait StorageAdapter: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, StorageError>;
    async fn count_products(&self, filter: &ProductFilter) -> Result<u64, StorageError>;
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, StorageError>;
    async fn create_product(&self, product: NewProduct) -> Result<Product, StorageError>;
    async fn update_product(
        &self,
        id: &ProductId,
        patch: ProductPatch,
    ) -> Result<Option<Product>, StorageError>;
    /// Returns `false` when no product had the identifier.
    async fn delete_product(&self, id: &ProductId) -> Result<bool, StorageError>;

    async fn list_carts(&self) -> Result<Vec<Cart>, StorageError>;
    async fn get_cart(&self, id: &CartId) -> Result<Option<Cart>, StorageError>;
    async fn create_cart(&self) -> Result<Cart, StorageError>;
    async fn save_cart(&self, cart: Cart) -> Result<Cart, StorageError>;
}
