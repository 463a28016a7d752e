//! Flat-file backend.
//!
//! Products and carts live in two independent JSON arrays. Every mutation
//! reads the whole file, changes it in memory and rewrites the whole file.
//! Writers are not serialized: two interleaved mutations both read the same
//! starting state and the later write wins, dropping the other change.
//!
//! Reads never fail. A missing, unreadable or malformed file is treated as
//! an empty collection and logged; the next successful write replaces it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use storefront_core::domain::cart::{Cart, CartId};
use storefront_core::domain::product::{NewProduct, Product, ProductId, ProductPatch};
use storefront_core::storage::{ProductFilter, ProductQuery, StorageAdapter, StorageError};

pub const PRODUCTS_FILE: &str = "products.json";
pub const CARTS_FILE: &str = "carts.json";

#[derive(Clone, Debug)]
pub struct FileStorage {
    products_path: PathBuf,
    carts_path: PathBuf,
}

impl FileStorage {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self::with_paths(data_dir.join(PRODUCTS_FILE), data_dir.join(CARTS_FILE))
    }

    pub fn with_paths(products_path: impl Into<PathBuf>, carts_path: impl Into<PathBuf>) -> Self {
        Self { products_path: products_path.into(), carts_path: carts_path.into() }
    }

    pub fn products_path(&self) -> &Path {
        &self.products_path
    }

    pub fn carts_path(&self) -> &Path {
        &self.carts_path
    }

    async fn read_products(&self) -> Vec<Product> {
        read_collection(&self.products_path).await
    }

    async fn read_carts(&self) -> Vec<Cart> {
        read_collection(&self.carts_path).await
    }
}

async fn read_collection<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(error) if error.kind() == ErrorKind::NotFound => {
            debug!(
                event_name = "storage.file.missing",
                path = %path.display(),
                "data file not found, treating as empty"
            );
            return Vec::new();
        }
        Err(error) => {
            warn!(
                event_name = "storage.file.read_degraded",
                path = %path.display(),
                error = %error,
                "data file unreadable, treating as empty"
            );
            return Vec::new();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(items) => items,
        Err(error) => {
            warn!(
                event_name = "storage.file.read_degraded",
                path = %path.display(),
                error = %error,
                "data file is not a valid JSON array, treating as empty"
            );
            Vec::new()
        }
    }
}

async fn write_collection<T: Serialize>(path: &Path, items: &[T]) -> Result<(), StorageError> {
    let io_error =
        |source: std::io::Error| StorageError::Io { path: path.display().to_string(), source };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
    }
    let body = serde_json::to_string_pretty(items)
        .map_err(|error| StorageError::Serialization(error.to_string()))?;
    tokio::fs::write(path, body).await.map_err(io_error)
}

#[async_trait::async_trait]
impl StorageAdapter for FileStorage {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, StorageError> {
        Ok(query.apply(self.read_products().await))
    }

    async fn count_products(&self, filter: &ProductFilter) -> Result<u64, StorageError> {
        let products = self.read_products().await;
        Ok(products.iter().filter(|product| filter.matches(product)).count() as u64)
    }

    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, StorageError> {
        Ok(self.read_products().await.into_iter().find(|product| &product.id == id))
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, StorageError> {
        let mut products = self.read_products().await;
        let product = product.into_product(ProductId::generate());
        products.push(product.clone());
        write_collection(&self.products_path, &products).await?;
        Ok(product)
    }

    async fn update_product(
        &self,
        id: &ProductId,
        patch: ProductPatch,
    ) -> Result<Option<Product>, StorageError> {
        let mut products = self.read_products().await;
        let Some(product) = products.iter_mut().find(|product| &product.id == id) else {
            return Ok(None);
        };
        patch.apply_to(product);
        let updated = product.clone();
        write_collection(&self.products_path, &products).await?;
        Ok(Some(updated))
    }

    async fn delete_product(&self, id: &ProductId) -> Result<bool, StorageError> {
        let mut products = self.read_products().await;
        let before = products.len();
        products.retain(|product| &product.id != id);
        if products.len() == before {
            return Ok(false);
        }
        write_collection(&self.products_path, &products).await?;
        Ok(true)
    }

    async fn list_carts(&self) -> Result<Vec<Cart>, StorageError> {
        Ok(self.read_carts().await)
    }

    async fn get_cart(&self, id: &CartId) -> Result<Option<Cart>, StorageError> {
        Ok(self.read_carts().await.into_iter().find(|cart| &cart.id == id))
    }

    async fn create_cart(&self) -> Result<Cart, StorageError> {
        let mut carts = self.read_carts().await;
        let cart = Cart::empty(CartId::generate());
        carts.push(cart.clone());
        write_collection(&self.carts_path, &carts).await?;
        Ok(cart)
    }

    async fn save_cart(&self, cart: Cart) -> Result<Cart, StorageError> {
        let mut carts = self.read_carts().await;
        match carts.iter_mut().find(|stored| stored.id == cart.id) {
            Some(stored) => *stored = cart.clone(),
            None => carts.push(cart.clone()),
        }
        write_collection(&self.carts_path, &carts).await?;
        Ok(cart)
    }
}
