//! Initial product list delivery when a change lands while it is being read.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use storefront_core::domain::cart::{Cart, CartId};
use storefront_core::domain::product::{
    NewProduct, Product, ProductId, ProductPatch, ProductStatus,
};
use storefront_core::notifier::NotifierEvent;
use storefront_core::storage::{ProductFilter, ProductQuery, StorageAdapter, StorageError};
use storefront_core::{CatalogService, Notifier};
use storefront_db::InMemoryStorage;

/// Broadcasts an outdated list during the first product read, standing in for
/// a concurrent write whose broadcast reaches the new subscriber mid-read.
struct InterleavedStorage {
    inner: InMemoryStorage,
    notifier: Arc<Notifier>,
    interleaved: AtomicBool,
}

#[async_trait]
impl StorageAdapter for InterleavedStorage {
    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, StorageError> {
        let products = self.inner.list_products(query).await?;
        if !self.interleaved.swap(true, Ordering::SeqCst) {
            self.notifier.broadcast(Vec::new());
        }
        Ok(products)
    }

    async fn count_products(&self, filter: &ProductFilter) -> Result<u64, StorageError> {
        self.inner.count_products(filter).await
    }

    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, StorageError> {
        self.inner.get_product(id).await
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, StorageError> {
        self.inner.create_product(product).await
    }

    async fn update_product(
        &self,
        id: &ProductId,
        patch: ProductPatch,
    ) -> Result<Option<Product>, StorageError> {
        self.inner.update_product(id, patch).await
    }

    async fn delete_product(&self, id: &ProductId) -> Result<bool, StorageError> {
        self.inner.delete_product(id).await
    }

    async fn list_carts(&self) -> Result<Vec<Cart>, StorageError> {
        self.inner.list_carts().await
    }

    async fn get_cart(&self, id: &CartId) -> Result<Option<Cart>, StorageError> {
        self.inner.get_cart(id).await
    }

    async fn create_cart(&self) -> Result<Cart, StorageError> {
        self.inner.create_cart().await
    }

    async fn save_cart(&self, cart: Cart) -> Result<Cart, StorageError> {
        self.inner.save_cart(cart).await
    }
}

#[tokio::test]
async fn racing_broadcast_does_not_follow_a_newer_initial_list() -> Result<(), String> {
    let inner = InMemoryStorage::new();
    let existing = inner
        .create_product(NewProduct {
            title: "Yerba".to_string(),
            description: "1kg".to_string(),
            code: "YB-1".to_string(),
            price: Decimal::new(3200, 2),
            status: ProductStatus::Active,
            stock: 4,
            category: "food".to_string(),
            thumbnails: Vec::new(),
        })
        .await
        .map_err(|error| error.to_string())?;

    let notifier = Arc::new(Notifier::new());
    let storage = InterleavedStorage {
        inner,
        notifier: notifier.clone(),
        interleaved: AtomicBool::new(false),
    };
    let catalog = CatalogService::new(Arc::new(storage), notifier);

    let mut subscription = catalog.subscribe().await.map_err(|error| error.to_string())?;

    match subscription.receiver.try_recv() {
        Ok(NotifierEvent::Products(products)) => {
            let ids: Vec<_> = products.into_iter().map(|product| product.id).collect();
            if ids != vec![existing.id] {
                return Err(format!("unexpected initial list: {ids:?}"));
            }
        }
        other => return Err(format!("expected the initial list, got {other:?}")),
    }
    if let Ok(event) = subscription.receiver.try_recv() {
        return Err(format!("nothing should follow the initial list, got {event:?}"));
    }
    Ok(())
}
