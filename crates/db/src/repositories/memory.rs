use tokio::sync::RwLock;

use storefront_core::domain::cart::{Cart, CartId};
use storefront_core::domain::product::{NewProduct, Product, ProductId, ProductPatch};
use storefront_core::storage::{ProductFilter, ProductQuery, StorageAdapter, StorageError};

/// Process-local backend. Collections are kept in insertion order so listing
/// behaves exactly like the file backend.
#[derive(Default)]
pub struct InMemoryStorage {
    products: RwLock<Vec<Product>>,
    carts: RwLock<Vec<Cart>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl StorageAdapter for InMemoryStorage {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, StorageError> {
        let products = self.products.read().await;
        Ok(query.apply(products.clone()))
    }

    async fn count_products(&self, filter: &ProductFilter) -> Result<u64, StorageError> {
        let products = self.products.read().await;
        Ok(products.iter().filter(|product| filter.matches(product)).count() as u64)
    }

    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, StorageError> {
        let products = self.products.read().await;
        Ok(products.iter().find(|product| &product.id == id).cloned())
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, StorageError> {
        let product = product.into_product(ProductId::generate());
        self.products.write().await.push(product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: &ProductId,
        patch: ProductPatch,
    ) -> Result<Option<Product>, StorageError> {
        let mut products = self.products.write().await;
        Ok(products.iter_mut().find(|product| &product.id == id).map(|product| {
            patch.apply_to(product);
            product.clone()
        }))
    }

    async fn delete_product(&self, id: &ProductId) -> Result<bool, StorageError> {
        let mut products = self.products.write().await;
        let before = products.len();
        products.retain(|product| &product.id != id);
        Ok(products.len() != before)
    }

    async fn list_carts(&self) -> Result<Vec<Cart>, StorageError> {
        Ok(self.carts.read().await.clone())
    }

    async fn get_cart(&self, id: &CartId) -> Result<Option<Cart>, StorageError> {
        let carts = self.carts.read().await;
        Ok(carts.iter().find(|cart| &cart.id == id).cloned())
    }

    async fn create_cart(&self) -> Result<Cart, StorageError> {
        let cart = Cart::empty(CartId::generate());
        self.carts.write().await.push(cart.clone());
        Ok(cart)
    }

    async fn save_cart(&self, cart: Cart) -> Result<Cart, StorageError> {
        let mut carts = self.carts.write().await;
        match carts.iter_mut().find(|stored| stored.id == cart.id) {
            Some(stored) => *stored = cart.clone(),
            None => carts.push(cart.clone()),
        }
        Ok(cart)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use storefront_core::domain::cart::CartItem;
    use storefront_core::domain::product::{NewProduct, ProductId, ProductPatch, ProductStatus};
    use storefront_core::storage::{ProductFilter, StorageAdapter};

    use super::InMemoryStorage;

    fn new_product(title: &str, category: &str) -> NewProduct {
        NewProduct {
            title: title.to_string(),
            description: String::new(),
            code: title.to_uppercase(),
            price: Decimal::ONE,
            status: ProductStatus::Active,
            stock: 3,
            category: category.to_string(),
            thumbnails: Vec::new(),
        }
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_ids() {
        let storage = InMemoryStorage::new();
        let missing = ProductId::from("nope");

        let updated = storage
            .update_product(&missing, ProductPatch { stock: Some(9), ..ProductPatch::default() })
            .await
            .expect("update");
        assert!(updated.is_none());
        assert!(!storage.delete_product(&missing).await.expect("delete"));
    }

    #[tokio::test]
    async fn count_respects_filter() {
        let storage = InMemoryStorage::new();
        storage.create_product(new_product("a", "tea")).await.expect("a");
        storage.create_product(new_product("b", "coffee")).await.expect("b");

        let tea = ProductFilter { category: Some("tea".to_string()), status: None };
        assert_eq!(storage.count_products(&tea).await.expect("count"), 1);
        assert_eq!(storage.count_products(&ProductFilter::default()).await.expect("count"), 2);
    }

    #[tokio::test]
    async fn save_cart_replaces_stored_cart() {
        let storage = InMemoryStorage::new();
        let mut cart = storage.create_cart().await.expect("cart");
        cart.items.push(CartItem::new(ProductId::from("p1"), 4));
        storage.save_cart(cart.clone()).await.expect("save");

        let stored = storage.get_cart(&cart.id).await.expect("get").expect("cart exists");
        assert_eq!(stored.items, cart.items);
        assert_eq!(storage.list_carts().await.expect("list").len(), 1);
    }
}
