use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::cart::{Cart, CartId, CartItem, CartLineView, CartView};
use crate::domain::product::ProductId;
use crate::errors::ApplicationError;
use crate::storage::StorageAdapter;

/// Cart lifecycle and item operations.
///
/// Every operation loads the cart from storage, mutates it and writes the
/// whole cart back; nothing is cached between calls.
#[derive(Clone)]
pub struct CartService {
    storage: Arc<dyn StorageAdapter>,
}

impl CartService {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    pub async fn create(&self) -> Result<Cart, ApplicationError> {
        let cart = self.storage.create_cart().await?;
        info!(event_name = "cart.created", cart_id = %cart.id, "cart created");
        Ok(cart)
    }

    pub async fn list(&self) -> Result<Vec<Cart>, ApplicationError> {
        Ok(self.storage.list_carts().await?)
    }

    pub async fn get(&self, cart_id: &CartId) -> Result<Cart, ApplicationError> {
        self.storage
            .get_cart(cart_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("cart", cart_id))
    }

    /// Cart with every item resolved to its current product record.
    pub async fn get_detailed(&self, cart_id: &CartId) -> Result<CartView, ApplicationError> {
        let cart = self.get(cart_id).await?;
        let mut items = Vec::with_capacity(cart.items.len());
        for item in cart.items {
            let product = self.storage.get_product(&item.product).await?;
            items.push(CartLineView { product_id: item.product, product, quantity: item.quantity });
        }
        Ok(CartView { id: cart.id, items })
    }

    pub async fn add_item(
        &self,
        cart_id: &CartId,
        product_id: &ProductId,
    ) -> Result<Cart, ApplicationError> {
        let mut cart = self.get(cart_id).await?;
        self.require_product(product_id).await?;

        cart.add_one(product_id.clone());
        let cart = self.storage.save_cart(cart).await?;
        debug!(
            event_name = "cart.item.added",
            cart_id = %cart_id,
            product_id = %product_id,
            "product added to cart"
        );
        Ok(cart)
    }

    pub async fn remove_item(
        &self,
        cart_id: &CartId,
        product_id: &ProductId,
    ) -> Result<Cart, ApplicationError> {
        let mut cart = self.get(cart_id).await?;
        if !cart.remove(product_id) {
            return Err(ApplicationError::not_found("cart item", product_id));
        }
        Ok(self.storage.save_cart(cart).await?)
    }

    /// Replaces the item list. References that do not resolve to a product
    /// are dropped without error; repeated references are merged.
    pub async fn set_items(
        &self,
        cart_id: &CartId,
        items: Vec<CartItem>,
    ) -> Result<Cart, ApplicationError> {
        let mut cart = self.get(cart_id).await?;
        cart.items.clear();

        for item in items {
            if self.storage.get_product(&item.product).await?.is_some() {
                cart.merge(item);
            } else {
                debug!(
                    event_name = "cart.item.dropped",
                    cart_id = %cart_id,
                    product_id = %item.product,
                    "unresolvable product reference dropped"
                );
            }
        }

        Ok(self.storage.save_cart(cart).await?)
    }

    /// Overwrites the quantity of an existing entry. The value is not
    /// range-checked here.
    pub async fn set_item_quantity(
        &self,
        cart_id: &CartId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Cart, ApplicationError> {
        let mut cart = self.get(cart_id).await?;
        let item = cart
            .item_mut(product_id)
            .ok_or_else(|| ApplicationError::not_found("cart item", product_id))?;
        item.quantity = quantity;
        Ok(self.storage.save_cart(cart).await?)
    }

    pub async fn clear(&self, cart_id: &CartId) -> Result<Cart, ApplicationError> {
        let mut cart = self.get(cart_id).await?;
        cart.items.clear();
        Ok(self.storage.save_cart(cart).await?)
    }

    async fn require_product(&self, product_id: &ProductId) -> Result<(), ApplicationError> {
        match self.storage.get_product(product_id).await? {
            Some(_) => Ok(()),
            None => Err(ApplicationError::not_found("product", product_id)),
        }
    }
}
