use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::product::{Product, ProductId};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartId(pub String);

impl CartId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for CartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CartId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

fn default_quantity() -> u32 {
    1
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

impl CartItem {
    pub fn new(product: ProductId, quantity: u32) -> Self {
        Self { product, quantity }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    #[serde(default)]
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn empty(id: CartId) -> Self {
        Self { id, items: Vec::new() }
    }

    pub fn item(&self, product_id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| &item.product == product_id)
    }

    pub fn item_mut(&mut self, product_id: &ProductId) -> Option<&mut CartItem> {
        self.items.iter_mut().find(|item| &item.product == product_id)
    }

    /// Adds one unit of `product_id`, merging into an existing entry.
    pub fn add_one(&mut self, product_id: ProductId) {
        match self.item_mut(&product_id) {
            Some(item) => item.quantity = item.quantity.saturating_add(1),
            None => self.items.push(CartItem::new(product_id, 1)),
        }
    }

    /// Removes the entry for `product_id`. Returns `false` when it was absent.
    pub fn remove(&mut self, product_id: &ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| &item.product != product_id);
        self.items.len() != before
    }

    /// Appends `item`, summing quantities when the product is already present.
    pub fn merge(&mut self, item: CartItem) {
        match self.item_mut(&item.product) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity),
            None => self.items.push(item),
        }
    }
}

/// Cart with each item resolved against the catalog. `product` is `None` when
/// the referenced product has since been deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub id: CartId,
    pub items: Vec<CartLineView>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub product: Option<Product>,
    pub quantity: u32,
}
