//! Product catalog operations: validation, paging and change broadcasts.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::domain::product::{NewProduct, Product, ProductId, ProductInput, ProductPatch};
use crate::errors::ApplicationError;
use crate::notifier::{Notifier, NotifierEvent, Subscription};
use crate::query::{PageQuery, ProductPage, DEFAULT_PAGE_SIZE};
use crate::storage::{ProductQuery, StorageAdapter};

/// Reads of the initial list before giving up on racing broadcasts.
const SUBSCRIBE_SNAPSHOT_ATTEMPTS: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CatalogSettings {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self { default_page_size: DEFAULT_PAGE_SIZE, max_page_size: 100 }
    }
}

#[derive(Clone)]
pub struct CatalogService {
    storage: Arc<dyn StorageAdapter>,
    notifier: Arc<Notifier>,
    settings: CatalogSettings,
}

impl CatalogService {
    pub fn new(storage: Arc<dyn StorageAdapter>, notifier: Arc<Notifier>) -> Self {
        Self::with_settings(storage, notifier, CatalogSettings::default())
    }

    pub fn with_settings(
        storage: Arc<dyn StorageAdapter>,
        notifier: Arc<Notifier>,
        settings: CatalogSettings,
    ) -> Self {
        Self { storage, notifier, settings }
    }

    pub fn notifier(&self) -> &Arc<Notifier> {
        &self.notifier
    }

    pub async fn list_page(
        &self,
        query: &PageQuery,
        base_path: &str,
    ) -> Result<ProductPage, ApplicationError> {
        let resolved = query.resolve(self.settings.default_page_size, self.settings.max_page_size)?;
        let products = self.storage.list_products(&resolved.storage_query()).await?;
        let total_count = self.storage.count_products(&resolved.filter()).await?;

        Ok(resolved.assemble(products, total_count, base_path))
    }

    pub async fn get_by_id(&self, id: &ProductId) -> Result<Product, ApplicationError> {
        self.storage
            .get_product(id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("product", id))
    }

    pub async fn create(&self, input: ProductInput) -> Result<Product, ApplicationError> {
        let new_product = validate_new_product(input)?;
        let product = self.storage.create_product(new_product).await?;

        info!(
            event_name = "catalog.product.created",
            product_id = %product.id,
            backend = self.storage.backend_name(),
            "product created"
        );
        self.publish_snapshot().await;
        Ok(product)
    }

    pub async fn update(
        &self,
        id: &ProductId,
        patch: ProductPatch,
    ) -> Result<Product, ApplicationError> {
        validate_patch(&patch)?;
        let product = self
            .storage
            .update_product(id, patch)
            .await?
            .ok_or_else(|| ApplicationError::not_found("product", id))?;

        info!(event_name = "catalog.product.updated", product_id = %id, "product updated");
        self.publish_snapshot().await;
        Ok(product)
    }

    pub async fn remove(&self, id: &ProductId) -> Result<(), ApplicationError> {
        if !self.storage.delete_product(id).await? {
            return Err(ApplicationError::not_found("product", id));
        }

        info!(event_name = "catalog.product.deleted", product_id = %id, "product deleted");
        self.publish_snapshot().await;
        Ok(())
    }

    /// Every product in default price order.
    pub async fn snapshot(&self) -> Result<Vec<Product>, ApplicationError> {
        Ok(self.storage.list_products(&ProductQuery::all()).await?)
    }

    /// Registers a subscriber and sends it the current product list.
    ///
    /// A broadcast queued while the list was being read is dropped and the
    /// list read again, so the first event is never older than the next.
    pub async fn subscribe(&self) -> Result<Subscription, ApplicationError> {
        let mut subscription = self.notifier.subscribe();
        for attempt in 1..=SUBSCRIBE_SNAPSHOT_ATTEMPTS {
            let products = match self.snapshot().await {
                Ok(products) => products,
                Err(error) => {
                    self.notifier.unsubscribe(subscription.id);
                    return Err(error);
                }
            };

            if attempt == SUBSCRIBE_SNAPSHOT_ATTEMPTS {
                self.notifier.send_to(subscription.id, NotifierEvent::Products(products));
                break;
            }
            if self.notifier.send_initial(&subscription, products) {
                break;
            }
            while subscription.receiver.try_recv().is_ok() {}
        }
        Ok(subscription)
    }

    async fn publish_snapshot(&self) {
        match self.snapshot().await {
            Ok(products) => {
                self.notifier.broadcast(products);
            }
            Err(error) => {
                warn!(
                    event_name = "catalog.broadcast.skipped",
                    error = %error,
                    "could not read product snapshot for broadcast"
                );
            }
        }
    }
}

/// Blank values count as missing; accepted values are kept exactly as sent.
fn required_text(
    value: Option<String>,
    field: &'static str,
    missing: &mut Vec<&'static str>,
) -> String {
    match value.filter(|value| !value.trim().is_empty()) {
        Some(value) => value,
        None => {
            missing.push(field);
            String::new()
        }
    }
}

pub fn validate_new_product(input: ProductInput) -> Result<NewProduct, ApplicationError> {
    let mut missing = Vec::new();
    let title = required_text(input.title, "title", &mut missing);
    let description = required_text(input.description, "description", &mut missing);
    let code = required_text(input.code, "code", &mut missing);
    let category = required_text(input.category, "category", &mut missing);
    if input.price.is_none() {
        missing.push("price");
    }
    if input.stock.is_none() {
        missing.push("stock");
    }
    if !missing.is_empty() {
        return Err(ApplicationError::validation(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    }

    let price = input.price.unwrap_or_default();
    if price < Decimal::ZERO {
        return Err(ApplicationError::validation("price must be a non-negative number"));
    }
    let stock = input
        .stock
        .and_then(|stock| u32::try_from(stock).ok())
        .ok_or_else(|| ApplicationError::validation("stock must be a non-negative integer"))?;

    Ok(NewProduct {
        title,
        description,
        code,
        price,
        status: input.status.unwrap_or_default(),
        stock,
        category,
        thumbnails: input.thumbnails.unwrap_or_default(),
    })
}

fn validate_patch(patch: &ProductPatch) -> Result<(), ApplicationError> {
    if let Some(price) = patch.price {
        if price < Decimal::ZERO {
            return Err(ApplicationError::validation("price must be a non-negative number"));
        }
    }

    let blank = [
        ("title", &patch.title),
        ("description", &patch.description),
        ("code", &patch.code),
        ("category", &patch.category),
    ]
    .into_iter()
    .find(|(_, value)| value.as_ref().is_some_and(|value| value.trim().is_empty()));
    if let Some((field, _)) = blank {
        return Err(ApplicationError::validation(format!("{field} must not be blank")));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::validate_new_product;
    use crate::domain::product::{ProductInput, ProductStatus};

    fn complete_input() -> ProductInput {
        ProductInput {
            title: Some("Termo".to_string()),
            description: Some("Acero 1L".to_string()),
            code: Some("TR-100".to_string()),
            price: Some(Decimal::new(4599, 2)),
            status: None,
            stock: Some(12),
            category: Some("kitchen".to_string()),
            thumbnails: None,
        }
    }

    #[test]
    fn complete_input_validates_with_defaults() {
        let product = validate_new_product(complete_input()).expect("valid input");

        assert_eq!(product.status, ProductStatus::Active);
        assert!(product.thumbnails.is_empty());
        assert_eq!(product.stock, 12);
    }

    #[test]
    fn accepted_text_is_not_trimmed() {
        let product = validate_new_product(ProductInput {
            title: Some("  Termo  ".to_string()),
            category: Some(" kitchen".to_string()),
            ..complete_input()
        })
        .expect("padded text is not blank");

        assert_eq!(product.title, "  Termo  ");
        assert_eq!(product.category, " kitchen");
        assert_eq!(product.description, "Acero 1L");
    }

    #[test]
    fn missing_fields_are_listed_in_the_error() {
        let error = validate_new_product(ProductInput {
            title: Some("   ".to_string()),
            price: None,
            ..complete_input()
        })
        .expect_err("should reject");

        assert!(error.is_validation());
        assert_eq!(error.to_string(), "validation failed: missing required fields: title, price");
    }

    #[test]
    fn negative_numbers_are_rejected() {
        let negative_price = validate_new_product(ProductInput {
            price: Some(Decimal::new(-1, 0)),
            ..complete_input()
        });
        let negative_stock =
            validate_new_product(ProductInput { stock: Some(-3), ..complete_input() });

        assert!(negative_price.is_err_and(|error| error.is_validation()));
        assert!(negative_stock.is_err_and(|error| error.is_validation()));
    }

    #[test]
    fn zero_price_and_stock_are_accepted() {
        let product = validate_new_product(ProductInput {
            price: Some(Decimal::ZERO),
            stock: Some(0),
            ..complete_input()
        })
        .expect("zero is non-negative");

        assert_eq!(product.price, Decimal::ZERO);
        assert_eq!(product.stock, 0);
    }
}
