use std::collections::HashSet;

use rust_decimal::Decimal;
use storefront_core::domain::product::{NewProduct, ProductStatus};
use storefront_core::storage::{ProductQuery, StorageAdapter, StorageError};

struct DemoProduct {
    title: &'static str,
    description: &'static str,
    code: &'static str,
    /// Price in cents.
    price_cents: i64,
    status: ProductStatus,
    stock: u32,
    category: &'static str,
}

const DEMO_PRODUCTS: &[DemoProduct] = &[
    DemoProduct {
        title: "Yerba Mate Clasica",
        description: "Traditional cut, 1kg pack",
        code: "DEMO-MATE-001",
        price_cents: 4_500,
        status: ProductStatus::Active,
        stock: 40,
        category: "infusions",
    },
    DemoProduct {
        title: "Green Tea Sencha",
        description: "Loose leaf, 250g tin",
        code: "DEMO-TEA-002",
        price_cents: 3_200,
        status: ProductStatus::Active,
        stock: 25,
        category: "infusions",
    },
    DemoProduct {
        title: "Ceramic Mug",
        description: "350ml, dishwasher safe",
        code: "DEMO-MUG-003",
        price_cents: 1_250,
        status: ProductStatus::Active,
        stock: 60,
        category: "tableware",
    },
    DemoProduct {
        title: "Bombilla Steel Straw",
        description: "Stainless steel filter straw",
        code: "DEMO-STRAW-004",
        price_cents: 900,
        status: ProductStatus::Active,
        stock: 0,
        category: "accessories",
    },
    DemoProduct {
        title: "Gourd Gift Set",
        description: "Calabash gourd with straw and case",
        code: "DEMO-GIFT-005",
        price_cents: 8_900,
        status: ProductStatus::Inactive,
        stock: 5,
        category: "accessories",
    },
];

/// Deterministic demo catalog used by `storefront seed` and local smoke runs.
///
/// Products are matched by `code` because identifiers are generated on insert.
pub struct DemoCatalog;

impl DemoCatalog {
    pub fn products() -> Vec<NewProduct> {
        DEMO_PRODUCTS
            .iter()
            .map(|demo| NewProduct {
                title: demo.title.to_string(),
                description: demo.description.to_string(),
                code: demo.code.to_string(),
                price: Decimal::new(demo.price_cents, 2),
                status: demo.status,
                stock: demo.stock,
                category: demo.category.to_string(),
                thumbnails: Vec::new(),
            })
            .collect()
    }

    /// Inserts every demo product whose code is not already stored.
    pub async fn load(storage: &dyn StorageAdapter) -> Result<SeedResult, StorageError> {
        let existing = stored_codes(storage).await?;
        let mut inserted = Vec::new();
        let mut skipped = Vec::new();

        for product in Self::products() {
            if existing.contains(&product.code) {
                skipped.push(product.code);
                continue;
            }
            let created = storage.create_product(product).await?;
            inserted.push(created.code);
        }

        Ok(SeedResult { inserted, skipped })
    }

    pub async fn verify(storage: &dyn StorageAdapter) -> Result<VerificationResult, StorageError> {
        let existing = stored_codes(storage).await?;
        let checks: Vec<(&'static str, bool)> =
            DEMO_PRODUCTS.iter().map(|demo| (demo.code, existing.contains(demo.code))).collect();
        let all_present = checks.iter().all(|(_, present)| *present);
        Ok(VerificationResult { all_present, checks })
    }
}

async fn stored_codes(storage: &dyn StorageAdapter) -> Result<HashSet<String>, StorageError> {
    let products = storage.list_products(&ProductQuery::all()).await?;
    Ok(products.into_iter().map(|product| product.code).collect())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedResult {
    pub inserted: Vec<String>,
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use storefront_core::storage::{ProductQuery, StorageAdapter};

    use super::DemoCatalog;
    use crate::repositories::InMemoryStorage;

    #[tokio::test]
    async fn load_is_idempotent() {
        let storage = InMemoryStorage::new();

        let first = DemoCatalog::load(&storage).await.expect("first load");
        assert_eq!(first.inserted.len(), DemoCatalog::products().len());
        assert!(first.skipped.is_empty());

        let second = DemoCatalog::load(&storage).await.expect("second load");
        assert!(second.inserted.is_empty());
        assert_eq!(second.skipped.len(), DemoCatalog::products().len());

        let stored = storage.list_products(&ProductQuery::all()).await.expect("list");
        assert_eq!(stored.len(), DemoCatalog::products().len());
    }

    #[tokio::test]
    async fn verify_reports_missing_codes() {
        let storage = InMemoryStorage::new();
        let before = DemoCatalog::verify(&storage).await.expect("verify empty");
        assert!(!before.all_present);
        assert!(before.checks.iter().all(|(_, present)| !present));

        DemoCatalog::load(&storage).await.expect("load");
        let after = DemoCatalog::verify(&storage).await.expect("verify loaded");
        assert!(after.all_present);
    }

    #[test]
    fn demo_catalog_has_unique_codes() {
        let products = DemoCatalog::products();
        let mut codes: Vec<_> = products.iter().map(|product| product.code.as_str()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), products.len());
    }
}
