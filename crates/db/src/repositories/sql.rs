use std::str::FromStr;

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{QueryBuilder, Row, Sqlite};

use storefront_core::domain::cart::{Cart, CartId, CartItem};
use storefront_core::domain::product::{
    NewProduct, Product, ProductId, ProductPatch, ProductStatus,
};
use storefront_core::storage::{
    ProductFilter, ProductQuery, SortOrder, StorageAdapter, StorageError,
};

use crate::DbPool;

const PRODUCT_COLUMNS: &str = "SELECT id, title, description, code, price, status, stock, \
                               category, thumbnails_json FROM product";

/// Integer digits of the largest `Decimal` mantissa.
const KEY_INTEGER_DIGITS: usize = 29;
/// Maximum `Decimal` scale.
const KEY_FRACTION_DIGITS: usize = 28;

pub struct SqlStorage {
    pool: DbPool,
}

impl SqlStorage {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn db_error(error: sqlx::Error) -> StorageError {
    StorageError::backend(error)
}

fn decode_error(column: &str, detail: impl std::fmt::Display) -> StorageError {
    StorageError::Serialization(format!("column `{column}`: {detail}"))
}

fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product, StorageError> {
    let id: String = row.try_get("id").map_err(db_error)?;
    let title: String = row.try_get("title").map_err(db_error)?;
    let description: String = row.try_get("description").map_err(db_error)?;
    let code: String = row.try_get("code").map_err(db_error)?;
    let price_str: String = row.try_get("price").map_err(db_error)?;
    let status_str: String = row.try_get("status").map_err(db_error)?;
    let stock: i64 = row.try_get("stock").map_err(db_error)?;
    let category: String = row.try_get("category").map_err(db_error)?;
    let thumbnails_json: String = row.try_get("thumbnails_json").map_err(db_error)?;

    Ok(Product {
        id: ProductId(id),
        title,
        description,
        code,
        price: Decimal::from_str(&price_str).map_err(|e| decode_error("price", e))?,
        status: ProductStatus::from_str(&status_str).map_err(|e| decode_error("status", e))?,
        stock: u32::try_from(stock).map_err(|e| decode_error("stock", e))?,
        category,
        thumbnails: serde_json::from_str(&thumbnails_json)
            .map_err(|e| decode_error("thumbnails_json", e))?,
    })
}

fn row_to_cart(row: &sqlx::sqlite::SqliteRow) -> Result<Cart, StorageError> {
    let id: String = row.try_get("id").map_err(db_error)?;
    let items_json: String = row.try_get("items_json").map_err(db_error)?;
    let items: Vec<CartItem> =
        serde_json::from_str(&items_json).map_err(|e| decode_error("items_json", e))?;
    Ok(Cart { id: CartId(id), items })
}

fn encode_json<T: serde::Serialize>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Fixed-width text whose byte order matches the numeric order of `price`.
///
/// Negative values get a `-` prefix (sorting before every digit) and
/// nines-complemented digits so larger magnitudes sort first.
fn price_sort_key(price: &Decimal) -> String {
    let magnitude = price.abs().normalize().to_string();
    let (integer, fraction) = magnitude.split_once('.').unwrap_or((magnitude.as_str(), ""));
    let digits = format!(
        "{integer:0>width$}.{fraction:0<scale$}",
        width = KEY_INTEGER_DIGITS,
        scale = KEY_FRACTION_DIGITS
    );

    if price.is_sign_negative() && !price.is_zero() {
        let complemented: String = digits
            .chars()
            .map(|c| match c.to_digit(10) {
                Some(d) => char::from_digit(9 - d, 10).unwrap_or(c),
                None => c,
            })
            .collect();
        format!("-{complemented}")
    } else {
        digits
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &ProductFilter) {
    let mut separator = " WHERE ";
    if let Some(category) = &filter.category {
        builder.push(separator).push("category = ").push_bind(category.clone());
        separator = " AND ";
    }
    if let Some(status) = filter.status {
        builder.push(separator).push("status = ").push_bind(status.as_str());
    }
}

#[async_trait::async_trait]
impl StorageAdapter for SqlStorage {
    fn backend_name(&self) -> &'static str {
        "sql"
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, StorageError> {
        let mut builder = QueryBuilder::<Sqlite>::new(PRODUCT_COLUMNS);
        push_filter(&mut builder, &query.filter);

        let direction = match query.sort {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        builder.push(format!(" ORDER BY price_key {direction}, rowid ASC"));

        // SQLite only accepts OFFSET after LIMIT; -1 means unbounded.
        let limit = query.limit.and_then(|limit| i64::try_from(limit).ok()).unwrap_or(-1);
        let skip = i64::try_from(query.skip).unwrap_or(i64::MAX);
        builder.push(" LIMIT ").push_bind(limit).push(" OFFSET ").push_bind(skip);

        let rows = builder.build().fetch_all(&self.pool).await.map_err(db_error)?;
        rows.iter().map(row_to_product).collect()
    }

    async fn count_products(&self, filter: &ProductFilter) -> Result<u64, StorageError> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM product");
        push_filter(&mut builder, filter);

        let count: i64 =
            builder.build_query_scalar().fetch_one(&self.pool).await.map_err(db_error)?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, StorageError> {
        let row = sqlx::query(&format!("{PRODUCT_COLUMNS} WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, StorageError> {
        let product = product.into_product(ProductId::generate());
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO product (id, title, description, code, price, price_key, status, stock,
                                  category, thumbnails_json, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&product.id.0)
        .bind(&product.title)
        .bind(&product.description)
        .bind(&product.code)
        .bind(product.price.to_string())
        .bind(price_sort_key(&product.price))
        .bind(product.status.as_str())
        .bind(i64::from(product.stock))
        .bind(&product.category)
        .bind(encode_json(&product.thumbnails)?)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(product)
    }

    async fn update_product(
        &self,
        id: &ProductId,
        patch: ProductPatch,
    ) -> Result<Option<Product>, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let row = sqlx::query(&format!("{PRODUCT_COLUMNS} WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;
        let Some(row) = row else {
            return Ok(None);
        };

        let mut product = row_to_product(&row)?;
        patch.apply_to(&mut product);

        sqlx::query(
            "UPDATE product
             SET title = ?, description = ?, code = ?, price = ?, price_key = ?, status = ?,
                 stock = ?, category = ?, thumbnails_json = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&product.title)
        .bind(&product.description)
        .bind(&product.code)
        .bind(product.price.to_string())
        .bind(price_sort_key(&product.price))
        .bind(product.status.as_str())
        .bind(i64::from(product.stock))
        .bind(&product.category)
        .bind(encode_json(&product.thumbnails)?)
        .bind(Utc::now().to_rfc3339())
        .bind(&id.0)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(Some(product))
    }

    async fn delete_product(&self, id: &ProductId) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM product WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_carts(&self) -> Result<Vec<Cart>, StorageError> {
        let rows = sqlx::query("SELECT id, items_json FROM cart ORDER BY rowid ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        rows.iter().map(row_to_cart).collect()
    }

    async fn get_cart(&self, id: &CartId) -> Result<Option<Cart>, StorageError> {
        let row = sqlx::query("SELECT id, items_json FROM cart WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.as_ref().map(row_to_cart).transpose()
    }

    async fn create_cart(&self) -> Result<Cart, StorageError> {
        self.save_cart(Cart::empty(CartId::generate())).await
    }

    async fn save_cart(&self, cart: Cart) -> Result<Cart, StorageError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO cart (id, items_json, created_at, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 items_json = excluded.items_json,
                 updated_at = excluded.updated_at",
        )
        .bind(&cart.id.0)
        .bind(encode_json(&cart.items)?)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(cart)
    }
}
