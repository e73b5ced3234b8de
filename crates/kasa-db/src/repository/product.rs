//! # Product Repository
//!
//! Product lookups for the engine and the guarded stock update every ledger
//! entry is paired with.
//!
//! ## Guarded Stock Update
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  ❌ WRONG: read, check in Rust, write absolute value                    │
//! │     SELECT current_stock ...        -- 5                               │
//! │     UPDATE products SET current_stock = 2                              │
//! │     (two sellers both read 5, both write, stock oversold)              │
//! │                                                                         │
//! │  ✅ CORRECT: delta with the guard in the same statement                 │
//! │     UPDATE products                                                    │
//! │        SET current_stock = current_stock + :delta                      │
//! │      WHERE id = :id AND current_stock + :delta >= 0                    │
//! │     RETURNING current_stock                                            │
//! │                                                                         │
//! │  No row back → not enough stock. stock_before = after − delta.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use kasa_core::Product;

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product by its SKU within a store.
    pub async fn get_by_sku(&self, store_id: &str, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE store_id = ?1 AND sku = ?2",
        )
        .bind(store_id)
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists active products of a store sorted by name.
    pub async fn list_active(&self, store_id: &str, limit: u32) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE store_id = ?1 AND is_active = 1
            ORDER BY name
            LIMIT ?2
            "#,
        )
        .bind(store_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - SKU already exists in the store
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(sku = %product.sku, store_id = %product.store_id, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, store_id, sku, name, price_cents, tax_rate_bps,
                track_inventory, current_stock, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.store_id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.tax_rate_bps)
        .bind(product.track_inventory)
        .bind(product.current_stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product.clone())
    }

    /// Counts products of a store.
    pub async fn count(&self, store_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE store_id = ?1")
            .bind(store_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Transaction-scoped helpers
    // =========================================================================

    /// Reads a product through an open transaction.
    pub(crate) async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(product)
    }

    /// Applies `delta` to the product's stock unless that would go below zero.
    ///
    /// ## Returns
    /// * `Ok(Some(stock_after))` - Stock updated
    /// * `Ok(None)` - Product missing or not enough stock; nothing written
    pub(crate) async fn apply_stock_delta(
        conn: &mut SqliteConnection,
        id: &str,
        delta: i64,
        now: DateTime<Utc>,
    ) -> DbResult<Option<i64>> {
        debug!(product_id = %id, delta, "Applying stock delta");

        let stock_after: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET current_stock = current_stock + ?2,
                updated_at = ?3
            WHERE id = ?1 AND current_stock + ?2 >= 0
            RETURNING current_stock
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(stock_after)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig, DbError};

    fn product(id: &str, sku: &str, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            store_id: "store-1".to_string(),
            sku: sku.to_string(),
            name: format!("Product {sku}"),
            price_cents: 1000,
            tax_rate_bps: 1000,
            track_inventory: true,
            current_stock: stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.insert(&product("p1", "A", 5)).await.unwrap();

        let by_id = repo.get_by_id("p1").await.unwrap().unwrap();
        assert_eq!(by_id.sku, "A");
        assert_eq!(by_id.tax_rate_bps, 1000);
        assert!(by_id.track_inventory);

        let by_sku = repo.get_by_sku("store-1", "A").await.unwrap().unwrap();
        assert_eq!(by_sku.id, "p1");
        assert!(repo.get_by_sku("store-2", "A").await.unwrap().is_none());
        assert_eq!(repo.count("store-1").await.unwrap(), 1);
        assert_eq!(repo.list_active("store-1", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.insert(&product("p1", "A", 5)).await.unwrap();
        let err = repo.insert(&product("p2", "A", 5)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_stock_delta_guard() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products().insert(&product("p1", "A", 5)).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let now = Utc::now();

        assert_eq!(ProductRepository::apply_stock_delta(&mut conn, "p1", -3, now).await.unwrap(), Some(2));
        assert_eq!(ProductRepository::apply_stock_delta(&mut conn, "p1", -3, now).await.unwrap(), None);
        assert_eq!(ProductRepository::apply_stock_delta(&mut conn, "p1", 4, now).await.unwrap(), Some(6));
        assert_eq!(ProductRepository::apply_stock_delta(&mut conn, "missing", 1, now).await.unwrap(), None);
    }
}
