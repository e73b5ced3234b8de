//! # Inventory Ledger Repository
//!
//! Append-only log of stock movements. Triggers in the schema reject UPDATE
//! and DELETE; a CHECK enforces `stock_after = stock_before + quantity_delta`.
//!
//! ```text
//! product p1:  +10 adjustment   0 → 10
//!              −3  sale        10 →  7
//!              +3  return       7 → 10
//!                                    └── equals products.current_stock
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use kasa_core::InventoryTransaction;

/// Repository for the inventory ledger.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Ledger of one product in append order.
    ///
    /// Rows are never deleted, so rowid order is insertion order even when
    /// two entries share a timestamp.
    pub async fn history(&self, product_id: &str) -> DbResult<Vec<InventoryTransaction>> {
        let entries = sqlx::query_as::<_, InventoryTransaction>(
            r#"
            SELECT * FROM inventory_transactions
            WHERE product_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Entries written on behalf of an order (sales and returns).
    pub async fn list_for_order(&self, order_id: &str) -> DbResult<Vec<InventoryTransaction>> {
        let entries = sqlx::query_as::<_, InventoryTransaction>(
            "SELECT * FROM inventory_transactions WHERE order_id = ?1 ORDER BY rowid",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    pub(crate) async fn append(conn: &mut SqliteConnection, entry: &InventoryTransaction) -> DbResult<()> {
        debug!(
            product_id = %entry.product_id,
            kind = ?entry.kind,
            delta = entry.quantity_delta,
            stock_after = entry.stock_after,
            "Appending ledger entry"
        );

        sqlx::query(
            r#"
            INSERT INTO inventory_transactions (
                id, product_id, store_id, kind, quantity_delta,
                stock_before, stock_after, user_id, order_id, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.product_id)
        .bind(&entry.store_id)
        .bind(entry.kind)
        .bind(entry.quantity_delta)
        .bind(entry.stock_before)
        .bind(entry.stock_after)
        .bind(&entry.user_id)
        .bind(&entry.order_id)
        .bind(&entry.notes)
        .bind(entry.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}
