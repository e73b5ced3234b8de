//! # Order Repository
//!
//! Order headers and line items.
//!
//! Orders are never deleted. After creation only three kinds of write touch a
//! header: settlement (payments), totals (item void), and cancellation.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use kasa_core::order::{OrderTotals, Settlement};
use kasa_core::{Order, OrderItem, OrderStatus};

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Gets an order header by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    /// Gets an order header by its human-readable number.
    pub async fn get_by_number(&self, order_number: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE order_number = ?1")
            .bind(order_number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    /// Gets the lines of an order in cart order, voided lines included.
    pub async fn get_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT * FROM order_items WHERE order_id = ?1 ORDER BY line_no",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists the orders attributed to a shift, oldest first.
    pub async fn list_for_shift(&self, shift_id: &str) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE shift_id = ?1 ORDER BY rowid",
        )
        .bind(shift_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    // =========================================================================
    // Transaction-scoped helpers
    // =========================================================================

    pub(crate) async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(order)
    }

    pub(crate) async fn find_items(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT * FROM order_items WHERE order_id = ?1 ORDER BY line_no",
        )
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(items)
    }

    pub(crate) async fn insert(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
        debug!(order_number = %order.order_number, "Inserting order");

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, status, order_type,
                subtotal_cents, discount_cents, tax_cents, total_cents,
                paid_cents, change_cents,
                notes, table_number, customer_id,
                user_id, store_id, shift_id,
                created_at, completed_at, cancelled_at, cancellation_reason
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8,
                ?9, ?10,
                ?11, ?12, ?13,
                ?14, ?15, ?16,
                ?17, ?18, ?19, ?20
            )
            "#,
        )
        .bind(&order.id)
        .bind(&order.order_number)
        .bind(order.status)
        .bind(order.order_type)
        .bind(order.subtotal_cents)
        .bind(order.discount_cents)
        .bind(order.tax_cents)
        .bind(order.total_cents)
        .bind(order.paid_cents)
        .bind(order.change_cents)
        .bind(&order.notes)
        .bind(&order.table_number)
        .bind(&order.customer_id)
        .bind(&order.user_id)
        .bind(&order.store_id)
        .bind(&order.shift_id)
        .bind(order.created_at)
        .bind(order.completed_at)
        .bind(order.cancelled_at)
        .bind(&order.cancellation_reason)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub(crate) async fn insert_item(conn: &mut SqliteConnection, item: &OrderItem) -> DbResult<()> {
        debug!(order_id = %item.order_id, line_no = item.line_no, product_id = %item.product_id, "Inserting order item");

        sqlx::query(
            r#"
            INSERT INTO order_items (
                id, order_id, line_no, product_id, quantity,
                unit_price_ex_tax_cents, unit_tax_cents, unit_price_inc_tax_cents,
                discount_cents, subtotal_cents, tax_cents, total_cents,
                notes, voided, voided_at, void_reason
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8,
                ?9, ?10, ?11, ?12,
                ?13, ?14, ?15, ?16
            )
            "#,
        )
        .bind(&item.id)
        .bind(&item.order_id)
        .bind(item.line_no)
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price_ex_tax_cents)
        .bind(item.unit_tax_cents)
        .bind(item.unit_price_inc_tax_cents)
        .bind(item.discount_cents)
        .bind(item.subtotal_cents)
        .bind(item.tax_cents)
        .bind(item.total_cents)
        .bind(&item.notes)
        .bind(item.voided)
        .bind(item.voided_at)
        .bind(&item.void_reason)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Writes the outcome of a payment onto the header.
    ///
    /// `completed_at` is stamped only on the transition into Completed.
    pub(crate) async fn update_settlement(
        conn: &mut SqliteConnection,
        id: &str,
        settlement: &Settlement,
        now: DateTime<Utc>,
    ) -> DbResult<u64> {
        let completed_at = (settlement.status == OrderStatus::Completed).then_some(now);

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = ?2,
                paid_cents = ?3,
                change_cents = ?4,
                completed_at = COALESCE(completed_at, ?5)
            WHERE id = ?1 AND status IN ('pending', 'processing')
            "#,
        )
        .bind(id)
        .bind(settlement.status)
        .bind(settlement.paid.cents())
        .bind(settlement.change.cents())
        .bind(completed_at)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Replaces the header amounts after a line was removed.
    pub(crate) async fn update_totals(
        conn: &mut SqliteConnection,
        id: &str,
        totals: &OrderTotals,
    ) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET subtotal_cents = ?2,
                tax_cents = ?3,
                discount_cents = ?4,
                total_cents = ?5
            WHERE id = ?1 AND status IN ('pending', 'processing')
            "#,
        )
        .bind(id)
        .bind(totals.subtotal.cents())
        .bind(totals.tax.cents())
        .bind(totals.discount.cents())
        .bind(totals.total.cents())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Moves an order into Cancelled unless it is already closed.
    pub(crate) async fn mark_cancelled(
        conn: &mut SqliteConnection,
        id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'cancelled',
                cancelled_at = ?2,
                cancellation_reason = ?3
            WHERE id = ?1 AND status NOT IN ('cancelled', 'refunded')
            "#,
        )
        .bind(id)
        .bind(now)
        .bind(reason)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Flags one line as voided if it is still live.
    pub(crate) async fn mark_item_voided(
        conn: &mut SqliteConnection,
        item_id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE order_items
            SET voided = 1,
                voided_at = ?2,
                void_reason = ?3
            WHERE id = ?1 AND voided = 0
            "#,
        )
        .bind(item_id)
        .bind(now)
        .bind(reason)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }
}
