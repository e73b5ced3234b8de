//! # Payment Repository
//!
//! Payments are append-only: a trigger rejects DELETE and nothing in this
//! crate issues UPDATE against the table.
//!
//! ## Idempotency
//! ```text
//! UNIQUE (order_id, idempotency_key)
//!
//!  retry with key "k1"  ──► find_by_idempotency_key ──► hit  ──► replay, no insert
//!                                                  └──► miss ──► insert
//! ```
//! The lookup and the insert run inside the same BEGIN IMMEDIATE transaction,
//! and the UNIQUE constraint backs it up.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use kasa_core::{Money, Payment, PaymentMethod};

/// Repository for payment database operations.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    /// Creates a new PaymentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Lists the payments of an order in the order they were taken.
    pub async fn list_for_order(&self, order_id: &str) -> DbResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE order_id = ?1 ORDER BY rowid",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    // =========================================================================
    // Transaction-scoped helpers
    // =========================================================================

    pub(crate) async fn insert(conn: &mut SqliteConnection, payment: &Payment) -> DbResult<()> {
        debug!(
            order_id = %payment.order_id,
            amount_cents = payment.amount_cents,
            method = ?payment.method,
            "Inserting payment"
        );

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, order_id, amount_cents, method, status,
                reference_number, card_last_four, card_type,
                idempotency_key, processed_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.order_id)
        .bind(payment.amount_cents)
        .bind(payment.method)
        .bind(payment.status)
        .bind(&payment.reference_number)
        .bind(&payment.card_last_four)
        .bind(&payment.card_type)
        .bind(&payment.idempotency_key)
        .bind(&payment.processed_by)
        .bind(payment.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub(crate) async fn find_by_idempotency_key(
        conn: &mut SqliteConnection,
        order_id: &str,
        key: &str,
    ) -> DbResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE order_id = ?1 AND idempotency_key = ?2",
        )
        .bind(order_id)
        .bind(key)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(payment)
    }

    /// Completed payment sums per method for a shift's live orders.
    ///
    /// Orders that ended Cancelled or Refunded contribute nothing.
    pub(crate) async fn sales_by_method_for_shift(
        conn: &mut SqliteConnection,
        shift_id: &str,
    ) -> DbResult<Vec<(PaymentMethod, Money)>> {
        let rows: Vec<(PaymentMethod, i64)> = sqlx::query_as(
            r#"
            SELECT p.method, SUM(p.amount_cents)
            FROM payments p
            INNER JOIN orders o ON o.id = p.order_id
            WHERE o.shift_id = ?1
              AND p.status = 'completed'
              AND o.status NOT IN ('cancelled', 'refunded')
            GROUP BY p.method
            "#,
        )
        .bind(shift_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(method, cents)| (method, Money::from_cents(cents)))
            .collect())
    }
}
