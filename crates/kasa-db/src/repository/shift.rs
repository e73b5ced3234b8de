//! # Shift Repository
//!
//! Cash drawer sessions. The partial unique index
//! `idx_shifts_one_open_per_user` is what actually keeps a user to one open
//! shift; `insert` surfaces a violation as `UniqueViolation { constraint: "shifts.user_id" }`.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use kasa_core::shift::Reconciliation;
use kasa_core::Shift;

/// Field SQLite reports when the one-open-shift index rejects an insert.
pub const OPEN_SHIFT_CONSTRAINT: &str = "shifts.user_id";

/// Repository for shift database operations.
#[derive(Debug, Clone)]
pub struct ShiftRepository {
    pool: SqlitePool,
}

impl ShiftRepository {
    /// Creates a new ShiftRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ShiftRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Shift>> {
        let shift = sqlx::query_as::<_, Shift>("SELECT * FROM shifts WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(shift)
    }

    /// The user's open shift, if any. Always read from storage.
    pub async fn find_open_for_user(&self, user_id: &str) -> DbResult<Option<Shift>> {
        let shift = sqlx::query_as::<_, Shift>(
            "SELECT * FROM shifts WHERE user_id = ?1 AND status = 'open'",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shift)
    }

    // =========================================================================
    // Transaction-scoped helpers
    // =========================================================================

    pub(crate) async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Shift>> {
        let shift = sqlx::query_as::<_, Shift>("SELECT * FROM shifts WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(shift)
    }

    /// The user's open shift in `store_id`. A shift left open in another
    /// store does not count.
    pub(crate) async fn find_open(
        conn: &mut SqliteConnection,
        user_id: &str,
        store_id: &str,
    ) -> DbResult<Option<Shift>> {
        let shift = sqlx::query_as::<_, Shift>(
            "SELECT * FROM shifts WHERE user_id = ?1 AND store_id = ?2 AND status = 'open'",
        )
        .bind(user_id)
        .bind(store_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(shift)
    }

    pub(crate) async fn insert(conn: &mut SqliteConnection, shift: &Shift) -> DbResult<()> {
        debug!(shift_number = %shift.shift_number, user_id = %shift.user_id, "Inserting shift");

        sqlx::query(
            r#"
            INSERT INTO shifts (
                id, shift_number, user_id, store_id, status,
                start_time, starting_cash_cents, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&shift.id)
        .bind(&shift.shift_number)
        .bind(&shift.user_id)
        .bind(&shift.store_id)
        .bind(shift.status)
        .bind(shift.start_time)
        .bind(shift.starting_cash_cents)
        .bind(&shift.notes)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Completed orders attributed to a shift.
    pub(crate) async fn count_completed_orders(conn: &mut SqliteConnection, shift_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE shift_id = ?1 AND status = 'completed'",
        )
        .bind(shift_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(count)
    }

    /// Orders of the shift still waiting for payment (Pending or Processing).
    pub(crate) async fn count_open_orders(conn: &mut SqliteConnection, shift_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE shift_id = ?1 AND status IN ('pending', 'processing')",
        )
        .bind(shift_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(count)
    }

    /// Writes the reconciliation and flips the shift to Closed.
    ///
    /// Guarded by `status = 'open'`; zero rows affected means someone else
    /// closed it first.
    pub(crate) async fn close(
        conn: &mut SqliteConnection,
        id: &str,
        summary: &Reconciliation,
        closed_by: &str,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE shifts
            SET status = 'closed',
                end_time = ?2,
                ending_cash_cents = ?3,
                cash_sales_cents = ?4,
                card_sales_cents = ?5,
                other_sales_cents = ?6,
                total_sales_cents = ?7,
                total_orders = ?8,
                expected_cash_cents = ?9,
                cash_difference_cents = ?10,
                closed_by = ?11,
                notes = ?12
            WHERE id = ?1 AND status = 'open'
            "#,
        )
        .bind(id)
        .bind(now)
        .bind(summary.counted_cash.cents())
        .bind(summary.cash_sales.cents())
        .bind(summary.card_sales.cents())
        .bind(summary.other_sales.cents())
        .bind(summary.total_sales.cents())
        .bind(summary.total_orders)
        .bind(summary.expected_cash.cents())
        .bind(summary.cash_difference.cents())
        .bind(closed_by)
        .bind(notes)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }
}
