//! # Number Sequences
//!
//! Human-readable order and shift numbers backed by a counter row per scope.
//!
//! ```text
//! scope "order:20261016"  ──►  last_value 41 ──► 42  ──►  ORD-20261016-00042
//! scope "shift:20261016"  ──►  last_value  2 ──►  3  ──►  SH-20261016-003
//! ```
//!
//! The increment is a single upsert, so two transactions can never read the
//! same value: the second one waits for the first writer's lock.

use chrono::NaiveDate;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;

/// Atomically bumps the counter for `scope` and returns the new value.
///
/// The first call for a scope returns 1.
pub(crate) async fn next_value(conn: &mut SqliteConnection, scope: &str) -> DbResult<i64> {
    let value: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO number_sequences (scope, last_value) VALUES (?1, 1)
        ON CONFLICT (scope) DO UPDATE SET last_value = last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(scope)
    .fetch_one(&mut *conn)
    .await?;

    debug!(scope = %scope, value, "Sequence advanced");
    Ok(value)
}

/// Scope key for order numbers on `day`.
pub fn order_scope(day: NaiveDate) -> String {
    format!("order:{}", day.format("%Y%m%d"))
}

/// Scope key for shift numbers on `day`.
pub fn shift_scope(day: NaiveDate) -> String {
    format!("shift:{}", day.format("%Y%m%d"))
}

/// Formats an order number, e.g. `ORD-20261016-00042`.
pub fn format_order_number(prefix: &str, day: NaiveDate, seq: i64) -> String {
    format!("{}{}-{:05}", prefix, day.format("%Y%m%d"), seq)
}

/// Formats a shift number, e.g. `SH-20261016-003`.
pub fn format_shift_number(prefix: &str, day: NaiveDate, seq: i64) -> String {
    format!("{}{}-{:03}", prefix, day.format("%Y%m%d"), seq)
}
