//! # Database Error Types
//!
//! ```text
//! sqlx::Error ──► DbError ──► EngineError
//!                   │
//!                   ├─ constraint hits keep the constraint name, so the
//!                   │  engine can turn e.g. the open-shift index into
//!                   │  SHIFT_ALREADY_OPEN
//!                   └─ everything else ends up as Persistence
//! ```

use sqlx::error::ErrorKind;
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// UNIQUE constraint hit. `constraint` is the `table.column` list SQLite
    /// reports, e.g. `shifts.user_id`.
    #[error("Unique constraint failed on {constraint}")]
    UniqueViolation { constraint: String },

    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// CHECK constraint hit (negative stock, negative totals, bad enum text).
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// BEGIN, COMMIT or ROLLBACK failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Query failed: {0}")]
    Query(String),
}

impl DbError {
    /// True when this is a UNIQUE violation on exactly `constraint`.
    pub fn is_unique_violation_on(&self, constraint: &str) -> bool {
        matches!(self, DbError::UniqueViolation { constraint: c } if c == constraint)
    }
}

/// Strips SQLite's "UNIQUE constraint failed: " prefix.
fn unique_target(message: &str) -> String {
    message
        .split_once(": ")
        .map(|(_, target)| target)
        .unwrap_or(message)
        .to_string()
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let message = db_err.message();
                match db_err.kind() {
                    ErrorKind::UniqueViolation => DbError::UniqueViolation {
                        constraint: unique_target(message),
                    },
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation(message.to_string()),
                    ErrorKind::CheckViolation => DbError::CheckViolation(message.to_string()),
                    _ => DbError::Query(message.to_string()),
                }
            }
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            other => DbError::Query(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[test]
    fn test_unique_target() {
        assert_eq!(unique_target("UNIQUE constraint failed: shifts.user_id"), "shifts.user_id");
        assert_eq!(
            unique_target("UNIQUE constraint failed: products.store_id, products.sku"),
            "products.store_id, products.sku"
        );
        assert_eq!(unique_target("odd"), "odd");
    }

    #[tokio::test]
    async fn test_constraint_errors_are_classified() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        sqlx::query("INSERT INTO number_sequences (scope, last_value) VALUES ('a', 1)")
            .execute(db.pool())
            .await
            .unwrap();

        let err: DbError = sqlx::query("INSERT INTO number_sequences (scope, last_value) VALUES ('a', 2)")
            .execute(db.pool())
            .await
            .unwrap_err()
            .into();
        assert!(err.is_unique_violation_on("number_sequences.scope"));
        assert!(!err.is_unique_violation_on("shifts.user_id"));

        let err: DbError = sqlx::query("SELECT * FROM no_such_table")
            .execute(db.pool())
            .await
            .unwrap_err()
            .into();
        assert!(matches!(err, DbError::Query(_)));
    }

    #[test]
    fn test_pool_errors() {
        assert!(matches!(DbError::from(sqlx::Error::PoolTimedOut), DbError::PoolExhausted));
        assert!(matches!(DbError::from(sqlx::Error::PoolClosed), DbError::ConnectionFailed(_)));
    }
}
