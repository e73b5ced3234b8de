//! # Engine Errors
//!
//! The single error type callers of [`crate::Engine`] see.
//!
//! ```text
//! ValidationError ─┐
//! CoreError ───────┼──► EngineError ──► code() ──► "SHIFT_ALREADY_OPEN", ...
//! DbError ─────────┘        │
//!                           └─ Persistence: detail logged, message generic
//! ```

use thiserror::Error;
use tracing::{error, warn};

use crate::error::DbError;
use kasa_core::{ConflictCode, CoreError, ValidationError};

/// Errors returned by engine operations.
///
/// Everything except `Persistence` is caller-recoverable and carries the
/// detail needed to act on it.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{code}: {message}")]
    StateConflict { code: ConflictCode, message: String },

    #[error("Insufficient stock for {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        requested: i64,
        available: i64,
    },

    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Storage failure. The transaction was rolled back.
    #[error("Persistence failure, operation rolled back")]
    Persistence(#[source] DbError),
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn conflict(code: ConflictCode, message: impl Into<String>) -> Self {
        EngineError::StateConflict {
            code,
            message: message.into(),
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "VALIDATION_ERROR",
            EngineError::NotFound { .. } => "NOT_FOUND",
            EngineError::StateConflict { code, .. } => code.as_str(),
            EngineError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            EngineError::Authorization(_) => "UNAUTHORIZED",
            EngineError::Persistence(_) => "PERSISTENCE_ERROR",
        }
    }

    /// The conflict code, if this is a state conflict.
    pub fn conflict_code(&self) -> Option<ConflictCode> {
        match self {
            EngineError::StateConflict { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Logs a failed operation at the level its kind deserves.
    pub(crate) fn log(&self, operation: &'static str) {
        match self {
            EngineError::Persistence(source) => {
                error!(operation, error = %source, "Operation failed in storage, rolled back");
            }
            other => {
                warn!(operation, code = other.code(), error = %other, "Operation rejected");
            }
        }
    }
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            CoreError::InsufficientStock {
                product_id,
                requested,
                available,
            } => EngineError::InsufficientStock {
                product_id,
                requested,
                available,
            },
            CoreError::StateConflict { code, message } => EngineError::StateConflict { code, message },
            CoreError::Unauthorized(msg) => EngineError::Authorization(msg),
            CoreError::Validation(v) => EngineError::Validation(v),
        }
    }
}

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        EngineError::Persistence(err)
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Persistence(DbError::from(err))
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
