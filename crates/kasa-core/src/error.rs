//! # Error Types
//!
//! Domain-specific error types for kasa-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kasa-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule violations                       │
//! │  ├── ConflictCode     - Stable codes for illegal state transitions     │
//! │  └── ValidationError  - Malformed input                                │
//! │                                                                         │
//! │  kasa-db errors                                                        │
//! │  ├── DbError          - Storage failures                               │
//! │  └── EngineError      - What callers of the Engine see                 │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError ← DbError             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use thiserror::Error;

// =============================================================================
// Conflict Codes
// =============================================================================

/// Machine-readable reason for a rejected state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictCode {
    /// Payment attempted on a Completed, Cancelled or Refunded order.
    OrderNotPayable,
    /// Void attempted on an order that is already Cancelled or Refunded.
    OrderAlreadyClosed,
    /// Item-level void attempted outside Pending/Processing.
    OrderNotEditable,
    /// The order item was voided before.
    ItemAlreadyVoided,
    /// Removing the item would leave the order at or below what was paid.
    VoidBelowPaid,
    /// The remaining order discount would exceed the remaining subtotal + tax.
    DiscountExceedsTotal,
    /// The user already has an open shift.
    ShiftAlreadyOpen,
    /// Close attempted on a shift that is not open.
    ShiftNotOpen,
    /// Close attempted while orders of the shift are still awaiting payment.
    ShiftHasOpenOrders,
    /// An idempotency key was reused with a different payment.
    IdempotencyKeyReused,
}

impl ConflictCode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConflictCode::OrderNotPayable => "ORDER_NOT_PAYABLE",
            ConflictCode::OrderAlreadyClosed => "ORDER_ALREADY_CLOSED",
            ConflictCode::OrderNotEditable => "ORDER_NOT_EDITABLE",
            ConflictCode::ItemAlreadyVoided => "ITEM_ALREADY_VOIDED",
            ConflictCode::VoidBelowPaid => "VOID_BELOW_PAID",
            ConflictCode::DiscountExceedsTotal => "DISCOUNT_EXCEEDS_TOTAL",
            ConflictCode::ShiftAlreadyOpen => "SHIFT_ALREADY_OPEN",
            ConflictCode::ShiftNotOpen => "SHIFT_NOT_OPEN",
            ConflictCode::ShiftHasOpenOrders => "SHIFT_HAS_OPEN_ORDERS",
            ConflictCode::IdempotencyKeyReused => "IDEMPOTENCY_KEY_REUSED",
        }
    }
}

impl fmt::Display for ConflictCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// Every variant is caller-recoverable and carries enough detail to act on
/// (which product, how much stock, which transition).
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced entity does not exist (or is not visible to the caller).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Insufficient stock to complete a sale or adjustment.
    ///
    /// ## User Workflow
    /// ```text
    /// Cart: 6 × ProductA
    ///      │
    ///      ▼
    /// Stock check: available=5
    ///      │
    ///      ▼
    /// InsufficientStock { product_id, requested: 6, available: 5 }
    ///      │
    ///      ▼
    /// Nothing persisted, stock unchanged
    /// ```
    #[error("Insufficient stock for {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        requested: i64,
        available: i64,
    },

    /// Illegal state transition.
    #[error("{code}: {message}")]
    StateConflict { code: ConflictCode, message: String },

    /// The acting user may not perform the operation.
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn conflict(code: ConflictCode, message: impl Into<String>) -> Self {
        CoreError::StateConflict {
            code,
            message: message.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any storage work begins.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, card digits).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A discount larger than the amount it applies to.
    #[error("{field} of {discount} exceeds {limit}")]
    DiscountTooLarge {
        field: String,
        discount: i64,
        limit: i64,
    },
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
