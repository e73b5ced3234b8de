//! # Validation Module
//!
//! Input checks run before the engine opens a transaction.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP/DTO collaborator                                        │
//! │  └── Deserialization, basic shape                                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Quantities, amounts, identifiers, free text                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── CHECK (current_stock >= 0)                                        │
//! │  ├── UNIQUE order_number / shift_number / open shift per user          │
//! │  └── Foreign keys                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::MAX_NOTES_LEN;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates a line quantity against the configured maximum.
///
/// ```rust
/// use kasa_core::validation::validate_quantity;
///
/// assert!(validate_quantity(5, 999).is_ok());
/// assert!(validate_quantity(0, 999).is_err());
/// assert!(validate_quantity(1000, 999).is_err());
/// ```
pub fn validate_quantity(qty: i64, max: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > max {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max,
        });
    }

    Ok(())
}

/// Validates the number of lines in a cart.
pub fn validate_cart_size(lines: usize, max: usize) -> ValidationResult<()> {
    if lines == 0 {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if lines > max {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: max as i64,
        });
    }

    Ok(())
}

/// Validates a payment amount in cents (must be > 0).
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    Ok(())
}

/// Validates a counted or float cash amount in cents (must be >= 0).
pub fn validate_cash_amount(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates optional free text (notes, reasons, table numbers).
pub fn validate_notes(field: &str, notes: Option<&str>) -> ValidationResult<()> {
    if let Some(text) = notes {
        if text.chars().count() > MAX_NOTES_LEN {
            return Err(ValidationError::TooLong {
                field: field.to_string(),
                max: MAX_NOTES_LEN,
            });
        }
    }

    Ok(())
}

/// Validates a mandatory reason (void reasons, adjustment notes).
pub fn validate_reason(field: &str, reason: &str) -> ValidationResult<()> {
    if reason.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    validate_notes(field, Some(reason))
}

/// Validates card last-four digits when supplied.
///
/// ```rust
/// use kasa_core::validation::validate_card_last_four;
///
/// assert!(validate_card_last_four(Some("4242")).is_ok());
/// assert!(validate_card_last_four(None).is_ok());
/// assert!(validate_card_last_four(Some("42a2")).is_err());
/// ```
pub fn validate_card_last_four(digits: Option<&str>) -> ValidationResult<()> {
    match digits {
        Some(d) if d.len() != 4 || !d.bytes().all(|b| b.is_ascii_digit()) => {
            Err(ValidationError::InvalidFormat {
                field: "card_last_four".to_string(),
                reason: "must be exactly 4 digits".to_string(),
            })
        }
        _ => Ok(()),
    }
}

/// Validates an idempotency key when supplied (1-128 printable characters).
pub fn validate_idempotency_key(key: Option<&str>) -> ValidationResult<()> {
    if let Some(key) = key {
        if key.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "idempotency_key".to_string(),
            });
        }
        if key.len() > 128 {
            return Err(ValidationError::TooLong {
                field: "idempotency_key".to_string(),
                max: 128,
            });
        }
    }

    Ok(())
}

/// Validates a UUID string.
///
/// ```rust
/// use kasa_core::validation::validate_uuid;
///
/// assert!(validate_uuid("order_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("order_id", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
