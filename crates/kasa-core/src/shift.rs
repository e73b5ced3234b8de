//! # Shift Reconciliation
//!
//! Aggregation and cash-count math performed when a shift closes.
//!
//! ```text
//! payments on the shift's live orders
//!      │
//!      ▼
//! bucket by method:  Cash | Card (credit, debit) | Other
//!      │
//!      ▼
//! expected_cash   = starting_cash + cash_sales
//! cash_difference = counted_cash − expected_cash   (negative = shortage)
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ConflictCode, CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Actor, PaymentMethod, Shift};

/// Reconciliation bucket a payment method counts toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentBucket {
    Cash,
    Card,
    Other,
}

impl PaymentBucket {
    pub const fn of(method: PaymentMethod) -> Self {
        match method {
            PaymentMethod::Cash => PaymentBucket::Cash,
            PaymentMethod::CreditCard | PaymentMethod::DebitCard => PaymentBucket::Card,
            PaymentMethod::MobilePayment | PaymentMethod::GiftCard | PaymentMethod::Other => {
                PaymentBucket::Other
            }
        }
    }
}

/// Sales of a shift split by bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SalesTotals {
    pub cash: Money,
    pub card: Money,
    pub other: Money,
}

impl SalesTotals {
    /// Folds `(method, amount)` pairs into buckets.
    pub fn from_payments<I>(payments: I) -> Self
    where
        I: IntoIterator<Item = (PaymentMethod, Money)>,
    {
        let mut totals = SalesTotals::default();
        for (method, amount) in payments {
            match PaymentBucket::of(method) {
                PaymentBucket::Cash => totals.cash += amount,
                PaymentBucket::Card => totals.card += amount,
                PaymentBucket::Other => totals.other += amount,
            }
        }
        totals
    }

    #[inline]
    pub fn total(&self) -> Money {
        self.cash + self.card + self.other
    }
}

/// Summary returned by (and persisted on) a shift close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub starting_cash: Money,
    pub counted_cash: Money,
    pub cash_sales: Money,
    pub card_sales: Money,
    pub other_sales: Money,
    pub total_sales: Money,
    /// Completed orders only.
    pub total_orders: i64,
    pub expected_cash: Money,
    pub cash_difference: Money,
}

impl Reconciliation {
    pub fn compute(starting_cash: Money, counted_cash: Money, sales: SalesTotals, completed_orders: i64) -> Self {
        let expected_cash = starting_cash + sales.cash;

        Reconciliation {
            starting_cash,
            counted_cash,
            cash_sales: sales.cash,
            card_sales: sales.card,
            other_sales: sales.other,
            total_sales: sales.total(),
            total_orders: completed_orders,
            expected_cash,
            cash_difference: counted_cash - expected_cash,
        }
    }

    /// Positive difference means the drawer holds more than expected.
    #[inline]
    pub fn is_shortage(&self) -> bool {
        self.cash_difference.is_negative()
    }
}

/// Checks that `shift` may be closed by `actor`.
pub fn ensure_closable(shift: &Shift, actor: &Actor) -> CoreResult<()> {
    if !shift.is_open() {
        return Err(CoreError::conflict(
            ConflictCode::ShiftNotOpen,
            format!("shift {} is already closed", shift.shift_number),
        ));
    }

    if shift.user_id != actor.user_id && !actor.role.is_elevated() {
        return Err(CoreError::Unauthorized(format!(
            "user {} cannot close shift {} owned by {}",
            actor.user_id, shift.shift_number, shift.user_id
        )));
    }

    Ok(())
}

/// Appends closing notes to whatever was recorded at open.
pub fn append_notes(existing: Option<&str>, closing: Option<&str>) -> Option<String> {
    let existing = existing.map(str::trim).filter(|s| !s.is_empty());
    let closing = closing.map(str::trim).filter(|s| !s.is_empty());

    match (existing, closing) {
        (Some(a), Some(b)) => Some(format!("{a}\n{b}")),
        (Some(a), None) => Some(a.to_string()),
        (None, Some(b)) => Some(b.to_string()),
        (None, None) => None,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Role, ShiftStatus};
    use chrono::Utc;

    fn shift(owner: &str, status: ShiftStatus) -> Shift {
        Shift {
            id: "shift-1".to_string(),
            shift_number: "SH-20260101-001".to_string(),
            user_id: owner.to_string(),
            store_id: "store-1".to_string(),
            status,
            start_time: Utc::now(),
            end_time: None,
            starting_cash_cents: 10_000,
            ending_cash_cents: None,
            cash_sales_cents: None,
            card_sales_cents: None,
            other_sales_cents: None,
            total_sales_cents: None,
            total_orders: None,
            expected_cash_cents: None,
            cash_difference_cents: None,
            closed_by: None,
            notes: None,
        }
    }

    #[test]
    fn test_buckets() {
        assert_eq!(PaymentBucket::of(PaymentMethod::Cash), PaymentBucket::Cash);
        assert_eq!(PaymentBucket::of(PaymentMethod::CreditCard), PaymentBucket::Card);
        assert_eq!(PaymentBucket::of(PaymentMethod::DebitCard), PaymentBucket::Card);
        assert_eq!(PaymentBucket::of(PaymentMethod::MobilePayment), PaymentBucket::Other);
        assert_eq!(PaymentBucket::of(PaymentMethod::GiftCard), PaymentBucket::Other);
    }

    #[test]
    fn test_shortage_scenario() {
        // $150 cash + $80 card, drawer opened with $100, counted $248
        let sales = SalesTotals::from_payments([
            (PaymentMethod::Cash, Money::from_cents(10_000)),
            (PaymentMethod::Cash, Money::from_cents(5_000)),
            (PaymentMethod::CreditCard, Money::from_cents(5_000)),
            (PaymentMethod::DebitCard, Money::from_cents(3_000)),
        ]);
        let rec = Reconciliation::compute(Money::from_cents(10_000), Money::from_cents(24_800), sales, 3);

        assert_eq!(rec.cash_sales.cents(), 15_000);
        assert_eq!(rec.card_sales.cents(), 8_000);
        assert_eq!(rec.other_sales, Money::zero());
        assert_eq!(rec.total_sales.cents(), 23_000);
        assert_eq!(rec.expected_cash.cents(), 25_000);
        assert_eq!(rec.cash_difference.cents(), -200);
        assert!(rec.is_shortage());
        assert_eq!(rec.total_orders, 3);
    }

    #[test]
    fn test_ensure_closable() {
        let cashier = Actor::new("u1", "store-1", Role::Cashier);
        let other_cashier = Actor::new("u2", "store-1", Role::Cashier);
        let manager = Actor::new("m1", "store-1", Role::Manager);

        assert!(ensure_closable(&shift("u1", ShiftStatus::Open), &cashier).is_ok());
        assert!(ensure_closable(&shift("u1", ShiftStatus::Open), &manager).is_ok());
        assert!(matches!(
            ensure_closable(&shift("u1", ShiftStatus::Open), &other_cashier),
            Err(CoreError::Unauthorized(_))
        ));
        assert!(matches!(
            ensure_closable(&shift("u1", ShiftStatus::Closed), &cashier),
            Err(CoreError::StateConflict {
                code: ConflictCode::ShiftNotOpen,
                ..
            })
        ));
    }

    #[test]
    fn test_append_notes() {
        assert_eq!(append_notes(Some("float counted"), Some("all good")).as_deref(), Some("float counted\nall good"));
        assert_eq!(append_notes(None, Some("closing")).as_deref(), Some("closing"));
        assert_eq!(append_notes(Some("opening"), Some("  ")).as_deref(), Some("opening"));
        assert_eq!(append_notes(None, None), None);
    }
}
