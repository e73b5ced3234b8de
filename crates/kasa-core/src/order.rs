//! # Order Aggregate Logic
//!
//! Pure rules behind order creation, payment and void.
//!
//! ## Pricing
//! ```text
//! per line:   subtotal = qty × unit_ex_tax
//!             tax      = qty × unit_tax
//!             total    = subtotal + tax − item_discount
//!
//! per order:  subtotal = Σ line subtotal
//!             tax      = Σ line tax
//!             discount = order_discount + Σ item_discount
//!             total    = subtotal + tax − discount
//! ```
//! Amounts are integer cents, so these sums are exact; the half-away-from-zero
//! rounding already happened when the unit tax was snapshotted.
//!
//! ## Status Transitions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Pending ──pay (paid < total)──► Processing ──pay (paid ≥ total)──►     │
//! │     │                                                   Completed       │
//! │     └──────────────pay (paid ≥ total)──────────────────►                │
//! │                                                                         │
//! │  Pending | Processing | Completed ──void──► Cancelled                   │
//! │  Cancelled | Refunded: terminal, every transition is rejected           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ConflictCode, CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{OrderItem, OrderStatus, UnitPricing};

// =============================================================================
// Status State Machine
// =============================================================================

impl OrderStatus {
    /// Whether a payment may be applied in this state.
    #[inline]
    pub const fn accepts_payment(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Processing)
    }

    /// Whether lines may still be voided individually.
    #[inline]
    pub const fn accepts_item_void(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Processing)
    }

    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Refunded)
    }

    /// Status after a payment brings the paid amount to `paid`.
    ///
    /// Driven solely by `paid >= total`; never moves backwards.
    pub fn after_payment(self, paid: Money, total: Money) -> CoreResult<OrderStatus> {
        if !self.accepts_payment() {
            return Err(CoreError::conflict(
                ConflictCode::OrderNotPayable,
                format!("order is {}, cannot accept payment", self.as_str()),
            ));
        }

        if paid >= total {
            Ok(OrderStatus::Completed)
        } else {
            Ok(OrderStatus::Processing)
        }
    }

    /// Status after a whole-order void.
    pub fn cancel(self) -> CoreResult<OrderStatus> {
        if self.is_terminal() {
            return Err(CoreError::conflict(
                ConflictCode::OrderAlreadyClosed,
                format!("order is already {}", self.as_str()),
            ));
        }
        Ok(OrderStatus::Cancelled)
    }
}

// =============================================================================
// Line Pricing
// =============================================================================

/// Computed amounts for one cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePricing {
    pub unit: UnitPricing,
    pub quantity: i64,
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
}

impl LinePricing {
    /// Prices a line from a frozen unit snapshot.
    ///
    /// The discount may not exceed what the line costs including tax.
    ///
    /// ```rust
    /// use kasa_core::money::Money;
    /// use kasa_core::order::LinePricing;
    /// use kasa_core::types::UnitPricing;
    ///
    /// let unit = UnitPricing {
    ///     ex_tax: Money::from_cents(1000),
    ///     tax: Money::from_cents(100),
    ///     inc_tax: Money::from_cents(1100),
    /// };
    /// let line = LinePricing::compute(unit, 2, Money::zero()).unwrap();
    /// assert_eq!(line.subtotal.cents(), 2000);
    /// assert_eq!(line.tax.cents(), 200);
    /// assert_eq!(line.total.cents(), 2200);
    /// ```
    pub fn compute(unit: UnitPricing, quantity: i64, discount: Money) -> CoreResult<Self> {
        if discount.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: "item discount".to_string(),
            }
            .into());
        }

        let subtotal = unit.ex_tax.multiply_quantity(quantity);
        let tax = unit.tax.multiply_quantity(quantity);
        let gross = subtotal + tax;

        if discount > gross {
            return Err(ValidationError::DiscountTooLarge {
                field: "item discount".to_string(),
                discount: discount.cents(),
                limit: gross.cents(),
            }
            .into());
        }

        Ok(LinePricing {
            unit,
            quantity,
            subtotal,
            tax,
            discount,
            total: gross - discount,
        })
    }
}

// =============================================================================
// Order Totals
// =============================================================================

/// Header amounts of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
}

impl OrderTotals {
    /// Accumulates lines and applies the order-level discount.
    pub fn from_lines(lines: &[LinePricing], order_discount: Money) -> CoreResult<Self> {
        if order_discount.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: "order discount".to_string(),
            }
            .into());
        }

        let subtotal: Money = lines.iter().map(|l| l.subtotal).sum();
        let tax: Money = lines.iter().map(|l| l.tax).sum();
        let item_discounts: Money = lines.iter().map(|l| l.discount).sum();
        let discount = order_discount + item_discounts;

        if discount > subtotal + tax {
            return Err(ValidationError::DiscountTooLarge {
                field: "order discount".to_string(),
                discount: order_discount.cents(),
                limit: (subtotal + tax - item_discounts).cents(),
            }
            .into());
        }

        Ok(OrderTotals {
            subtotal,
            tax,
            discount,
            total: subtotal + tax - discount,
        })
    }

    /// Totals after removing one live line from an order.
    pub fn without_item(&self, item: &OrderItem) -> CoreResult<Self> {
        let subtotal = self.subtotal - Money::from_cents(item.subtotal_cents);
        let tax = self.tax - Money::from_cents(item.tax_cents);
        let discount = self.discount - Money::from_cents(item.discount_cents);

        if discount > subtotal + tax {
            return Err(CoreError::conflict(
                ConflictCode::DiscountExceedsTotal,
                format!(
                    "remaining discount {} exceeds remaining amount {}",
                    discount,
                    subtotal + tax
                ),
            ));
        }

        Ok(OrderTotals {
            subtotal,
            tax,
            discount,
            total: subtotal + tax - discount,
        })
    }
}

// =============================================================================
// Payment Settlement
// =============================================================================

/// Result of applying one payment to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub status: OrderStatus,
    pub paid: Money,
    pub remaining: Money,
    pub change: Money,
}

impl Settlement {
    /// Applies `amount` on top of what was already paid.
    ///
    /// ```rust
    /// use kasa_core::money::Money;
    /// use kasa_core::order::Settlement;
    /// use kasa_core::types::OrderStatus;
    ///
    /// let s = Settlement::apply(
    ///     OrderStatus::Pending,
    ///     Money::from_cents(2750),
    ///     Money::zero(),
    ///     Money::from_cents(3000),
    /// )
    /// .unwrap();
    /// assert_eq!(s.status, OrderStatus::Completed);
    /// assert_eq!(s.change.cents(), 250);
    /// ```
    pub fn apply(status: OrderStatus, total: Money, paid_before: Money, amount: Money) -> CoreResult<Self> {
        if !amount.is_positive() {
            return Err(ValidationError::MustBePositive {
                field: "payment amount".to_string(),
            }
            .into());
        }

        let paid = paid_before + amount;
        let status = status.after_payment(paid, total)?;
        Ok(Self::current(status, total, paid))
    }

    /// Describes an order's standing without applying anything.
    pub fn current(status: OrderStatus, total: Money, paid: Money) -> Self {
        let change = if status == OrderStatus::Completed {
            paid - total
        } else {
            Money::zero()
        };

        Settlement {
            status,
            paid,
            remaining: total.saturating_remainder(paid),
            change,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
