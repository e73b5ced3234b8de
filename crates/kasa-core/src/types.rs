//! # Domain Types
//!
//! Entities persisted by the transaction engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │     Order       │   │    Payment      │       │
//! │  │  (master data)  │   │  order_number   │   │  order_id (FK)  │       │
//! │  │  price_cents    │◄──│  status         │──►│  method         │       │
//! │  │  current_stock  │   │  totals         │   │  amount_cents   │       │
//! │  └────────▲────────┘   └────────┬────────┘   └─────────────────┘       │
//! │           │                     │                                       │
//! │  ┌────────┴────────┐   ┌────────▼────────┐   ┌─────────────────┐       │
//! │  │ InventoryTx     │   │   OrderItem     │   │     Shift       │       │
//! │  │ (append-only)   │   │ price snapshot  │   │  Open → Closed  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Relationships are one-way id references held in flat tables; no entity
//! owns another in memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 1000 bps = 10%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

// =============================================================================
// Acting User
// =============================================================================

/// Role of the acting user, supplied by the identity collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Cashier,
    Manager,
    Admin,
}

impl Role {
    /// Manager and Admin may act on other users' shifts and adjust stock.
    #[inline]
    pub const fn is_elevated(&self) -> bool {
        matches!(self, Role::Manager | Role::Admin)
    }
}

/// The authenticated user an operation runs on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,
    /// `None` when the user is not bound to a store.
    pub store_id: Option<String>,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, store_id: impl Into<String>, role: Role) -> Self {
        Actor {
            user_id: user_id.into(),
            store_id: Some(store_id.into()),
            role,
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product as exposed by the master-data collaborator.
///
/// Only the pricing and stock fields matter to the engine; stock is mutated
/// exclusively through the inventory ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: String,
    pub store_id: String,
    pub sku: String,
    pub name: String,
    /// Unit price before tax, in cents.
    pub price_cents: i64,
    /// Tax rate in basis points (1000 = 10%).
    pub tax_rate_bps: u32,
    pub track_inventory: bool,
    pub current_stock: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Unit price components frozen onto an order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPricing {
    pub ex_tax: Money,
    pub tax: Money,
    pub inc_tax: Money,
}

impl Product {
    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }

    /// Snapshots the unit price components for a sale.
    ///
    /// ```rust
    /// # use chrono::Utc;
    /// # use kasa_core::Product;
    /// # let now = Utc::now();
    /// # let product = Product {
    /// #     id: "p".into(), store_id: "s".into(), sku: "A".into(), name: "A".into(),
    /// #     price_cents: 1000, tax_rate_bps: 1000, track_inventory: true,
    /// #     current_stock: 5, is_active: true, created_at: now, updated_at: now,
    /// # };
    /// let unit = product.unit_pricing();
    /// assert_eq!(unit.tax.cents(), 100);
    /// assert_eq!(unit.inc_tax.cents(), 1100);
    /// ```
    pub fn unit_pricing(&self) -> UnitPricing {
        let ex_tax = Money::from_cents(self.price_cents);
        let tax = ex_tax.calculate_tax(self.tax_rate());
        UnitPricing {
            ex_tax,
            tax,
            inc_tax: ex_tax + tax,
        }
    }
}

// =============================================================================
// Order Status / Type
// =============================================================================

/// Lifecycle of an order.
///
/// ```text
/// Pending ──► Processing ──► Completed
///    │            │              │
///    └────────────┴──────────────┴──► Cancelled
///                                └──► Refunded (external)
/// ```
///
/// Transitions live in [`crate::order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    #[default]
    Counter,
    DineIn,
    Takeaway,
    Delivery,
}

// =============================================================================
// Order
// =============================================================================

/// Order header. Items and payments reference it by `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,
    pub order_number: String,
    pub status: OrderStatus,
    pub order_type: OrderType,
    pub subtotal_cents: i64,
    /// Order-level discount plus every live item discount.
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub change_cents: i64,
    pub notes: Option<String>,
    pub table_number: Option<String>,
    pub customer_id: Option<String>,
    pub user_id: String,
    pub store_id: String,
    pub shift_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn paid(&self) -> Money {
        Money::from_cents(self.paid_cents)
    }

    /// What is still owed, never negative.
    #[inline]
    pub fn remaining(&self) -> Money {
        self.total().saturating_remainder(self.paid())
    }
}

// =============================================================================
// Order Item
// =============================================================================

/// A line of an order with its unit prices frozen at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    /// Position in the cart, starting at 1.
    pub line_no: i64,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_ex_tax_cents: i64,
    pub unit_tax_cents: i64,
    pub unit_price_inc_tax_cents: i64,
    pub discount_cents: i64,
    /// quantity × unit_price_ex_tax
    pub subtotal_cents: i64,
    /// quantity × unit_tax
    pub tax_cents: i64,
    /// subtotal + tax − discount
    pub total_cents: i64,
    pub notes: Option<String>,
    pub voided: bool,
    pub voided_at: Option<DateTime<Utc>>,
    pub void_reason: Option<String>,
}

// =============================================================================
// Payment
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    CreditCard,
    DebitCard,
    MobilePayment,
    GiftCard,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Completed,
    Failed,
    Refunded,
}

/// A payment applied to an order. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: String,
    pub order_id: String,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub reference_number: Option<String>,
    pub card_last_four: Option<String>,
    pub card_type: Option<String>,
    /// Caller-supplied token that makes retries safe.
    pub idempotency_key: Option<String>,
    pub processed_by: String,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Inventory Ledger
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum InventoryTxKind {
    Sale,
    Return,
    Adjustment,
}

/// One stock movement. Never updated or deleted once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryTransaction {
    pub id: String,
    pub product_id: String,
    pub store_id: String,
    pub kind: InventoryTxKind,
    pub quantity_delta: i64,
    pub stock_before: i64,
    pub stock_after: i64,
    pub user_id: String,
    pub order_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Shift
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    #[default]
    Open,
    Closed,
}

/// A cash-drawer session. Closing fills in the reconciliation columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Shift {
    pub id: String,
    pub shift_number: String,
    pub user_id: String,
    pub store_id: String,
    pub status: ShiftStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub starting_cash_cents: i64,
    pub ending_cash_cents: Option<i64>,
    pub cash_sales_cents: Option<i64>,
    pub card_sales_cents: Option<i64>,
    pub other_sales_cents: Option<i64>,
    pub total_sales_cents: Option<i64>,
    pub total_orders: Option<i64>,
    pub expected_cash_cents: Option<i64>,
    pub cash_difference_cents: Option<i64>,
    pub closed_by: Option<String>,
    pub notes: Option<String>,
}

impl Shift {
    #[inline]
    pub fn starting_cash(&self) -> Money {
        Money::from_cents(self.starting_cash_cents)
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == ShiftStatus::Open
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
