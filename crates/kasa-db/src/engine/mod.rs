//! # Transaction Engine
//!
//! The operations a POS front end calls. Each mutating operation is one
//! `BEGIN IMMEDIATE` transaction: it either commits every row it touched or
//! leaves the database exactly as it found it.
//!
//! ## Operation Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Engine                                         │
//! │                                                                         │
//! │  orders.rs     create_order ─► products, orders, order_items,          │
//! │                                inventory_transactions, sequences       │
//! │                void_order / void_order_item ─► same tables, reversed   │
//! │                get_order                                               │
//! │                                                                         │
//! │  payments.rs   process_payment ─► payments, orders                     │
//! │                                                                         │
//! │  inventory.rs  adjust_stock ─► products, inventory_transactions        │
//! │                inventory_history                                       │
//! │                                                                         │
//! │  shifts.rs     open_shift / close_shift ─► shifts, sequences           │
//! │                current_shift / get_shift                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rollback
//! Work is staged on a `Transaction` that is only committed on the last line
//! of each operation. Any `?` before that drops the transaction, and sqlx
//! rolls it back. The same happens if the caller drops the future mid-flight.

mod error;
mod inventory;
mod orders;
mod payments;
mod shifts;

pub use error::{EngineError, EngineResult};

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::pool::Database;
use kasa_core::order::OrderTotals;
use kasa_core::shift::Reconciliation;
use kasa_core::{
    Actor, Money, Order, OrderItem, OrderStatus, OrderType, Payment, PaymentMethod, ValidationError,
};

// =============================================================================
// Requests
// =============================================================================

/// One line of a cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub discount_cents: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CartLine {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        CartLine {
            product_id: product_id.into(),
            quantity,
            discount_cents: 0,
            notes: None,
        }
    }

    pub fn with_discount(mut self, cents: i64) -> Self {
        self.discount_cents = cents;
        self
    }
}

/// Everything needed to turn a cart into an order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub lines: Vec<CartLine>,
    #[serde(default)]
    pub order_type: OrderType,
    /// Order-level discount, on top of line discounts.
    #[serde(default)]
    pub discount_cents: i64,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub table_number: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateOrderRequest {
    pub fn new(lines: Vec<CartLine>) -> Self {
        CreateOrderRequest {
            lines,
            ..Default::default()
        }
    }
}

/// A payment against an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub order_id: String,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    #[serde(default)]
    pub reference_number: Option<String>,
    #[serde(default)]
    pub card_last_four: Option<String>,
    #[serde(default)]
    pub card_type: Option<String>,
    /// Retrying with the same key never charges twice.
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl PaymentRequest {
    pub fn new(order_id: impl Into<String>, amount_cents: i64, method: PaymentMethod) -> Self {
        PaymentRequest {
            order_id: order_id.into(),
            amount_cents,
            method,
            reference_number: None,
            card_last_four: None,
            card_type: None,
            idempotency_key: None,
        }
    }

    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// A manual stock correction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub product_id: String,
    /// Signed change; positive receives stock, negative writes it off.
    pub delta: i64,
    pub reason: String,
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedOrder {
    pub order_id: String,
    pub order_number: String,
    pub totals: OrderTotals,
    pub shift_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResult {
    pub payment_id: String,
    pub status: OrderStatus,
    pub paid: Money,
    pub remaining: Money,
    pub change: Money,
    /// True when an idempotency key matched an earlier payment and nothing
    /// new was applied.
    pub replayed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoidedOrder {
    pub order_id: String,
    /// Return entries written to the ledger.
    pub returned_entries: usize,
    pub restored_quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoidedItem {
    pub order_id: String,
    pub item_id: String,
    pub totals: OrderTotals,
    pub stock_restored: bool,
}

/// An order with its lines and payments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payments: Vec<Payment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenedShift {
    pub shift_id: String,
    pub shift_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftClosure {
    pub shift_id: String,
    pub shift_number: String,
    pub summary: Reconciliation,
}

// =============================================================================
// Engine
// =============================================================================

/// Transaction coordinator over a [`Database`].
///
/// Cheap to clone; clones share the pool.
///
/// ```rust,ignore
/// let engine = Engine::new(db, EngineConfig::default());
/// let created = engine.create_order(&actor, CreateOrderRequest::new(lines)).await?;
/// let paid = engine
///     .process_payment(&actor, PaymentRequest::new(&created.order_id, 3000, PaymentMethod::Cash))
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    db: Database,
    config: EngineConfig,
}

impl Engine {
    pub fn new(db: Database, config: EngineConfig) -> Self {
        Engine { db, config }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

/// The store an actor sells for. Users without one cannot transact.
fn actor_store(actor: &Actor) -> EngineResult<&str> {
    actor
        .store_id
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ValidationError::Required {
                field: "store_id".to_string(),
            }
            .into()
        })
}

// =============================================================================
// Test Fixtures
// =============================================================================
