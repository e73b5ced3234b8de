//! # kasa-core: Pure Business Logic for Kasa
//!
//! The domain half of the point-of-sale transaction engine. Everything here is
//! deterministic and free of I/O; `kasa-db` feeds it rows and persists what it
//! returns.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kasa Architecture                                │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            HTTP / DTO layer (external collaborator)             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          kasa-db::Engine (transaction coordinator)              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kasa-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   order   │  │   shift   │  │   │
//! │  │   │  entities │  │   Money   │  │  pricing  │  │ reconcile │  │   │
//! │  │   │   Actor   │  │  rounding │  │  status   │  │  buckets  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entities (Product, Order, OrderItem, Payment, InventoryTransaction, Shift)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`order`] - Line/order pricing, status state machine, payment settlement
//! - [`shift`] - Payment buckets and cash reconciliation
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use kasa_core::money::Money;
//! use kasa_core::types::TaxRate;
//!
//! let price = Money::from_cents(1000); // $10.00
//! let tax = price.calculate_tax(TaxRate::from_bps(1000)); // 10%
//! assert_eq!(tax.cents(), 100);
//! ```

pub mod error;
pub mod money;
pub mod order;
pub mod shift;
pub mod types;
pub mod validation;

pub use error::{ConflictCode, CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

/// Maximum lines allowed in a single cart unless configured otherwise.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line unless configured otherwise.
///
/// Catches typos like 1000 instead of 10 at the till.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum length of free-text fields (notes, reasons).
pub const MAX_NOTES_LEN: usize = 500;
