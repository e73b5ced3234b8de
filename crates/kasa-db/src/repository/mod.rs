//! # Repository Module
//!
//! Database repository implementations for Kasa.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Two Ways Into a Repository                           │
//! │                                                                         │
//! │  Reads (audit, lookups)                 Writes (engine only)            │
//! │  ─────────────────────                  ─────────────────────           │
//! │  db.orders().get_by_id(id)              OrderRepository::insert(        │
//! │       │                                     &mut *tx, &order)           │
//! │       │  &self, owns a pool clone            │  associated fn, borrows    │
//! │       ▼                                      ▼  the open transaction      │
//! │  SqlitePool (any connection)            Transaction<'_, Sqlite>         │
//! │                                         (BEGIN IMMEDIATE, see pool.rs)  │
//! │                                                                         │
//! │  Write helpers never commit. The engine decides when the whole         │
//! │  unit of work is done.                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`] - Product lookups and guarded stock updates
//! - [`OrderRepository`] - Order headers and line items
//! - [`PaymentRepository`] - Append-only payments and shift sales sums
//! - [`InventoryRepository`] - Append-only stock ledger
//! - [`ShiftRepository`] - Cash drawer sessions
//! - [`sequence`] - Daily counters for order and shift numbers

pub mod inventory;
pub mod order;
pub mod payment;
pub mod product;
pub mod sequence;
pub mod shift;

pub use inventory::InventoryRepository;
pub use order::OrderRepository;
pub use payment::PaymentRepository;
pub use product::ProductRepository;
pub use shift::ShiftRepository;
