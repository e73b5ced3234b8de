//! # kasa-db: Persistence and Transaction Engine for Kasa
//!
//! SQLite storage for orders, payments, the inventory ledger and shifts,
//! plus the [`Engine`] that runs every multi-entity change as one
//! all-or-nothing transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kasa Data Flow                                   │
//! │                                                                         │
//! │  HTTP / DTO layer: create_order, process_payment, close_shift, ...     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     kasa-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │    Engine     │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │  (engine/)    │───►│ product order │    │  (embedded)  │  │   │
//! │  │   │ BEGIN IMMED.  │    │ payment shift │    │ 0001_init    │  │   │
//! │  │   │ kasa-core math│    │ inventory seq │    │              │  │   │
//! │  │   └───────┬───────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │           └────────┬───────────┘                               │   │
//! │  │               Database (pool.rs)                               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL, foreign keys, CHECK + UNIQUE guards)                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//! - [`engine`] - The transaction coordinator
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kasa_db::{AppConfig, Database, Engine};
//!
//! let config = AppConfig::load(Some(Path::new("kasa.toml")))?;
//! let db = Database::new(config.database.db_config()).await?;
//! let engine = Engine::new(db, config.engine);
//!
//! let shift = engine.open_shift(&actor, 10_000, None).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{AppConfig, ConfigError, DatabaseSettings, EngineConfig};
pub use engine::{
    CartLine, CreateOrderRequest, CreatedOrder, Engine, EngineError, EngineResult, OpenedShift, OrderDetails,
    PaymentRequest, PaymentResult, ShiftClosure, StockAdjustment, VoidedItem, VoidedOrder,
};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig, DbLocation};

// Repository re-exports for convenience
pub use repository::{InventoryRepository, OrderRepository, PaymentRepository, ProductRepository, ShiftRepository};
