//! # Inventory Operations
//!
//! Manual stock corrections and the audit view of the ledger. Sales and
//! returns write the ledger from `orders.rs`.

use chrono::Utc;
use tracing::info;

use super::orders::move_stock;
use super::{actor_store, Engine, EngineError, EngineResult, StockAdjustment};
use crate::repository::ProductRepository;
use kasa_core::validation::{validate_reason, validate_uuid};
use kasa_core::{Actor, InventoryTransaction, InventoryTxKind, ValidationError};

impl Engine {
    /// Applies a signed stock correction. Managers and admins only.
    pub async fn adjust_stock(&self, actor: &Actor, adjustment: StockAdjustment) -> EngineResult<InventoryTransaction> {
        self.adjust_stock_inner(actor, adjustment)
            .await
            .inspect_err(|e| e.log("adjust_stock"))
    }

    async fn adjust_stock_inner(&self, actor: &Actor, adjustment: StockAdjustment) -> EngineResult<InventoryTransaction> {
        if !actor.role.is_elevated() {
            return Err(EngineError::Authorization(format!(
                "user {} may not adjust stock",
                actor.user_id
            )));
        }

        let store_id = actor_store(actor)?;
        validate_uuid("product_id", &adjustment.product_id)?;
        validate_reason("reason", &adjustment.reason)?;
        if adjustment.delta == 0 {
            return Err(ValidationError::InvalidFormat {
                field: "delta".to_string(),
                reason: "must not be zero".to_string(),
            }
            .into());
        }

        let mut tx = self.db.begin_immediate().await?;
        let now = Utc::now();

        let product = ProductRepository::find(&mut tx, &adjustment.product_id)
            .await?
            .filter(|p| p.store_id == store_id)
            .ok_or_else(|| EngineError::not_found("Product", &adjustment.product_id))?;

        if !product.track_inventory {
            return Err(ValidationError::InvalidFormat {
                field: "product_id".to_string(),
                reason: "product does not track inventory".to_string(),
            }
            .into());
        }

        let entry = move_stock(
            &mut tx,
            &product,
            adjustment.delta,
            InventoryTxKind::Adjustment,
            &actor.user_id,
            None,
            Some(&adjustment.reason),
            now,
        )
        .await?;

        tx.commit().await?;

        info!(
            product_id = %product.id,
            delta = entry.quantity_delta,
            stock_after = entry.stock_after,
            user_id = %actor.user_id,
            "Stock adjusted"
        );

        Ok(entry)
    }

    /// Ledger entries of a product, oldest first.
    pub async fn inventory_history(&self, product_id: &str) -> EngineResult<Vec<InventoryTransaction>> {
        validate_uuid("product_id", product_id)?;

        if self.db.products().get_by_id(product_id).await?.is_none() {
            return Err(EngineError::not_found("Product", product_id));
        }

        Ok(self.db.inventory().history(product_id).await?)
    }
}

// =============================================================================
// Tests
// =============================================================================
