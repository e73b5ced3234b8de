//! # Order Operations
//!
//! ## create_order
//! ```text
//! validate cart (size, quantities, text)            ── no transaction yet
//!      │
//!      ▼
//! BEGIN IMMEDIATE
//!      │
//!      ├── resolve each product (active, same store) ─► NotFound
//!      ├── price each line from a unit snapshot
//!      ├── Σ quantity per tracked product vs stock ─► InsufficientStock
//!      ├── totals, order discount
//!      ├── attach the user's open shift, if any
//!      ├── next order number
//!      ├── INSERT order, then per line:
//!      │     INSERT item
//!      │     tracked? guarded stock −qty ─► InsufficientStock
//!      │              Sale ledger entry
//!      ▼
//! COMMIT  (any error above: transaction dropped, nothing persisted)
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    actor_store, CreateOrderRequest, CreatedOrder, Engine, EngineError, EngineResult, OrderDetails,
    VoidedItem, VoidedOrder,
};
use crate::repository::sequence;
use crate::repository::{InventoryRepository, OrderRepository, ProductRepository, ShiftRepository};
use kasa_core::order::{LinePricing, OrderTotals};
use kasa_core::validation::{validate_cart_size, validate_notes, validate_quantity, validate_reason, validate_uuid};
use kasa_core::{
    Actor, ConflictCode, InventoryTransaction, InventoryTxKind, Money, Order, OrderItem, OrderStatus, Product,
};

impl Engine {
    /// Turns a cart into a Pending order, decrementing tracked stock.
    pub async fn create_order(&self, actor: &Actor, request: CreateOrderRequest) -> EngineResult<CreatedOrder> {
        self.create_order_inner(actor, request)
            .await
            .inspect_err(|e| e.log("create_order"))
    }

    async fn create_order_inner(&self, actor: &Actor, request: CreateOrderRequest) -> EngineResult<CreatedOrder> {
        let store_id = actor_store(actor)?;

        validate_cart_size(request.lines.len(), self.config.max_cart_items)?;
        for line in &request.lines {
            validate_uuid("product_id", &line.product_id)?;
            validate_quantity(line.quantity, self.config.max_item_quantity)?;
            validate_notes("item notes", line.notes.as_deref())?;
        }
        validate_notes("notes", request.notes.as_deref())?;
        validate_notes("table_number", request.table_number.as_deref())?;
        validate_notes("customer_id", request.customer_id.as_deref())?;

        let mut tx = self.db.begin_immediate().await?;
        let now = Utc::now();

        // Resolve and price every line before writing anything.
        let mut priced: Vec<(Product, LinePricing)> = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let product = ProductRepository::find(&mut tx, &line.product_id)
                .await?
                .filter(|p| p.is_active && p.store_id == store_id)
                .ok_or_else(|| EngineError::not_found("Product", &line.product_id))?;

            let pricing = LinePricing::compute(
                product.unit_pricing(),
                line.quantity,
                Money::from_cents(line.discount_cents),
            )?;
            priced.push((product, pricing));
        }

        ensure_stock_covers(&priced)?;

        let lines: Vec<LinePricing> = priced.iter().map(|(_, p)| *p).collect();
        let totals = OrderTotals::from_lines(&lines, Money::from_cents(request.discount_cents))?;

        let shift_id = ShiftRepository::find_open(&mut tx, &actor.user_id, store_id)
            .await?
            .map(|s| s.id);

        let day = now.date_naive();
        let seq = sequence::next_value(&mut tx, &sequence::order_scope(day)).await?;
        let order_number = sequence::format_order_number(&self.config.order_number_prefix, day, seq);

        let order = Order {
            id: Uuid::new_v4().to_string(),
            order_number,
            status: OrderStatus::Pending,
            order_type: request.order_type,
            subtotal_cents: totals.subtotal.cents(),
            discount_cents: totals.discount.cents(),
            tax_cents: totals.tax.cents(),
            total_cents: totals.total.cents(),
            paid_cents: 0,
            change_cents: 0,
            notes: request.notes,
            table_number: request.table_number,
            customer_id: request.customer_id,
            user_id: actor.user_id.clone(),
            store_id: store_id.to_string(),
            shift_id: shift_id.clone(),
            created_at: now,
            completed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
        };
        OrderRepository::insert(&mut tx, &order).await?;

        for (idx, ((product, pricing), line)) in priced.iter().zip(request.lines).enumerate() {
            let item = OrderItem {
                id: Uuid::new_v4().to_string(),
                order_id: order.id.clone(),
                line_no: idx as i64 + 1,
                product_id: product.id.clone(),
                quantity: pricing.quantity,
                unit_price_ex_tax_cents: pricing.unit.ex_tax.cents(),
                unit_tax_cents: pricing.unit.tax.cents(),
                unit_price_inc_tax_cents: pricing.unit.inc_tax.cents(),
                discount_cents: pricing.discount.cents(),
                subtotal_cents: pricing.subtotal.cents(),
                tax_cents: pricing.tax.cents(),
                total_cents: pricing.total.cents(),
                notes: line.notes,
                voided: false,
                voided_at: None,
                void_reason: None,
            };
            OrderRepository::insert_item(&mut tx, &item).await?;

            if product.track_inventory {
                move_stock(
                    &mut tx,
                    product,
                    -pricing.quantity,
                    InventoryTxKind::Sale,
                    &actor.user_id,
                    Some(&order.id),
                    None,
                    now,
                )
                .await?;
            }
        }

        tx.commit().await?;

        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total_cents = order.total_cents,
            lines = lines.len(),
            shift_id = ?order.shift_id,
            "Order created"
        );

        Ok(CreatedOrder {
            order_id: order.id,
            order_number: order.order_number,
            totals,
            shift_id,
        })
    }

    /// Cancels an order, returning stock for every live tracked line.
    pub async fn void_order(&self, actor: &Actor, order_id: &str, reason: &str) -> EngineResult<VoidedOrder> {
        self.void_order_inner(actor, order_id, reason)
            .await
            .inspect_err(|e| e.log("void_order"))
    }

    async fn void_order_inner(&self, actor: &Actor, order_id: &str, reason: &str) -> EngineResult<VoidedOrder> {
        validate_uuid("order_id", order_id)?;
        validate_reason("reason", reason)?;

        let mut tx = self.db.begin_immediate().await?;
        let now = Utc::now();

        let order = load_order(&mut tx, actor, order_id).await?;
        order.status.cancel()?;

        let mut returned_entries = 0;
        let mut restored_quantity = 0;

        for item in OrderRepository::find_items(&mut tx, order_id).await? {
            // Lines voided on their own already had their stock returned.
            if item.voided {
                continue;
            }

            let product = ProductRepository::find(&mut tx, &item.product_id)
                .await?
                .ok_or_else(|| EngineError::not_found("Product", &item.product_id))?;

            if product.track_inventory {
                move_stock(
                    &mut tx,
                    &product,
                    item.quantity,
                    InventoryTxKind::Return,
                    &actor.user_id,
                    Some(order_id),
                    Some(reason),
                    now,
                )
                .await?;
                returned_entries += 1;
                restored_quantity += item.quantity;
            }

            OrderRepository::mark_item_voided(&mut tx, &item.id, reason, now).await?;
        }

        if OrderRepository::mark_cancelled(&mut tx, order_id, reason, now).await? == 0 {
            return Err(EngineError::conflict(
                ConflictCode::OrderAlreadyClosed,
                format!("order {} is already closed", order.order_number),
            ));
        }

        tx.commit().await?;

        info!(
            order_id = %order_id,
            order_number = %order.order_number,
            returned_entries,
            restored_quantity,
            "Order voided"
        );

        Ok(VoidedOrder {
            order_id: order_id.to_string(),
            returned_entries,
            restored_quantity,
        })
    }

    /// Removes a single line from an open order.
    pub async fn void_order_item(
        &self,
        actor: &Actor,
        order_id: &str,
        item_id: &str,
        reason: &str,
    ) -> EngineResult<VoidedItem> {
        self.void_order_item_inner(actor, order_id, item_id, reason)
            .await
            .inspect_err(|e| e.log("void_order_item"))
    }

    async fn void_order_item_inner(
        &self,
        actor: &Actor,
        order_id: &str,
        item_id: &str,
        reason: &str,
    ) -> EngineResult<VoidedItem> {
        validate_uuid("order_id", order_id)?;
        validate_uuid("item_id", item_id)?;
        validate_reason("reason", reason)?;

        let mut tx = self.db.begin_immediate().await?;
        let now = Utc::now();

        let order = load_order(&mut tx, actor, order_id).await?;
        if !order.status.accepts_item_void() {
            return Err(EngineError::conflict(
                ConflictCode::OrderNotEditable,
                format!("order {} is {}", order.order_number, order.status.as_str()),
            ));
        }

        let item = OrderRepository::find_items(&mut tx, order_id)
            .await?
            .into_iter()
            .find(|i| i.id == item_id)
            .ok_or_else(|| EngineError::not_found("OrderItem", item_id))?;

        if item.voided {
            return Err(EngineError::conflict(
                ConflictCode::ItemAlreadyVoided,
                format!("line {} of order {} is already voided", item.line_no, order.order_number),
            ));
        }

        let current = OrderTotals {
            subtotal: Money::from_cents(order.subtotal_cents),
            tax: Money::from_cents(order.tax_cents),
            discount: Money::from_cents(order.discount_cents),
            total: order.total(),
        };
        let totals = current.without_item(&item)?;

        if order.paid().is_positive() && totals.total <= order.paid() {
            return Err(EngineError::conflict(
                ConflictCode::VoidBelowPaid,
                format!(
                    "order {} would total {} with {} already paid",
                    order.order_number,
                    totals.total,
                    order.paid()
                ),
            ));
        }

        let product = ProductRepository::find(&mut tx, &item.product_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Product", &item.product_id))?;

        if product.track_inventory {
            move_stock(
                &mut tx,
                &product,
                item.quantity,
                InventoryTxKind::Return,
                &actor.user_id,
                Some(order_id),
                Some(reason),
                now,
            )
            .await?;
        }

        if OrderRepository::mark_item_voided(&mut tx, item_id, reason, now).await? == 0 {
            return Err(EngineError::conflict(
                ConflictCode::ItemAlreadyVoided,
                format!("line {} of order {} is already voided", item.line_no, order.order_number),
            ));
        }
        OrderRepository::update_totals(&mut tx, order_id, &totals).await?;

        tx.commit().await?;

        info!(
            order_id = %order_id,
            item_id = %item_id,
            total_cents = totals.total.cents(),
            "Order item voided"
        );

        Ok(VoidedItem {
            order_id: order_id.to_string(),
            item_id: item_id.to_string(),
            totals,
            stock_restored: product.track_inventory,
        })
    }

    /// Reads an order with its lines and payments.
    pub async fn get_order(&self, actor: &Actor, order_id: &str) -> EngineResult<OrderDetails> {
        validate_uuid("order_id", order_id)?;

        let order = self
            .db
            .orders()
            .get_by_id(order_id)
            .await?
            .filter(|o| visible_to(actor, &o.store_id))
            .ok_or_else(|| EngineError::not_found("Order", order_id))?;

        let items = self.db.orders().get_items(order_id).await?;
        let payments = self.db.payments().list_for_order(order_id).await?;

        Ok(OrderDetails {
            order,
            items,
            payments,
        })
    }
}

// =============================================================================
// Shared helpers
// =============================================================================

/// Orders of other stores are reported as missing.
pub(super) fn visible_to(actor: &Actor, store_id: &str) -> bool {
    actor.store_id.as_deref() == Some(store_id)
}

/// Loads an order inside the transaction, scoped to the actor's store.
pub(super) async fn load_order(conn: &mut SqliteConnection, actor: &Actor, order_id: &str) -> EngineResult<Order> {
    OrderRepository::find(conn, order_id)
        .await?
        .filter(|o| visible_to(actor, &o.store_id))
        .ok_or_else(|| EngineError::not_found("Order", order_id))
}

/// Checks every tracked product against the stock it had before this order,
/// summing the product's quantity over all cart lines.
fn ensure_stock_covers(priced: &[(Product, LinePricing)]) -> EngineResult<()> {
    let mut requested: HashMap<&str, i64> = HashMap::new();
    for (product, pricing) in priced.iter().filter(|(p, _)| p.track_inventory) {
        *requested.entry(product.id.as_str()).or_insert(0) += pricing.quantity;
    }

    for (product, _) in priced {
        let Some(&wanted) = requested.get(product.id.as_str()) else {
            continue;
        };
        if wanted > product.current_stock {
            return Err(EngineError::InsufficientStock {
                product_id: product.id.clone(),
                requested: wanted,
                available: product.current_stock,
            });
        }
    }

    Ok(())
}

/// Applies a stock change and writes the matching ledger entry.
///
/// Fails with `InsufficientStock` when the guarded update finds too little
/// stock; the caller's transaction is then dropped.
#[allow(clippy::too_many_arguments)]
pub(super) async fn move_stock(
    conn: &mut SqliteConnection,
    product: &Product,
    delta: i64,
    kind: InventoryTxKind,
    user_id: &str,
    order_id: Option<&str>,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> EngineResult<InventoryTransaction> {
    let stock_after = match ProductRepository::apply_stock_delta(conn, &product.id, delta, now).await? {
        Some(after) => after,
        None => {
            let available = ProductRepository::find(conn, &product.id)
                .await?
                .map(|p| p.current_stock)
                .unwrap_or(0);
            return Err(EngineError::InsufficientStock {
                product_id: product.id.clone(),
                requested: -delta,
                available,
            });
        }
    };

    let entry = InventoryTransaction {
        id: Uuid::new_v4().to_string(),
        product_id: product.id.clone(),
        store_id: product.store_id.clone(),
        kind,
        quantity_delta: delta,
        stock_before: stock_after - delta,
        stock_after,
        user_id: user_id.to_string(),
        order_id: order_id.map(str::to_string),
        notes: notes.map(str::to_string),
        created_at: now,
    };
    InventoryRepository::append(conn, &entry).await?;

    debug!(product_id = %product.id, ?kind, delta, stock_after, "Stock moved");
    Ok(entry)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::super::{CartLine, CreateOrderRequest, PaymentRequest};
    use super::*;
    use kasa_core::{PaymentMethod, Role};

    #[tokio::test]
    async fn test_reference_cart() {
        let engine = engine().await;
        let a = add_product(&engine, 1000, 1000, 10, true).await;
        let b = add_product(&engine, 500, 1000, 10, true).await;
        let actor = cashier("u1");

        let created = engine
            .create_order(&actor, CreateOrderRequest::new(vec![CartLine::new(&a, 2), CartLine::new(&b, 1)]))
            .await
            .unwrap();

        assert_eq!(created.totals.subtotal.cents(), 2500);
        assert_eq!(created.totals.tax.cents(), 250);
        assert_eq!(created.totals.total.cents(), 2750);
        assert!(created.order_number.starts_with("ORD-"));
        assert!(created.order_number.ends_with("-00001"));

        let details = engine.get_order(&actor, &created.order_id).await.unwrap();
        assert_eq!(details.order.status, OrderStatus::Pending);
        let by_number = engine.database().orders().get_by_number(&created.order_number).await.unwrap().unwrap();
        assert_eq!(by_number.id, created.order_id);
        assert!(engine.database().orders().get_by_number("ORD-00000000-00000").await.unwrap().is_none());
        assert_eq!(
            details.order.total_cents,
            details.order.subtotal_cents + details.order.tax_cents - details.order.discount_cents
        );
        assert_eq!(details.items.len(), 2);
        assert_eq!(details.items[0].unit_price_inc_tax_cents, 1100);
        assert_eq!(details.items[0].total_cents, 2200);
        assert_eq!(stock_of(&engine, &a).await, 8);
        assert_eq!(stock_of(&engine, &b).await, 9);

        let ledger = engine.database().inventory().list_for_order(&created.order_id).await.unwrap();
        assert_eq!(ledger.len(), 2);
        assert!(ledger.iter().all(|e| e.kind == InventoryTxKind::Sale));
        assert_eq!(ledger[0].stock_before, 10);
        assert_eq!(ledger[0].stock_after, 8);
    }

    #[tokio::test]
    async fn test_insufficient_stock_persists_nothing() {
        let engine = engine().await;
        let a = add_product(&engine, 1000, 1000, 5, true).await;
        let b = add_product(&engine, 500, 1000, 10, true).await;

        let err = engine
            .create_order(&cashier("u1"), CreateOrderRequest::new(vec![CartLine::new(&b, 1), CartLine::new(&a, 6)]))
            .await
            .unwrap_err();

        match err {
            EngineError::InsufficientStock {
                product_id,
                requested,
                available,
            } => {
                assert_eq!(product_id, a);
                assert_eq!(requested, 6);
                assert_eq!(available, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(stock_of(&engine, &a).await, 5);
        assert_eq!(stock_of(&engine, &b).await, 10);
        assert_eq!(count(&engine, "orders").await, 0);
        assert_eq!(count(&engine, "order_items").await, 0);
        assert_eq!(count(&engine, "inventory_transactions").await, 0);
        assert_eq!(count(&engine, "number_sequences").await, 0);
    }

    #[tokio::test]
    async fn test_same_product_on_two_lines_counts_cumulatively() {
        let engine = engine().await;
        let a = add_product(&engine, 1000, 0, 5, true).await;

        let err = engine
            .create_order(&cashier("u1"), CreateOrderRequest::new(vec![CartLine::new(&a, 3), CartLine::new(&a, 3)]))
            .await
            .unwrap_err();

        match err {
            EngineError::InsufficientStock {
                requested, available, ..
            } => {
                assert_eq!(requested, 6);
                assert_eq!(available, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(stock_of(&engine, &a).await, 5);

        let created = engine
            .create_order(&cashier("u1"), CreateOrderRequest::new(vec![CartLine::new(&a, 2), CartLine::new(&a, 3)]))
            .await
            .unwrap();
        assert_eq!(stock_of(&engine, &a).await, 0);

        let ledger = engine.database().inventory().list_for_order(&created.order_id).await.unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!((ledger[0].stock_before, ledger[0].stock_after), (5, 3));
        assert_eq!((ledger[1].stock_before, ledger[1].stock_after), (3, 0));
    }

    #[tokio::test]
    async fn test_untracked_products_skip_the_ledger() {
        let engine = engine().await;
        let service = add_product(&engine, 2500, 0, 0, false).await;

        let created = engine
            .create_order(&cashier("u1"), CreateOrderRequest::new(vec![CartLine::new(&service, 3)]))
            .await
            .unwrap();

        assert_eq!(created.totals.total.cents(), 7500);
        assert_eq!(count(&engine, "inventory_transactions").await, 0);
    }

    #[tokio::test]
    async fn test_unknown_or_foreign_product_is_not_found() {
        let engine = engine().await;
        let a = add_product(&engine, 1000, 0, 5, true).await;
        let missing = Uuid::new_v4().to_string();

        let err = engine
            .create_order(&cashier("u1"), CreateOrderRequest::new(vec![CartLine::new(&a, 1), CartLine::new(&missing, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "Product", .. }));
        assert_eq!(stock_of(&engine, &a).await, 5);

        let elsewhere = Actor::new("u9", "store-2", Role::Cashier);
        let err = engine
            .create_order(&elsewhere, CreateOrderRequest::new(vec![CartLine::new(&a, 1)]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_open_shift_in_another_store_is_not_attached() {
        let engine = engine().await;
        let home = add_product(&engine, 1000, 0, 5, true).await;
        let away = add_product_in(&engine, "store-2", 1000, 0, 5, true).await;

        let opened = engine.open_shift(&cashier("u1"), 0, None).await.unwrap();

        let visiting = Actor::new("u1", "store-2", Role::Cashier);
        let created = engine
            .create_order(&visiting, CreateOrderRequest::new(vec![CartLine::new(&away, 1)]))
            .await
            .unwrap();
        assert!(created.shift_id.is_none());
        let order = engine.get_order(&visiting, &created.order_id).await.unwrap().order;
        assert!(order.shift_id.is_none());

        let at_home = engine
            .create_order(&cashier("u1"), CreateOrderRequest::new(vec![CartLine::new(&home, 1)]))
            .await
            .unwrap();
        assert_eq!(at_home.shift_id.as_deref(), Some(opened.shift_id.as_str()));
    }

    #[tokio::test]
    async fn test_cart_validation() {
        let engine = engine().await;
        let a = add_product(&engine, 1000, 0, 5, true).await;
        let actor = cashier("u1");

        let empty = engine.create_order(&actor, CreateOrderRequest::new(vec![])).await.unwrap_err();
        assert_eq!(empty.code(), "VALIDATION_ERROR");

        let zero = engine
            .create_order(&actor, CreateOrderRequest::new(vec![CartLine::new(&a, 0)]))
            .await
            .unwrap_err();
        assert_eq!(zero.code(), "VALIDATION_ERROR");

        let huge = engine
            .create_order(&actor, CreateOrderRequest::new(vec![CartLine::new(&a, 1000)]))
            .await
            .unwrap_err();
        assert_eq!(huge.code(), "VALIDATION_ERROR");

        let too_much_discount = engine
            .create_order(&actor, CreateOrderRequest::new(vec![CartLine::new(&a, 1).with_discount(1001)]))
            .await
            .unwrap_err();
        assert_eq!(too_much_discount.code(), "VALIDATION_ERROR");

        let no_store = Actor {
            user_id: "u1".to_string(),
            store_id: None,
            role: Role::Cashier,
        };
        let err = engine
            .create_order(&no_store, CreateOrderRequest::new(vec![CartLine::new(&a, 1)]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        assert_eq!(stock_of(&engine, &a).await, 5);
    }

    #[tokio::test]
    async fn test_discounts_flow_into_total() {
        let engine = engine().await;
        let a = add_product(&engine, 1000, 1000, 10, true).await;

        let mut request = CreateOrderRequest::new(vec![CartLine::new(&a, 2).with_discount(200)]);
        request.discount_cents = 100;
        let created = engine.create_order(&cashier("u1"), request).await.unwrap();

        assert_eq!(created.totals.discount.cents(), 300);
        assert_eq!(created.totals.total.cents(), 2200 - 300);
    }

    #[tokio::test]
    async fn test_order_numbers_are_sequential() {
        let engine = engine().await;
        let a = add_product(&engine, 100, 0, 100, true).await;
        let actor = cashier("u1");

        let first = engine.create_order(&actor, CreateOrderRequest::new(vec![CartLine::new(&a, 1)])).await.unwrap();
        let second = engine.create_order(&actor, CreateOrderRequest::new(vec![CartLine::new(&a, 1)])).await.unwrap();

        assert!(first.order_number.ends_with("-00001"));
        assert!(second.order_number.ends_with("-00002"));
    }

    #[tokio::test]
    async fn test_void_restores_live_items_once() {
        let engine = engine().await;
        let a = add_product(&engine, 1000, 1000, 10, true).await;
        let b = add_product(&engine, 500, 1000, 10, true).await;
        let c = add_product(&engine, 300, 0, 10, true).await;
        let actor = cashier("u1");

        let created = engine
            .create_order(
                &actor,
                CreateOrderRequest::new(vec![CartLine::new(&a, 2), CartLine::new(&b, 1), CartLine::new(&c, 4)]),
            )
            .await
            .unwrap();
        let details = engine.get_order(&actor, &created.order_id).await.unwrap();

        // Line for B goes first on its own.
        engine
            .void_order_item(&actor, &created.order_id, &details.items[1].id, "customer changed mind")
            .await
            .unwrap();
        assert_eq!(stock_of(&engine, &b).await, 10);

        let voided = engine.void_order(&actor, &created.order_id, "walked out").await.unwrap();
        assert_eq!(voided.returned_entries, 2);
        assert_eq!(voided.restored_quantity, 6);

        assert_eq!(stock_of(&engine, &a).await, 10);
        assert_eq!(stock_of(&engine, &b).await, 10);
        assert_eq!(stock_of(&engine, &c).await, 10);

        let details = engine.get_order(&actor, &created.order_id).await.unwrap();
        assert_eq!(details.order.status, OrderStatus::Cancelled);
        assert_eq!(details.order.cancellation_reason.as_deref(), Some("walked out"));
        assert!(details.order.cancelled_at.is_some());
        assert!(details.items.iter().all(|i| i.voided));

        let returns = engine
            .database()
            .inventory()
            .list_for_order(&created.order_id)
            .await
            .unwrap()
            .into_iter()
            .filter(|e| e.kind == InventoryTxKind::Return)
            .count();
        assert_eq!(returns, 3);

        let again = engine.void_order(&actor, &created.order_id, "twice").await.unwrap_err();
        assert_eq!(again.conflict_code(), Some(ConflictCode::OrderAlreadyClosed));
        assert_eq!(stock_of(&engine, &a).await, 10);
    }

    #[tokio::test]
    async fn test_void_completed_order() {
        let engine = engine().await;
        let a = add_product(&engine, 1000, 0, 3, true).await;
        let actor = cashier("u1");

        let created = engine.create_order(&actor, CreateOrderRequest::new(vec![CartLine::new(&a, 3)])).await.unwrap();
        engine
            .process_payment(&actor, PaymentRequest::new(&created.order_id, 3000, PaymentMethod::Cash))
            .await
            .unwrap();
        assert_eq!(stock_of(&engine, &a).await, 0);

        engine.void_order(&actor, &created.order_id, "refund at till").await.unwrap();
        assert_eq!(stock_of(&engine, &a).await, 3);

        let err = engine
            .process_payment(&actor, PaymentRequest::new(&created.order_id, 100, PaymentMethod::Cash))
            .await
            .unwrap_err();
        assert_eq!(err.conflict_code(), Some(ConflictCode::OrderNotPayable));
    }

    #[tokio::test]
    async fn test_void_order_item_rules() {
        let engine = engine().await;
        let a = add_product(&engine, 1000, 0, 10, true).await;
        let b = add_product(&engine, 500, 0, 10, true).await;
        let actor = cashier("u1");

        let created = engine
            .create_order(&actor, CreateOrderRequest::new(vec![CartLine::new(&a, 1), CartLine::new(&b, 1)]))
            .await
            .unwrap();
        let items = engine.get_order(&actor, &created.order_id).await.unwrap().items;

        // $12 paid of $15; dropping A ($10) would leave $5 ≤ $12.
        engine
            .process_payment(&actor, PaymentRequest::new(&created.order_id, 1200, PaymentMethod::Cash))
            .await
            .unwrap();
        let err = engine
            .void_order_item(&actor, &created.order_id, &items[0].id, "wrong item")
            .await
            .unwrap_err();
        assert_eq!(err.conflict_code(), Some(ConflictCode::VoidBelowPaid));
        assert_eq!(stock_of(&engine, &a).await, 9);

        // Dropping B leaves $10, still below $12 paid.
        let err = engine
            .void_order_item(&actor, &created.order_id, &items[1].id, "wrong item")
            .await
            .unwrap_err();
        assert_eq!(err.conflict_code(), Some(ConflictCode::VoidBelowPaid));

        let fresh = engine
            .create_order(&actor, CreateOrderRequest::new(vec![CartLine::new(&a, 1), CartLine::new(&b, 2)]))
            .await
            .unwrap();
        let fresh_items = engine.get_order(&actor, &fresh.order_id).await.unwrap().items;

        let voided = engine
            .void_order_item(&actor, &fresh.order_id, &fresh_items[1].id, "only wanted one")
            .await
            .unwrap();
        assert!(voided.stock_restored);
        assert_eq!(voided.totals.total.cents(), 1000);
        assert_eq!(stock_of(&engine, &b).await, 9);

        let err = engine
            .void_order_item(&actor, &fresh.order_id, &fresh_items[1].id, "again")
            .await
            .unwrap_err();
        assert_eq!(err.conflict_code(), Some(ConflictCode::ItemAlreadyVoided));

        let order = engine.get_order(&actor, &fresh.order_id).await.unwrap().order;
        assert_eq!(order.subtotal_cents, 1000);
        assert_eq!(order.total_cents, 1000);
    }

    #[tokio::test]
    async fn test_void_item_on_completed_order_rejected() {
        let engine = engine().await;
        let a = add_product(&engine, 1000, 0, 10, true).await;
        let actor = cashier("u1");

        let created = engine.create_order(&actor, CreateOrderRequest::new(vec![CartLine::new(&a, 1)])).await.unwrap();
        let items = engine.get_order(&actor, &created.order_id).await.unwrap().items;
        engine
            .process_payment(&actor, PaymentRequest::new(&created.order_id, 1000, PaymentMethod::CreditCard))
            .await
            .unwrap();

        let err = engine
            .void_order_item(&actor, &created.order_id, &items[0].id, "too late")
            .await
            .unwrap_err();
        assert_eq!(err.conflict_code(), Some(ConflictCode::OrderNotEditable));
    }

    #[tokio::test]
    async fn test_get_order_is_store_scoped() {
        let engine = engine().await;
        let a = add_product(&engine, 1000, 0, 10, true).await;

        let created = engine
            .create_order(&cashier("u1"), CreateOrderRequest::new(vec![CartLine::new(&a, 1)]))
            .await
            .unwrap();

        let elsewhere = Actor::new("u9", "store-2", Role::Manager);
        let err = engine.get_order(&elsewhere, &created.order_id).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "Order", .. }));

        let err = engine.get_order(&cashier("u1"), "not-a-uuid").await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
