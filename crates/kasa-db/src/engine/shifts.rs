//! # Shift Operations
//!
//! ## open_shift
//! The insert itself is the check: a second open shift for the same user hits
//! `idx_shifts_one_open_per_user` and comes back as `SHIFT_ALREADY_OPEN`.
//!
//! ## close_shift
//! ```text
//! BEGIN IMMEDIATE
//!   shift open? actor owner or elevated?
//!   no Pending/Processing orders left ─► SHIFT_HAS_OPEN_ORDERS
//!   Σ completed payments on live orders, by bucket
//!   count completed orders
//!   Reconciliation::compute
//!   UPDATE shifts ... WHERE status = 'open'
//! COMMIT
//! ```
//! Orders created after the commit no longer find an open shift, and every
//! order of the shift is settled or cancelled by then, so no payment can land
//! on a closed shift.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::orders::visible_to;
use super::{actor_store, Engine, EngineError, EngineResult, OpenedShift, ShiftClosure};
use crate::repository::sequence;
use crate::repository::shift::OPEN_SHIFT_CONSTRAINT;
use crate::repository::{PaymentRepository, ShiftRepository};
use kasa_core::shift::{append_notes, ensure_closable, Reconciliation, SalesTotals};
use kasa_core::validation::{validate_cash_amount, validate_notes, validate_uuid};
use kasa_core::{Actor, ConflictCode, Money, Shift, ShiftStatus};

impl Engine {
    /// Opens a cash drawer session for the acting user.
    pub async fn open_shift(
        &self,
        actor: &Actor,
        starting_cash_cents: i64,
        notes: Option<&str>,
    ) -> EngineResult<OpenedShift> {
        self.open_shift_inner(actor, starting_cash_cents, notes)
            .await
            .inspect_err(|e| e.log("open_shift"))
    }

    async fn open_shift_inner(
        &self,
        actor: &Actor,
        starting_cash_cents: i64,
        notes: Option<&str>,
    ) -> EngineResult<OpenedShift> {
        let store_id = actor_store(actor)?;
        validate_cash_amount("starting_cash", starting_cash_cents)?;
        validate_notes("notes", notes)?;

        let mut tx = self.db.begin_immediate().await?;
        let now = Utc::now();

        let day = now.date_naive();
        let seq = sequence::next_value(&mut tx, &sequence::shift_scope(day)).await?;

        let shift = Shift {
            id: Uuid::new_v4().to_string(),
            shift_number: sequence::format_shift_number(&self.config.shift_number_prefix, day, seq),
            user_id: actor.user_id.clone(),
            store_id: store_id.to_string(),
            status: ShiftStatus::Open,
            start_time: now,
            end_time: None,
            starting_cash_cents,
            ending_cash_cents: None,
            cash_sales_cents: None,
            card_sales_cents: None,
            other_sales_cents: None,
            total_sales_cents: None,
            total_orders: None,
            expected_cash_cents: None,
            cash_difference_cents: None,
            closed_by: None,
            notes: notes.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string),
        };

        ShiftRepository::insert(&mut tx, &shift).await.map_err(|e| {
            if e.is_unique_violation_on(OPEN_SHIFT_CONSTRAINT) {
                EngineError::conflict(
                    ConflictCode::ShiftAlreadyOpen,
                    format!("user {} already has an open shift", actor.user_id),
                )
            } else {
                e.into()
            }
        })?;

        tx.commit().await?;

        info!(
            shift_id = %shift.id,
            shift_number = %shift.shift_number,
            user_id = %shift.user_id,
            starting_cash_cents,
            "Shift opened"
        );

        Ok(OpenedShift {
            shift_id: shift.id,
            shift_number: shift.shift_number,
        })
    }

    /// Closes a shift and records the cash reconciliation.
    pub async fn close_shift(
        &self,
        actor: &Actor,
        shift_id: &str,
        counted_cash_cents: i64,
        notes: Option<&str>,
    ) -> EngineResult<ShiftClosure> {
        self.close_shift_inner(actor, shift_id, counted_cash_cents, notes)
            .await
            .inspect_err(|e| e.log("close_shift"))
    }

    async fn close_shift_inner(
        &self,
        actor: &Actor,
        shift_id: &str,
        counted_cash_cents: i64,
        notes: Option<&str>,
    ) -> EngineResult<ShiftClosure> {
        validate_uuid("shift_id", shift_id)?;
        validate_cash_amount("counted_cash", counted_cash_cents)?;
        validate_notes("notes", notes)?;

        let mut tx = self.db.begin_immediate().await?;
        let now = Utc::now();

        let shift = ShiftRepository::find(&mut tx, shift_id)
            .await?
            .filter(|s| visible_to(actor, &s.store_id))
            .ok_or_else(|| EngineError::not_found("Shift", shift_id))?;
        ensure_closable(&shift, actor)?;

        let open_orders = ShiftRepository::count_open_orders(&mut tx, shift_id).await?;
        if open_orders > 0 {
            return Err(EngineError::conflict(
                ConflictCode::ShiftHasOpenOrders,
                format!("shift {} has {open_orders} unpaid orders", shift.shift_number),
            ));
        }

        let sales = SalesTotals::from_payments(PaymentRepository::sales_by_method_for_shift(&mut tx, shift_id).await?);
        let completed_orders = ShiftRepository::count_completed_orders(&mut tx, shift_id).await?;

        let summary = Reconciliation::compute(
            shift.starting_cash(),
            Money::from_cents(counted_cash_cents),
            sales,
            completed_orders,
        );
        let notes = append_notes(shift.notes.as_deref(), notes);

        let closed = ShiftRepository::close(&mut tx, shift_id, &summary, &actor.user_id, notes.as_deref(), now).await?;
        if closed == 0 {
            return Err(EngineError::conflict(
                ConflictCode::ShiftNotOpen,
                format!("shift {} is already closed", shift.shift_number),
            ));
        }

        tx.commit().await?;

        if summary.is_shortage() {
            warn!(
                shift_id = %shift_id,
                shift_number = %shift.shift_number,
                cash_difference_cents = summary.cash_difference.cents(),
                "Shift closed with cash shortage"
            );
        }
        info!(
            shift_id = %shift_id,
            shift_number = %shift.shift_number,
            total_sales_cents = summary.total_sales.cents(),
            total_orders = summary.total_orders,
            expected_cash_cents = summary.expected_cash.cents(),
            cash_difference_cents = summary.cash_difference.cents(),
            "Shift closed"
        );

        Ok(ShiftClosure {
            shift_id: shift_id.to_string(),
            shift_number: shift.shift_number,
            summary,
        })
    }

    /// The user's open shift, read from storage on every call.
    pub async fn current_shift(&self, user_id: &str) -> EngineResult<Option<Shift>> {
        Ok(self.db.shifts().find_open_for_user(user_id).await?)
    }

    pub async fn get_shift(&self, shift_id: &str) -> EngineResult<Shift> {
        validate_uuid("shift_id", shift_id)?;

        self.db
            .shifts()
            .get_by_id(shift_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Shift", shift_id))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::super::{CartLine, CreateOrderRequest, PaymentRequest};
    use super::*;
    use crate::config::EngineConfig;
    use crate::{Database, DbConfig};
    use kasa_core::{OrderStatus, PaymentMethod};

    #[tokio::test]
    async fn test_open_shift_once_per_user() {
        let engine = engine().await;
        let actor = cashier("u1");

        let opened = engine.open_shift(&actor, 10_000, Some("float counted")).await.unwrap();
        assert!(opened.shift_number.starts_with("SH-"));
        assert!(opened.shift_number.ends_with("-001"));

        let err = engine.open_shift(&actor, 10_000, None).await.unwrap_err();
        assert_eq!(err.code(), "SHIFT_ALREADY_OPEN");

        // Another cashier is unaffected.
        let other = engine.open_shift(&cashier("u2"), 5_000, None).await.unwrap();
        assert!(other.shift_number.ends_with("-002"));

        let current = engine.current_shift("u1").await.unwrap().unwrap();
        assert_eq!(current.id, opened.shift_id);
        assert_eq!(current.notes.as_deref(), Some("float counted"));
    }

    #[tokio::test]
    async fn test_close_shift_shortage() {
        let engine = engine().await;
        let actor = cashier("u1");
        let p = add_product(&engine, 1000, 0, 100, true).await;

        let opened = engine.open_shift(&actor, 10_000, Some("opening")).await.unwrap();

        let cash = engine.create_order(&actor, CreateOrderRequest::new(vec![CartLine::new(&p, 15)])).await.unwrap();
        assert_eq!(cash.shift_id.as_deref(), Some(opened.shift_id.as_str()));
        engine
            .process_payment(&actor, PaymentRequest::new(&cash.order_id, 15_000, PaymentMethod::Cash))
            .await
            .unwrap();

        let card = engine.create_order(&actor, CreateOrderRequest::new(vec![CartLine::new(&p, 8)])).await.unwrap();
        engine
            .process_payment(&actor, PaymentRequest::new(&card.order_id, 8_000, PaymentMethod::CreditCard))
            .await
            .unwrap();

        // Voided orders contribute nothing, paid or not.
        let abandoned = engine.create_order(&actor, CreateOrderRequest::new(vec![CartLine::new(&p, 1)])).await.unwrap();
        engine.void_order(&actor, &abandoned.order_id, "never paid").await.unwrap();
        let voided = engine.create_order(&actor, CreateOrderRequest::new(vec![CartLine::new(&p, 2)])).await.unwrap();
        engine
            .process_payment(&actor, PaymentRequest::new(&voided.order_id, 2_000, PaymentMethod::Cash))
            .await
            .unwrap();
        engine.void_order(&actor, &voided.order_id, "customer left").await.unwrap();

        let closure = engine.close_shift(&actor, &opened.shift_id, 24_800, Some("short two dollars")).await.unwrap();
        let s = &closure.summary;

        assert_eq!(s.cash_sales.cents(), 15_000);
        assert_eq!(s.card_sales.cents(), 8_000);
        assert_eq!(s.other_sales, Money::zero());
        assert_eq!(s.total_sales.cents(), 23_000);
        assert_eq!(s.total_orders, 2);
        assert_eq!(s.expected_cash.cents(), 25_000);
        assert_eq!(s.cash_difference.cents(), -200);

        let shift = engine.get_shift(&opened.shift_id).await.unwrap();
        assert_eq!(shift.status, ShiftStatus::Closed);
        assert!(shift.end_time.is_some());
        assert_eq!(shift.ending_cash_cents, Some(24_800));
        assert_eq!(shift.expected_cash_cents, Some(25_000));
        assert_eq!(shift.cash_difference_cents, Some(-200));
        assert_eq!(shift.total_orders, Some(2));
        assert_eq!(shift.closed_by.as_deref(), Some("u1"));
        assert_eq!(shift.notes.as_deref(), Some("opening\nshort two dollars"));

        let orders = engine.database().orders().list_for_shift(&opened.shift_id).await.unwrap();
        assert_eq!(orders.len(), 4);
        assert_eq!(orders[0].id, cash.order_id);
        assert_eq!(orders[1].id, card.order_id);
        assert_eq!(orders.iter().filter(|o| o.status == OrderStatus::Cancelled).count(), 2);
    }

    #[tokio::test]
    async fn test_close_shift_waits_for_unpaid_orders() {
        let engine = engine().await;
        let actor = cashier("u1");
        let p = add_product(&engine, 1000, 0, 10, true).await;

        let first = engine.open_shift(&actor, 0, None).await.unwrap();
        let order = engine.create_order(&actor, CreateOrderRequest::new(vec![CartLine::new(&p, 1)])).await.unwrap();
        engine
            .process_payment(&actor, PaymentRequest::new(&order.order_id, 400, PaymentMethod::Cash))
            .await
            .unwrap();

        // Partly paid is still open.
        let err = engine.close_shift(&actor, &first.shift_id, 400, None).await.unwrap_err();
        assert_eq!(err.conflict_code(), Some(ConflictCode::ShiftHasOpenOrders));
        assert!(engine.get_shift(&first.shift_id).await.unwrap().is_open());

        // A second shift cannot be opened to take the payment elsewhere.
        let err = engine.open_shift(&actor, 0, None).await.unwrap_err();
        assert_eq!(err.code(), "SHIFT_ALREADY_OPEN");

        engine
            .process_payment(&actor, PaymentRequest::new(&order.order_id, 600, PaymentMethod::Cash))
            .await
            .unwrap();

        let closure = engine.close_shift(&actor, &first.shift_id, 1000, None).await.unwrap();
        assert_eq!(closure.summary.cash_sales.cents(), 1000);
        assert_eq!(closure.summary.total_orders, 1);
        assert_eq!(closure.summary.cash_difference, Money::zero());
    }

    #[tokio::test]
    async fn test_closed_shift_is_final() {
        let engine = engine().await;
        let actor = cashier("u1");
        let p = add_product(&engine, 1000, 0, 10, true).await;

        let opened = engine.open_shift(&actor, 0, None).await.unwrap();
        engine.close_shift(&actor, &opened.shift_id, 0, None).await.unwrap();

        let err = engine.close_shift(&actor, &opened.shift_id, 0, None).await.unwrap_err();
        assert_eq!(err.conflict_code(), Some(ConflictCode::ShiftNotOpen));

        assert!(engine.current_shift("u1").await.unwrap().is_none());
        let later = engine.create_order(&actor, CreateOrderRequest::new(vec![CartLine::new(&p, 1)])).await.unwrap();
        assert!(later.shift_id.is_none());

        // A fresh shift may be opened once the old one is closed.
        engine.open_shift(&actor, 0, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_close_shift_authorization() {
        let engine = engine().await;
        let opened = engine.open_shift(&cashier("u1"), 5_000, None).await.unwrap();

        let err = engine.close_shift(&cashier("u2"), &opened.shift_id, 5_000, None).await.unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED");
        assert!(engine.get_shift(&opened.shift_id).await.unwrap().is_open());

        let closure = engine.close_shift(&manager("m1"), &opened.shift_id, 5_000, None).await.unwrap();
        assert_eq!(closure.summary.cash_difference, Money::zero());
        let shift = engine.get_shift(&opened.shift_id).await.unwrap();
        assert_eq!(shift.closed_by.as_deref(), Some("m1"));
    }

    #[tokio::test]
    async fn test_shift_validation() {
        let engine = engine().await;

        let err = engine.open_shift(&cashier("u1"), -1, None).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        let missing = Uuid::new_v4().to_string();
        let err = engine.close_shift(&cashier("u1"), &missing, 0, None).await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
        assert_eq!(count(&engine, "shifts").await, 0);

        let opened = engine.open_shift(&cashier("u1"), 0, None).await.unwrap();
        let elsewhere = Actor::new("m9", "store-2", kasa_core::Role::Manager);
        let err = engine.close_shift(&elsewhere, &opened.shift_id, 0, None).await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_open_shift_admits_one() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("kasa.db")).max_connections(8))
            .await
            .unwrap();
        let engine = Engine::new(db, EngineConfig::default());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine.open_shift(&cashier("u1"), 10_000, None).await
            }));
        }

        let mut opened = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => opened += 1,
                Err(e) => {
                    assert_eq!(e.code(), "SHIFT_ALREADY_OPEN");
                    rejected += 1;
                }
            }
        }

        assert_eq!(opened, 1);
        assert_eq!(rejected, 7);
        assert_eq!(count(&engine, "shifts").await, 1);
    }
}
