//! # Payment Operations
//!
//! ```text
//! BEGIN IMMEDIATE
//!   order (store-scoped)
//!   key given and already used on this order?
//!     same amount + method ─► replay current settlement, write nothing
//!     different           ─► IDEMPOTENCY_KEY_REUSED
//!   Settlement::apply     ─► ORDER_NOT_PAYABLE on closed orders
//!   INSERT payment, UPDATE order
//! COMMIT
//! ```

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use super::orders::load_order;
use super::{Engine, EngineError, EngineResult, PaymentRequest, PaymentResult};
use crate::repository::{OrderRepository, PaymentRepository};
use kasa_core::order::Settlement;
use kasa_core::validation::{
    validate_card_last_four, validate_idempotency_key, validate_notes, validate_payment_amount, validate_uuid,
};
use kasa_core::{Actor, ConflictCode, Money, Payment, PaymentStatus};

impl Engine {
    /// Applies a payment and advances the order's status.
    pub async fn process_payment(&self, actor: &Actor, request: PaymentRequest) -> EngineResult<PaymentResult> {
        self.process_payment_inner(actor, request)
            .await
            .inspect_err(|e| e.log("process_payment"))
    }

    async fn process_payment_inner(&self, actor: &Actor, request: PaymentRequest) -> EngineResult<PaymentResult> {
        validate_uuid("order_id", &request.order_id)?;
        validate_payment_amount(request.amount_cents)?;
        validate_card_last_four(request.card_last_four.as_deref())?;
        validate_idempotency_key(request.idempotency_key.as_deref())?;
        validate_notes("reference_number", request.reference_number.as_deref())?;
        validate_notes("card_type", request.card_type.as_deref())?;

        let mut tx = self.db.begin_immediate().await?;
        let now = Utc::now();

        let order = load_order(&mut tx, actor, &request.order_id).await?;

        if let Some(key) = request.idempotency_key.as_deref() {
            if let Some(earlier) = PaymentRepository::find_by_idempotency_key(&mut tx, &order.id, key).await? {
                if earlier.amount_cents != request.amount_cents || earlier.method != request.method {
                    return Err(EngineError::conflict(
                        ConflictCode::IdempotencyKeyReused,
                        format!("key '{key}' was used for a different payment on order {}", order.order_number),
                    ));
                }

                tx.rollback().await?;
                debug!(order_id = %order.id, key = %key, "Replaying payment");

                let settlement = Settlement::current(order.status, order.total(), order.paid());
                return Ok(PaymentResult {
                    payment_id: earlier.id,
                    status: settlement.status,
                    paid: settlement.paid,
                    remaining: settlement.remaining,
                    change: settlement.change,
                    replayed: true,
                });
            }
        }

        let settlement = Settlement::apply(
            order.status,
            order.total(),
            order.paid(),
            Money::from_cents(request.amount_cents),
        )?;

        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            order_id: order.id.clone(),
            amount_cents: request.amount_cents,
            method: request.method,
            status: PaymentStatus::Completed,
            reference_number: request.reference_number,
            card_last_four: request.card_last_four,
            card_type: request.card_type,
            idempotency_key: request.idempotency_key,
            processed_by: actor.user_id.clone(),
            created_at: now,
        };
        PaymentRepository::insert(&mut tx, &payment).await?;

        if OrderRepository::update_settlement(&mut tx, &order.id, &settlement, now).await? == 0 {
            return Err(EngineError::conflict(
                ConflictCode::OrderNotPayable,
                format!("order {} can no longer take payments", order.order_number),
            ));
        }

        tx.commit().await?;

        info!(
            order_id = %order.id,
            payment_id = %payment.id,
            amount_cents = payment.amount_cents,
            method = ?payment.method,
            status = settlement.status.as_str(),
            "Payment applied"
        );

        Ok(PaymentResult {
            payment_id: payment.id,
            status: settlement.status,
            paid: settlement.paid,
            remaining: settlement.remaining,
            change: settlement.change,
            replayed: false,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
