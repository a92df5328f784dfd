//! Order intake
//!
//! The storefront creates orders at checkout; the payment webhook confirms
//! them. Confirmation is the single trigger for everything downstream:
//! fulfillment orders, the ledger sale entry, partner commission and the
//! first dispatch attempt.

use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{FulfillmentOrder, Order, OrderCreate, OrderStatus, PartnerCommission};

use crate::audit::{self, AuditAction};
use crate::auth::Actor;
use crate::commission;
use crate::db::repository::{order as repo, producer as producer_repo};
use crate::error::{ServiceError, ServiceResult};
use crate::fulfillment::{self, DispatchOutcome};
use crate::ledger;
use crate::state::AppState;

/// What one payment confirmation did
#[derive(Debug, Clone, Serialize)]
pub struct PaidOrderOutcome {
    pub order: Order,
    /// False when the payment had already been recorded
    pub newly_paid: bool,
    pub fulfillment_orders: Vec<FulfillmentOrder>,
    pub ledger_entry_id: Option<i64>,
    /// Set when the sale entry could not be written yet (fee unavailable)
    pub ledger_deferred: bool,
    pub commission: Option<PartnerCommission>,
    pub dispatch: Vec<(i64, DispatchOutcome)>,
}

/// Validate and store a checkout order in `awaiting_payment`
pub async fn create_order(state: &AppState, data: &OrderCreate) -> ServiceResult<Order> {
    if data.order_number.trim().is_empty() {
        return Err(AppError::validation("order_number is required").into());
    }
    if data.items.is_empty() {
        return Err(AppError::new(ErrorCode::OrderEmpty)
            .with_detail("order_number", data.order_number.as_str())
            .into());
    }
    for item in &data.items {
        if item.quantity <= 0 || item.unit_price_cents < 0 || item.unit_cost_cents < 0 {
            return Err(AppError::validation("item quantity must be positive and prices non-negative")
                .with_detail("sku", item.sku.as_str())
                .into());
        }
        if producer_repo::find_by_id(&state.pool, item.producer_id).await?.is_none() {
            return Err(AppError::new(ErrorCode::ProducerNotFound)
                .with_detail("producer_id", item.producer_id)
                .into());
        }
    }

    let order = repo::create(&state.pool, data).await?;
    tracing::info!(
        order_id = order.id,
        order_number = %order.order_number,
        total_cents = order.total_cents,
        "Order created"
    );
    Ok(order)
}

pub async fn find_order(state: &AppState, order_number: &str) -> ServiceResult<Order> {
    repo::find_by_number(&state.pool, order_number)
        .await?
        .ok_or_else(|| {
            AppError::new(ErrorCode::OrderNotFound)
                .with_detail("order_number", order_number)
                .into()
        })
}

/// Record a confirmed payment and run the downstream pipeline
///
/// The status change is a guarded `awaiting_payment -> paid` update. A replay
/// re-runs only the idempotent steps (fulfillment creation, sale entry,
/// commission) and makes no dispatch attempt; pending fulfillment orders
/// are left to the retry sweep.
pub async fn record_paid_order(state: &AppState, order_number: &str, payment_ref: &str) -> ServiceResult<PaidOrderOutcome> {
    let actor = Actor::system("payment");
    let order = find_order(state, order_number).await?;

    let mut tx = state.pool.begin().await?;
    let newly_paid = repo::mark_paid(&mut tx, order.id, payment_ref, shared::util::now_millis()).await?;
    if newly_paid {
        audit::record(
            &mut tx,
            &actor,
            AuditAction::OrderPaid,
            "order",
            &order.id.to_string(),
            Some(serde_json::json!({
                "order_number": order.order_number,
                "payment_ref": payment_ref,
                "total_cents": order.total_cents,
            })),
        )
        .await?;
    }
    tx.commit().await?;

    if !newly_paid && matches!(order.status, OrderStatus::AwaitingPayment | OrderStatus::Cancelled) {
        return Err(AppError::new(ErrorCode::OrderNotPayable)
            .with_detail("order_number", order_number)
            .with_detail("status", order.status.as_str())
            .into());
    }

    // Reload for status and payment_ref
    let order = find_order(state, order_number).await?;
    if newly_paid {
        tracing::info!(order_id = order.id, order_number = %order.order_number, payment_ref, "Order paid");
    } else {
        tracing::info!(order_id = order.id, order_number = %order.order_number, "Payment replay, order already paid");
    }

    let fulfillment_orders = fulfillment::create_for_order(state, &order).await?;

    let (ledger_entry_id, ledger_deferred) = match ledger::record_sale_entry(state, &order, &actor).await {
        Ok(entry) => (entry.map(|e| e.id), false),
        Err(ServiceError::App(e)) if e.code == ErrorCode::PaymentFeeUnavailable => {
            tracing::warn!(
                order_id = order.id,
                order_number = %order.order_number,
                error = %e.message,
                "Sale entry deferred until the payment fee is available"
            );
            state.side_effects.alert(format!(
                "Ledger entry for order {} deferred: payment fee unavailable ({}). Backfill once the gateway reports the fee.",
                order.order_number, e.message
            ));
            (None, true)
        }
        Err(e) => return Err(e),
    };

    let commission = commission::attribute_order(state, &order).await?;

    let mut dispatch = Vec::new();
    if newly_paid {
        for fo in &fulfillment_orders {
            match fulfillment::dispatcher::dispatch_one(state, fo.id).await {
                Ok(outcome) => dispatch.push((fo.id, outcome)),
                Err(e) => {
                    // Left pending; the retry sweep picks it up
                    tracing::error!(fulfillment_order_id = fo.id, error = %e, "Dispatch attempt failed");
                }
            }
        }
    }

    Ok(PaidOrderOutcome {
        order,
        newly_paid,
        fulfillment_orders,
        ledger_entry_id,
        ledger_deferred,
        commission,
        dispatch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::ledger as ledger_repo;
    use crate::test_support::{self, TestEnv};
    use shared::models::{FulfillmentStatus, OrderItemCreate};

    fn checkout(number: &str, items: Vec<OrderItemCreate>) -> OrderCreate {
        OrderCreate {
            order_number: number.into(),
            customer_email: Some("buyer@example.com".into()),
            packaging_cents: 80,
            shipping_cents: 450,
            customs_cents: 0,
            utm_source: Some("newsletter".into()),
            utm_campaign: Some("spring-mkt-engine-01".into()),
            items,
        }
    }

    fn item(producer_id: i64, sku: &str, quantity: i64, unit_price_cents: i64) -> OrderItemCreate {
        OrderItemCreate {
            producer_id,
            sku: sku.into(),
            name: format!("Item {sku}"),
            quantity,
            unit_price_cents,
            unit_cost_cents: unit_price_cents / 2,
        }
    }

    #[tokio::test]
    async fn empty_order_rejected() {
        let env = TestEnv::new().await;
        let err = create_order(&env.state, &checkout("SO-1", vec![])).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::OrderEmpty));
    }

    #[tokio::test]
    async fn unknown_producer_rejected() {
        let env = TestEnv::new().await;
        let err = create_order(&env.state, &checkout("SO-1", vec![item(999, "X", 1, 100)]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::ProducerNotFound));
    }

    #[tokio::test]
    async fn payment_runs_full_pipeline_once() {
        let env = TestEnv::new().await;
        test_support::partner(&env.state, &env.state.config.attribution_partner_code, 10.0).await;
        let a = test_support::producer(&env.state, "ALPHA").await;
        let b = test_support::producer(&env.state, "BETA").await;
        env.notifier.fail_for(b.id);

        let order = create_order(
            &env.state,
            &checkout("SO-77", vec![item(a.id, "A-1", 2, 1500), item(b.id, "B-1", 1, 2000)]),
        )
        .await
        .unwrap();
        assert_eq!(order.total_cents, 5000);
        assert_eq!(order.status, OrderStatus::AwaitingPayment);

        let outcome = record_paid_order(&env.state, "SO-77", "pi_77").await.unwrap();
        assert!(outcome.newly_paid);
        assert_eq!(outcome.order.status, OrderStatus::Paid);
        assert_eq!(outcome.fulfillment_orders.len(), 2);
        assert!(outcome.ledger_entry_id.is_some());
        assert_eq!(outcome.commission.as_ref().map(|c| c.commission_cents), Some(500));
        assert_eq!(outcome.dispatch.len(), 2);
        assert!(outcome.dispatch.iter().any(|(_, o)| *o == DispatchOutcome::Sent));
        assert!(outcome
            .dispatch
            .iter()
            .any(|(_, o)| matches!(o, DispatchOutcome::Retrying { retry_count: 1, .. })));

        let replay = record_paid_order(&env.state, "SO-77", "pi_77").await.unwrap();
        assert!(!replay.newly_paid);
        assert!(replay.dispatch.is_empty());
        assert!(replay.commission.is_none());
        assert!(replay.ledger_entry_id.is_none());
        assert_eq!(env.notifier.calls_for(a.id), 1);
        assert_eq!(ledger_repo::list_for_order(&env.state.pool, order.id).await.unwrap().len(), 1);
        assert!(replay
            .fulfillment_orders
            .iter()
            .any(|f| f.status == FulfillmentStatus::SentToProducer));
    }

    #[tokio::test]
    async fn fee_failure_defers_entry_and_alerts() {
        let env = TestEnv::new().await;
        env.gateway.set_failing(true);
        let a = test_support::producer(&env.state, "ALPHA").await;
        create_order(&env.state, &checkout("SO-5", vec![item(a.id, "A-1", 1, 900)]))
            .await
            .unwrap();

        let outcome = record_paid_order(&env.state, "SO-5", "pi_5").await.unwrap();
        assert!(outcome.ledger_deferred);
        assert!(outcome.ledger_entry_id.is_none());
        assert_eq!(outcome.order.status, OrderStatus::Paid);

        env.drain_side_effects().await;
        let messages = env.alerts.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("SO-5"));
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let env = TestEnv::new().await;
        let err = record_paid_order(&env.state, "SO-404", "pi_x").await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::OrderNotFound));
    }
}
