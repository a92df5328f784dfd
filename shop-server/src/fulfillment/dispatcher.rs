//! Fulfillment Dispatcher
//!
//! Creates one fulfillment order per producer at payment time and drives
//! the dispatch attempt / retry / manual override transitions. Producer
//! notification happens outside any transaction; only the outcome is
//! written, through a guarded update.

use std::collections::BTreeSet;

use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    FulfillmentEventKind, FulfillmentOrder, FulfillmentStatus, FulfillmentStatusUpdate, Order,
};

use crate::audit::{self, AuditAction};
use crate::auth::Actor;
use crate::channels::ProducerNotice;
use crate::db::repository::{fulfillment as repo, order as order_repo, producer as producer_repo};
use crate::error::ServiceResult;
use crate::state::AppState;

use super::{aggregate_order_status, validate_transition};

const SYSTEM_ACTOR: &str = "system:dispatcher";

/// How many due orders one sweep picks up
const DUE_BATCH_SIZE: i64 = 200;

/// Result of one dispatch attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// Producer accepted; now `sent_to_producer`
    Sent,
    /// Failed, still `pending` until `next_attempt_at`
    Retrying { retry_count: i64, next_attempt_at: i64 },
    /// Failed and the attempt budget is exhausted
    Failed { retry_count: i64 },
    /// Not `pending` (anymore); nothing was attempted or recorded
    Skipped,
}

/// Totals of one `dispatch_due` sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub attempted: usize,
    pub sent: usize,
    pub retrying: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Attempts that hit a storage error
    pub errors: usize,
}

fn not_found(id: i64) -> AppError {
    AppError::new(ErrorCode::FulfillmentNotFound).with_detail("fulfillment_order_id", id)
}

/// Create one `pending` fulfillment order per distinct producer of `order`
///
/// Re-running is a no-op for pairs that already exist. Returns every
/// fulfillment order of the order.
pub async fn create_for_order(state: &AppState, order: &Order) -> ServiceResult<Vec<FulfillmentOrder>> {
    let producers: BTreeSet<i64> = order.items.iter().map(|i| i.producer_id).collect();
    let now = shared::util::now_millis();

    let mut tx = state.pool.begin().await?;
    for producer_id in &producers {
        if let Some(fo) = repo::insert_if_absent(&mut tx, order.id, *producer_id, now).await? {
            repo::insert_event(
                &mut tx,
                fo.id,
                FulfillmentEventKind::Created,
                None,
                FulfillmentStatus::Pending,
                SYSTEM_ACTOR,
                None,
                now,
            )
            .await?;
            tracing::info!(
                order_id = order.id,
                fulfillment_order_id = fo.id,
                producer_id = *producer_id,
                "Fulfillment order created"
            );
        }
    }
    tx.commit().await?;

    Ok(repo::list_for_order(&state.pool, order.id).await?)
}

/// One dispatch attempt for a `pending` fulfillment order
///
/// Channel failures are counted, never returned. Only storage errors
/// surface as `Err`.
pub async fn dispatch_one(state: &AppState, fulfillment_order_id: i64) -> ServiceResult<DispatchOutcome> {
    let fo = repo::find_by_id(&state.pool, fulfillment_order_id)
        .await?
        .ok_or_else(|| not_found(fulfillment_order_id))?;
    if fo.status != FulfillmentStatus::Pending {
        return Ok(DispatchOutcome::Skipped);
    }

    let order = order_repo::find_by_id(&state.pool, fo.order_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound).with_detail("order_id", fo.order_id))?;
    let producer = producer_repo::find_by_id(&state.pool, fo.producer_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProducerNotFound).with_detail("producer_id", fo.producer_id))?;

    let notice = ProducerNotice {
        fulfillment_order_id: fo.id,
        order_number: order.order_number.clone(),
        customer_email: order.customer_email.clone(),
        items: order
            .items
            .iter()
            .filter(|i| i.producer_id == fo.producer_id)
            .cloned()
            .collect(),
        producer,
    };

    let result = state.channels.notifier.notify(&notice).await;
    let now = shared::util::now_millis();

    let (outcome, updated) = match result {
        Ok(()) => {
            let mut tx = state.pool.begin().await?;
            if !repo::record_dispatch_success(&mut tx, fo.id, now).await? {
                return Ok(DispatchOutcome::Skipped);
            }
            repo::insert_event(
                &mut tx,
                fo.id,
                FulfillmentEventKind::DispatchSucceeded,
                Some(FulfillmentStatus::Pending),
                FulfillmentStatus::SentToProducer,
                SYSTEM_ACTOR,
                None,
                now,
            )
            .await?;
            tx.commit().await?;

            tracing::info!(fulfillment_order_id = fo.id, order_number = %order.order_number, "Dispatched to producer");
            let updated = repo::find_by_id(&state.pool, fo.id).await?.ok_or_else(|| not_found(fo.id))?;
            (DispatchOutcome::Sent, updated)
        }
        Err(e) => {
            let policy = state.config.retry_policy;
            let retry = u32::try_from(fo.retry_count).unwrap_or(u32::MAX);
            let next_attempt_at = policy.next_attempt_at(now, retry);
            let error = e.to_string();

            let mut tx = state.pool.begin().await?;
            let Some(updated) = repo::record_dispatch_failure(
                &mut tx,
                fo.id,
                &error,
                policy.max_attempts,
                next_attempt_at,
                now,
            )
            .await?
            else {
                return Ok(DispatchOutcome::Skipped);
            };
            let payload = serde_json::json!({ "error": error, "retry_count": updated.retry_count });
            repo::insert_event(
                &mut tx,
                fo.id,
                FulfillmentEventKind::DispatchFailed,
                Some(FulfillmentStatus::Pending),
                updated.status,
                SYSTEM_ACTOR,
                Some(&payload),
                now,
            )
            .await?;
            tx.commit().await?;

            if updated.status == FulfillmentStatus::Failed {
                tracing::error!(
                    fulfillment_order_id = fo.id,
                    order_number = %order.order_number,
                    retry_count = updated.retry_count,
                    error = %error,
                    "Dispatch attempts exhausted, fulfillment order failed"
                );
                (DispatchOutcome::Failed { retry_count: updated.retry_count }, updated)
            } else {
                tracing::warn!(
                    fulfillment_order_id = fo.id,
                    order_number = %order.order_number,
                    retry_count = updated.retry_count,
                    next_attempt_at,
                    error = %error,
                    "Dispatch failed, will retry"
                );
                (
                    DispatchOutcome::Retrying {
                        retry_count: updated.retry_count,
                        next_attempt_at,
                    },
                    updated,
                )
            }
        }
    };

    state.side_effects.tracking_upsert(&order.order_number, &updated);
    Ok(outcome)
}

/// Attempt every `pending` fulfillment order whose backoff has elapsed
///
/// Failures are isolated per fulfillment order and only counted.
pub async fn dispatch_due(state: &AppState) -> ServiceResult<DispatchSummary> {
    let due = repo::find_due(&state.pool, shared::util::now_millis(), DUE_BATCH_SIZE).await?;
    let mut summary = DispatchSummary::default();

    for fo in due {
        summary.attempted += 1;
        match dispatch_one(state, fo.id).await {
            Ok(DispatchOutcome::Sent) => summary.sent += 1,
            Ok(DispatchOutcome::Retrying { .. }) => summary.retrying += 1,
            Ok(DispatchOutcome::Failed { .. }) => summary.failed += 1,
            Ok(DispatchOutcome::Skipped) => summary.skipped += 1,
            Err(e) => {
                summary.errors += 1;
                tracing::error!(fulfillment_order_id = fo.id, error = %e, "Dispatch attempt errored");
            }
        }
    }

    if summary.attempted > 0 {
        tracing::info!(?summary, "Dispatch sweep finished");
    }
    Ok(summary)
}

/// Operator retry: reset `pending`/`failed` to `pending`, then attempt once
///
/// `retry_count` is kept, so a failed order that fails again stays failed.
pub async fn retry(
    state: &AppState,
    fulfillment_order_id: i64,
    actor: &Actor,
) -> ServiceResult<(FulfillmentOrder, DispatchOutcome)> {
    actor.require_admin()?;

    let fo = repo::find_by_id(&state.pool, fulfillment_order_id)
        .await?
        .ok_or_else(|| not_found(fulfillment_order_id))?;
    if !fo.status.is_retryable() {
        return Err(AppError::new(ErrorCode::FulfillmentNotRetryable)
            .with_detail("status", fo.status.as_str())
            .into());
    }

    let now = shared::util::now_millis();
    let mut tx = state.pool.begin().await?;
    if !repo::reset_for_retry(&mut tx, fo.id, fo.status, now).await? {
        // Status moved between the read and the guarded update
        return Err(AppError::with_message(
            ErrorCode::FulfillmentNotRetryable,
            "Fulfillment order changed concurrently",
        )
        .into());
    }
    repo::insert_event(
        &mut tx,
        fo.id,
        FulfillmentEventKind::RetryRequested,
        Some(fo.status),
        FulfillmentStatus::Pending,
        &actor.label(),
        None,
        now,
    )
    .await?;
    audit::record(
        &mut tx,
        actor,
        AuditAction::FulfillmentRetryRequested,
        "fulfillment_order",
        &fo.id.to_string(),
        Some(serde_json::json!({
            "previous_status": fo.status,
            "retry_count": fo.retry_count,
            "last_error": fo.last_error,
        })),
    )
    .await?;
    tx.commit().await?;

    let outcome = dispatch_one(state, fo.id).await?;
    let updated = repo::find_by_id(&state.pool, fo.id)
        .await?
        .ok_or_else(|| not_found(fo.id))?;
    Ok((updated, outcome))
}

/// Manual operator transition
pub async fn update_status(
    state: &AppState,
    fulfillment_order_id: i64,
    update: &FulfillmentStatusUpdate,
    actor: &Actor,
) -> ServiceResult<FulfillmentOrder> {
    actor.require_admin()?;

    let fo = repo::find_by_id(&state.pool, fulfillment_order_id)
        .await?
        .ok_or_else(|| not_found(fulfillment_order_id))?;
    validate_transition(fo.status, update.status)?;

    let now = shared::util::now_millis();
    let mut tx = state.pool.begin().await?;
    let Some(updated) = repo::apply_status(
        &mut tx,
        fo.id,
        fo.status,
        update.status,
        update.tracking_number.as_deref(),
        update.tracking_url.as_deref(),
        now,
    )
    .await?
    else {
        return Err(AppError::with_message(
            ErrorCode::FulfillmentInvalidTransition,
            "Fulfillment order changed concurrently",
        )
        .into());
    };

    let payload = serde_json::json!({
        "tracking_number": update.tracking_number,
        "tracking_url": update.tracking_url,
        "note": update.note,
    });
    repo::insert_event(
        &mut tx,
        fo.id,
        FulfillmentEventKind::StatusChanged,
        Some(fo.status),
        update.status,
        &actor.label(),
        Some(&payload),
        now,
    )
    .await?;
    audit::record(
        &mut tx,
        actor,
        AuditAction::FulfillmentStatusChanged,
        "fulfillment_order",
        &fo.id.to_string(),
        Some(serde_json::json!({
            "from": fo.status,
            "to": update.status,
            "note": update.note,
        })),
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        fulfillment_order_id = fo.id,
        from = %fo.status,
        to = %update.status,
        actor = %actor.id,
        "Fulfillment status changed"
    );

    // The change is committed; follow-up failures must not turn it into an error
    if let Err(e) = propagate_status_change(state, &updated).await {
        tracing::error!(
            fulfillment_order_id = updated.id,
            order_id = updated.order_id,
            error = %e,
            "Order follow-up after status change failed"
        );
    }
    Ok(updated)
}

/// Push a committed fulfillment change to tracking and the parent order
async fn propagate_status_change(state: &AppState, updated: &FulfillmentOrder) -> ServiceResult<()> {
    let order = order_repo::find_by_id(&state.pool, updated.order_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound).with_detail("order_id", updated.order_id))?;
    state.side_effects.tracking_upsert(&order.order_number, updated);

    if updated.status.has_shipped() {
        refresh_order_status(state, &order).await?;
    }
    Ok(())
}

/// Recompute the parent order's aggregate status and push it to tracking
async fn refresh_order_status(state: &AppState, order: &Order) -> ServiceResult<()> {
    let siblings = repo::list_for_order(&state.pool, order.id).await?;
    let statuses: Vec<_> = siblings.iter().map(|f| f.status).collect();
    if let Some(status) = aggregate_order_status(&statuses) {
        order_repo::set_fulfillment_status(&state.pool, order.id, status).await?;
        state.side_effects.tracking_order_status(&order.order_number, status);
        tracing::debug!(order_id = order.id, status = status.as_str(), "Order status recomputed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fulfillment::sentinel;
    use crate::test_support::{self, TestEnv};
    use shared::models::OrderStatus;

    async fn paid_two_producer_order(env: &TestEnv) -> (Order, i64, i64) {
        let a = test_support::producer(&env.state, "ALPHA").await;
        let b = test_support::producer(&env.state, "BETA").await;
        let order = test_support::order(&env.state, "SO-1001", &[(a.id, "A-1", 2, 1500), (b.id, "B-1", 1, 2000)]).await;
        (order, a.id, b.id)
    }

    fn fo_for(list: &[FulfillmentOrder], producer_id: i64) -> FulfillmentOrder {
        list.iter().find(|f| f.producer_id == producer_id).unwrap().clone()
    }

    #[tokio::test]
    async fn one_fulfillment_order_per_distinct_producer() {
        let env = TestEnv::new().await;
        let a = test_support::producer(&env.state, "ALPHA").await;
        let b = test_support::producer(&env.state, "BETA").await;
        let order = test_support::order(
            &env.state,
            "SO-1",
            &[(a.id, "A-1", 1, 1000), (a.id, "A-2", 1, 500), (b.id, "B-1", 3, 700)],
        )
        .await;

        let created = create_for_order(&env.state, &order).await.unwrap();
        assert_eq!(created.len(), 2);
        assert!(created.iter().all(|f| f.status == FulfillmentStatus::Pending));

        // Re-running creation is a no-op
        let again = create_for_order(&env.state, &order).await.unwrap();
        assert_eq!(again.len(), 2);
        let events = repo::events_for(&env.state.pool, created[0].id).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, FulfillmentEventKind::Created);
    }

    #[tokio::test]
    async fn success_moves_to_sent_and_keeps_retry_count() {
        let env = TestEnv::new().await;
        let (order, a, _) = paid_two_producer_order(&env).await;
        let list = create_for_order(&env.state, &order).await.unwrap();
        let fo = fo_for(&list, a);

        let outcome = dispatch_one(&env.state, fo.id).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Sent);

        let fo = repo::find_by_id(&env.state.pool, fo.id).await.unwrap().unwrap();
        assert_eq!(fo.status, FulfillmentStatus::SentToProducer);
        assert_eq!(fo.retry_count, 0);
        assert!(fo.last_error.is_none());

        // Only pending orders are attempted
        assert_eq!(dispatch_one(&env.state, fo.id).await.unwrap(), DispatchOutcome::Skipped);
        assert_eq!(env.notifier.calls_for(a), 1);
    }

    #[tokio::test]
    async fn failures_back_off_until_budget_is_exhausted() {
        let env = TestEnv::new().await;
        let (order, _, b) = paid_two_producer_order(&env).await;
        env.notifier.fail_for(b);
        let list = create_for_order(&env.state, &order).await.unwrap();
        let fo = fo_for(&list, b);

        let mut last_count = 0;
        for attempt in 1..=4 {
            let outcome = dispatch_one(&env.state, fo.id).await.unwrap();
            match outcome {
                DispatchOutcome::Retrying { retry_count, next_attempt_at } => {
                    assert_eq!(retry_count, attempt);
                    assert!(next_attempt_at > shared::util::now_millis());
                    assert!(retry_count > last_count);
                    last_count = retry_count;
                }
                other => panic!("unexpected outcome {other:?}"),
            }
            let current = repo::find_by_id(&env.state.pool, fo.id).await.unwrap().unwrap();
            assert_eq!(current.status, FulfillmentStatus::Pending);
            assert!(current.last_error.is_some());
        }

        let outcome = dispatch_one(&env.state, fo.id).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Failed { retry_count: 5 });
        let failed = repo::find_by_id(&env.state.pool, fo.id).await.unwrap().unwrap();
        assert_eq!(failed.status, FulfillmentStatus::Failed);
        assert_eq!(failed.retry_count, 5);
        assert!(failed.next_attempt_at.is_none());
    }

    #[tokio::test]
    async fn due_sweep_skips_orders_in_backoff() {
        let env = TestEnv::new().await;
        let (order, a, b) = paid_two_producer_order(&env).await;
        env.notifier.fail_for(b);
        create_for_order(&env.state, &order).await.unwrap();

        let first = dispatch_due(&env.state).await.unwrap();
        assert_eq!(first.attempted, 2);
        assert_eq!(first.sent, 1);
        assert_eq!(first.retrying, 1);

        // B is now waiting for its backoff, A is no longer pending
        let second = dispatch_due(&env.state).await.unwrap();
        assert_eq!(second.attempted, 0);
        assert_eq!(env.notifier.calls_for(a), 1);
        assert_eq!(env.notifier.calls_for(b), 1);
    }

    #[tokio::test]
    async fn retry_resets_failed_and_keeps_count() {
        let env = TestEnv::with_policy(crate::fulfillment::RetryPolicy {
            max_attempts: 1,
            base_delay_secs: 60,
            max_delay_secs: 60,
        })
        .await;
        let (order, _, b) = paid_two_producer_order(&env).await;
        env.notifier.fail_for(b);
        let list = create_for_order(&env.state, &order).await.unwrap();
        let fo = fo_for(&list, b);
        assert_eq!(
            dispatch_one(&env.state, fo.id).await.unwrap(),
            DispatchOutcome::Failed { retry_count: 1 }
        );

        env.notifier.succeed_for(b);
        let admin = test_support::admin();
        let (updated, outcome) = retry(&env.state, fo.id, &admin).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Sent);
        assert_eq!(updated.status, FulfillmentStatus::SentToProducer);
        assert_eq!(updated.retry_count, 1);

        let kinds: Vec<_> = repo::events_for(&env.state.pool, fo.id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                FulfillmentEventKind::Created,
                FulfillmentEventKind::DispatchFailed,
                FulfillmentEventKind::RetryRequested,
                FulfillmentEventKind::DispatchSucceeded,
            ]
        );
    }

    #[tokio::test]
    async fn retry_rejects_non_retryable_and_non_admin() {
        let env = TestEnv::new().await;
        let (order, a, _) = paid_two_producer_order(&env).await;
        let list = create_for_order(&env.state, &order).await.unwrap();
        let fo = fo_for(&list, a);
        dispatch_one(&env.state, fo.id).await.unwrap();

        let err = retry(&env.state, fo.id, &test_support::admin()).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::FulfillmentNotRetryable));

        let err = retry(&env.state, fo.id, &test_support::viewer()).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::AdminRequired));
    }

    #[tokio::test]
    async fn shipped_at_is_stamped_once() {
        let env = TestEnv::new().await;
        let (order, a, _) = paid_two_producer_order(&env).await;
        let list = create_for_order(&env.state, &order).await.unwrap();
        let fo = fo_for(&list, a);
        let admin = test_support::admin();

        let ship = |tracking: &str| FulfillmentStatusUpdate {
            status: FulfillmentStatus::Shipped,
            tracking_number: Some(tracking.to_string()),
            tracking_url: None,
            note: None,
        };
        let first = update_status(&env.state, fo.id, &ship("TRK-1"), &admin).await.unwrap();
        let stamped = first.shipped_at.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = update_status(&env.state, fo.id, &ship("TRK-2"), &admin).await.unwrap();
        assert_eq!(second.shipped_at, Some(stamped));
        assert_eq!(second.tracking_number.as_deref(), Some("TRK-2"));
    }

    #[tokio::test]
    async fn manual_transition_writes_event_audit_and_order_status() {
        let env = TestEnv::new().await;
        let (order, a, b) = paid_two_producer_order(&env).await;
        let list = create_for_order(&env.state, &order).await.unwrap();
        let admin = test_support::admin();
        let shipped = FulfillmentStatusUpdate {
            status: FulfillmentStatus::Shipped,
            tracking_number: Some("TRK-1".into()),
            tracking_url: None,
            note: Some("courier pickup".into()),
        };

        let fo_a = fo_for(&list, a);
        update_status(&env.state, fo_a.id, &shipped, &admin).await.unwrap();
        let current = order_repo::find_by_id(&env.state.pool, order.id).await.unwrap().unwrap();
        assert_eq!(current.status, OrderStatus::PartiallyShipped);

        let fo_b = fo_for(&list, b);
        update_status(&env.state, fo_b.id, &shipped, &admin).await.unwrap();
        let current = order_repo::find_by_id(&env.state.pool, order.id).await.unwrap().unwrap();
        assert_eq!(current.status, OrderStatus::Shipped);

        let events = repo::events_for(&env.state.pool, fo_a.id).await.unwrap();
        let last = events.last().unwrap();
        assert_eq!(last.kind, FulfillmentEventKind::StatusChanged);
        assert_eq!(last.old_status, Some(FulfillmentStatus::Pending));
        assert_eq!(last.actor, admin.label());

        let audit = crate::db::repository::audit::list(
            &env.state.pool,
            &crate::audit::AuditQuery {
                resource_id: Some(fo_a.id.to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, AuditAction::FulfillmentStatusChanged);

        env.drain_side_effects().await;
        assert_eq!(
            env.tracking.order_statuses().last(),
            Some(&("SO-1001".to_string(), OrderStatus::Shipped))
        );
    }

    #[tokio::test]
    async fn committed_change_survives_failed_order_follow_up() {
        let env = TestEnv::new().await;
        let (order, a, _) = paid_two_producer_order(&env).await;
        let list = create_for_order(&env.state, &order).await.unwrap();
        let fo = fo_for(&list, a);

        // Parent order vanishes, so the post-commit lookup fails
        sqlx::query("PRAGMA foreign_keys = OFF").execute(&env.state.pool).await.unwrap();
        sqlx::query("DELETE FROM orders WHERE id = ?")
            .bind(order.id)
            .execute(&env.state.pool)
            .await
            .unwrap();

        let update = FulfillmentStatusUpdate {
            status: FulfillmentStatus::Shipped,
            tracking_number: Some("TRK-9".into()),
            tracking_url: None,
            note: None,
        };
        let updated = update_status(&env.state, fo.id, &update, &test_support::admin())
            .await
            .unwrap();
        assert_eq!(updated.status, FulfillmentStatus::Shipped);

        let stored = repo::find_by_id(&env.state.pool, fo.id).await.unwrap().unwrap();
        assert_eq!(stored.status, FulfillmentStatus::Shipped);
        assert_eq!(stored.tracking_number.as_deref(), Some("TRK-9"));
    }

    #[tokio::test]
    async fn delivered_rejects_further_transitions() {
        let env = TestEnv::new().await;
        let (order, a, _) = paid_two_producer_order(&env).await;
        let list = create_for_order(&env.state, &order).await.unwrap();
        let fo = fo_for(&list, a);
        let admin = test_support::admin();
        let to = |status| FulfillmentStatusUpdate {
            status,
            tracking_number: None,
            tracking_url: None,
            note: None,
        };

        update_status(&env.state, fo.id, &to(FulfillmentStatus::Delivered), &admin)
            .await
            .unwrap();
        let err = update_status(&env.state, fo.id, &to(FulfillmentStatus::Cancelled), &admin)
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::FulfillmentInvalidTransition));
    }

    #[tokio::test]
    async fn tracking_failure_never_surfaces() {
        let env = TestEnv::new().await;
        env.tracking.set_failing(true);
        let (order, a, _) = paid_two_producer_order(&env).await;
        let list = create_for_order(&env.state, &order).await.unwrap();
        let fo = fo_for(&list, a);

        let updated = update_status(
            &env.state,
            fo.id,
            &FulfillmentStatusUpdate {
                status: FulfillmentStatus::Confirmed,
                tracking_number: None,
                tracking_url: None,
                note: None,
            },
            &test_support::admin(),
        )
        .await
        .unwrap();
        assert_eq!(updated.status, FulfillmentStatus::Confirmed);
        assert!(updated.confirmed_at.is_some());
        env.drain_side_effects().await;
    }

    /// Two producers; A accepts, B fails every attempt until its budget
    /// is spent. The sentinel then reports exactly B.
    #[tokio::test]
    async fn end_to_end_one_producer_exhausts_retries() {
        let env = TestEnv::new().await;
        let (order, a, b) = paid_two_producer_order(&env).await;
        env.notifier.fail_for(b);
        let list = create_for_order(&env.state, &order).await.unwrap();
        let fo_a = fo_for(&list, a);
        let fo_b = fo_for(&list, b);

        assert_eq!(dispatch_one(&env.state, fo_a.id).await.unwrap(), DispatchOutcome::Sent);
        for _ in 0..5 {
            dispatch_one(&env.state, fo_b.id).await.unwrap();
        }

        let a_now = repo::find_by_id(&env.state.pool, fo_a.id).await.unwrap().unwrap();
        let b_now = repo::find_by_id(&env.state.pool, fo_b.id).await.unwrap().unwrap();
        assert_eq!(a_now.status, FulfillmentStatus::SentToProducer);
        assert_eq!(b_now.status, FulfillmentStatus::Failed);
        assert_eq!(b_now.retry_count, 5);

        let report = sentinel::run(&env.state).await.unwrap();
        assert!(!report.ok);
        assert_eq!(report.count, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].fulfillment_order_id, fo_b.id);
        assert!(report.stale_pending.is_empty());
        assert_eq!(env.alerts.messages().len(), 1);
    }
}
