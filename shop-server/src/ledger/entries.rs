//! Ledger entries
//!
//! One `sale` per paid order, taken from the order lines and the exact fee
//! the payment gateway reports. Corrections are new `adjustment`/`refund`
//! entries.

use shared::error::{AppError, ErrorCode};
use shared::models::{LedgerAdjustmentCreate, LedgerAmounts, LedgerEntry, LedgerEntryType, Order, OrderStatus};

use super::split::split_profit;
use crate::audit::{self, AuditAction};
use crate::auth::Actor;
use crate::db::repository::{RepoError, ledger as repo, order as order_repo};
use crate::error::ServiceResult;
use crate::state::AppState;

/// Sale amounts of a paid order, given the gateway fee
pub fn sale_amounts(order: &Order, payment_fee_cents: i64) -> LedgerAmounts {
    LedgerAmounts {
        revenue_cents: order.total_cents,
        producer_cost_cents: order.items.iter().map(|i| i.quantity * i.unit_cost_cents).sum(),
        packaging_cents: order.packaging_cents,
        shipping_cents: order.shipping_cents,
        payment_fee_cents,
        customs_cents: order.customs_cents,
    }
}

/// Record the sale entry of a paid order
///
/// `None` when the order already has one. A gateway fee lookup failure is
/// returned as `PaymentFeeUnavailable` and nothing is written.
pub async fn record_sale_entry(state: &AppState, order: &Order, actor: &Actor) -> ServiceResult<Option<LedgerEntry>> {
    if repo::sale_exists(&state.pool, order.id).await? {
        return Ok(None);
    }
    let payment_ref = match (&order.status, &order.payment_ref) {
        (OrderStatus::AwaitingPayment | OrderStatus::Cancelled, _) | (_, None) => {
            return Err(AppError::new(ErrorCode::OrderNotPayable)
                .with_detail("order_number", order.order_number.as_str())
                .into());
        }
        (_, Some(r)) => r,
    };

    let fee = state.channels.gateway.fee_for(payment_ref).await.map_err(|e| {
        tracing::warn!(order_id = order.id, payment_ref = %payment_ref, error = %e, "Payment fee lookup failed");
        AppError::with_message(ErrorCode::PaymentFeeUnavailable, e.to_string())
            .with_detail("order_number", order.order_number.as_str())
    })?;

    let amounts = sale_amounts(order, fee);
    let shares = split_profit(amounts.gross_profit(), &state.config.profit_split);
    let created_by = actor.label();

    let mut tx = state.pool.begin().await?;
    let entry = match repo::insert_entry(
        &mut tx,
        &repo::NewEntry {
            order_id: order.id,
            entry_type: LedgerEntryType::Sale,
            amounts: &amounts,
            note: None,
            created_by: &created_by,
            shares: &shares,
        },
        shared::util::now_millis(),
    )
    .await
    {
        Ok(entry) => entry,
        Err(RepoError::Duplicate(msg)) => {
            tx.rollback().await?;
            // Only the one-sale-per-order index means another writer won
            if repo::sale_exists(&state.pool, order.id).await? {
                return Ok(None);
            }
            tracing::error!(order_id = order.id, error = %msg, "Unexpected unique violation recording sale");
            return Err(RepoError::Database(msg).into());
        }
        Err(e) => return Err(e.into()),
    };
    audit::record(
        &mut tx,
        actor,
        AuditAction::LedgerSaleRecorded,
        "ledger_entry",
        &entry.id.to_string(),
        Some(serde_json::json!({
            "order_id": order.id,
            "revenue_cents": entry.revenue_cents,
            "payment_fee_cents": entry.payment_fee_cents,
            "gross_profit_cents": entry.gross_profit_cents,
        })),
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        order_id = order.id,
        entry_id = entry.id,
        gross_profit_cents = entry.gross_profit_cents,
        "Sale recorded in ledger"
    );
    Ok(Some(entry))
}

/// Operator backfill of a sale entry that was deferred at payment time
pub async fn backfill_sale_entry(state: &AppState, order_id: i64, actor: &Actor) -> ServiceResult<LedgerEntry> {
    actor.require_admin()?;
    let order = order_repo::find_by_id(&state.pool, order_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound).with_detail("order_id", order_id))?;
    record_sale_entry(state, &order, actor).await?.ok_or_else(|| {
        AppError::new(ErrorCode::LedgerEntryExists)
            .with_detail("order_id", order_id)
            .into()
    })
}

/// Append an adjustment or refund entry
pub async fn record_adjustment(
    state: &AppState,
    data: &LedgerAdjustmentCreate,
    actor: &Actor,
) -> ServiceResult<LedgerEntry> {
    actor.require_admin()?;
    if data.entry_type == LedgerEntryType::Sale {
        return Err(AppError::validation("Sale entries are recorded from paid orders only").into());
    }
    let note = data.note.trim();
    if note.is_empty() {
        return Err(AppError::validation("A note is required for corrections").into());
    }
    if order_repo::find_by_id(&state.pool, data.order_id).await?.is_none() {
        return Err(AppError::new(ErrorCode::OrderNotFound)
            .with_detail("order_id", data.order_id)
            .into());
    }

    let shares = split_profit(data.amounts.gross_profit(), &state.config.profit_split);
    let created_by = actor.label();

    let mut tx = state.pool.begin().await?;
    let entry = repo::insert_entry(
        &mut tx,
        &repo::NewEntry {
            order_id: data.order_id,
            entry_type: data.entry_type,
            amounts: &data.amounts,
            note: Some(note),
            created_by: &created_by,
            shares: &shares,
        },
        shared::util::now_millis(),
    )
    .await?;
    audit::record(
        &mut tx,
        actor,
        AuditAction::LedgerAdjustmentRecorded,
        "ledger_entry",
        &entry.id.to_string(),
        Some(serde_json::json!({
            "order_id": data.order_id,
            "entry_type": data.entry_type,
            "gross_profit_cents": entry.gross_profit_cents,
            "note": note,
        })),
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        order_id = data.order_id,
        entry_id = entry.id,
        entry_type = data.entry_type.as_str(),
        "Ledger correction recorded"
    );
    Ok(entry)
}
