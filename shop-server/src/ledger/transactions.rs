//! Off-ledger transactions
//!
//! Ids are `TXN-<year>-<seq>`; the sequence is reserved inside the insert
//! transaction.

use chrono::{Datelike, Utc};
use shared::error::{AppError, ErrorCode};
use shared::models::{LedgerTransaction, TransactionCreate, requires_countersignature};

use crate::audit::{self, AuditAction};
use crate::auth::Actor;
use crate::db::repository::transaction as repo;
use crate::error::ServiceResult;
use crate::state::AppState;

pub fn transaction_id(year: i64, seq: i64) -> String {
    format!("TXN-{year}-{seq:04}")
}

fn not_found(id: &str) -> AppError {
    AppError::new(ErrorCode::TransactionNotFound).with_detail("transaction_id", id)
}

pub async fn create_transaction(
    state: &AppState,
    data: &TransactionCreate,
    actor: &Actor,
) -> ServiceResult<LedgerTransaction> {
    actor.require_admin()?;
    let description = data.description.trim();
    if description.is_empty() {
        return Err(AppError::validation("description is required").into());
    }
    if data.amount_cents == 0 {
        return Err(AppError::validation("amount must not be zero").into());
    }

    let now = Utc::now();
    let year = i64::from(now.year());

    let mut tx = state.pool.begin().await?;
    let seq = repo::next_seq(&mut tx, year).await?;
    let txn = LedgerTransaction {
        id: transaction_id(year, seq),
        year,
        seq,
        amount_cents: data.amount_cents,
        description: description.to_string(),
        counterparty: data
            .counterparty
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from),
        created_by: actor.label(),
        requires_countersignature: requires_countersignature(data.amount_cents),
        countersigned_by: None,
        countersigned_at: None,
        created_at: now.timestamp_millis(),
    };
    repo::insert(&mut tx, &txn).await?;
    audit::record(
        &mut tx,
        actor,
        AuditAction::TransactionCreated,
        "transaction",
        &txn.id,
        Some(serde_json::json!({
            "amount_cents": txn.amount_cents,
            "requires_countersignature": txn.requires_countersignature,
        })),
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        transaction_id = %txn.id,
        amount_cents = txn.amount_cents,
        requires_countersignature = txn.requires_countersignature,
        "Off-ledger transaction created"
    );
    Ok(txn)
}

/// Second admin signature on a large transaction
pub async fn countersign_transaction(
    state: &AppState,
    transaction_id: &str,
    actor: &Actor,
) -> ServiceResult<LedgerTransaction> {
    actor.require_admin()?;
    let existing = repo::find_by_id(&state.pool, transaction_id)
        .await?
        .ok_or_else(|| not_found(transaction_id))?;
    if !existing.requires_countersignature {
        return Err(AppError::new(ErrorCode::CountersignatureNotRequired)
            .with_detail("transaction_id", transaction_id)
            .into());
    }
    if existing.countersigned_by.is_some() {
        return Err(AppError::new(ErrorCode::AlreadyCountersigned)
            .with_detail("transaction_id", transaction_id)
            .into());
    }
    let signer = actor.label();
    if signer == existing.created_by {
        crate::security_log!(WARN, "self_countersign", actor_id = %actor.id, transaction_id = %transaction_id);
        return Err(AppError::new(ErrorCode::CountersignerIsCreator)
            .with_detail("transaction_id", transaction_id)
            .into());
    }

    let mut tx = state.pool.begin().await?;
    let txn = repo::countersign(&mut tx, transaction_id, &signer, shared::util::now_millis())
        .await?
        .ok_or_else(|| {
            // Another admin signed in between
            AppError::new(ErrorCode::AlreadyCountersigned).with_detail("transaction_id", transaction_id)
        })?;
    audit::record(&mut tx, actor, AuditAction::TransactionCountersigned, "transaction", &txn.id, None).await?;
    tx.commit().await?;

    tracing::info!(transaction_id = %txn.id, "Off-ledger transaction countersigned");
    Ok(txn)
}

pub async fn get_transaction(state: &AppState, transaction_id: &str, actor: &Actor) -> ServiceResult<LedgerTransaction> {
    actor.require_back_office()?;
    Ok(repo::find_by_id(&state.pool, transaction_id)
        .await?
        .ok_or_else(|| not_found(transaction_id))?)
}

pub async fn list_transactions(
    state: &AppState,
    year: Option<i64>,
    actor: &Actor,
) -> ServiceResult<Vec<LedgerTransaction>> {
    actor.require_back_office()?;
    Ok(repo::list(&state.pool, year).await?)
}
