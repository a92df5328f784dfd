//! Ledger, report and off-ledger transaction endpoints

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use http::header;
use serde::Deserialize;
use shared::error::AppError;
use shared::models::{
    LedgerAdjustmentCreate, LedgerEntry, LedgerTransaction, Report, ReportGenerate, ReportVerification,
    TransactionCreate,
};

use super::ApiResult;
use crate::auth::Actor;
use crate::db::repository::ledger as ledger_repo;
use crate::error::ServiceError;
use crate::ledger::{self, csv, report, transactions};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TransactionQuery {
    pub year: Option<i64>,
}

/// GET /api/ledger/orders/{order_id}
pub async fn order_entries(
    State(state): State<AppState>,
    actor: Actor,
    Path(order_id): Path<i64>,
) -> ApiResult<Vec<LedgerEntry>> {
    actor.require_back_office()?;
    let entries = ledger_repo::list_for_order(&state.pool, order_id)
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(entries))
}

/// POST /api/ledger/orders/{order_id}/sale
pub async fn backfill_sale(
    State(state): State<AppState>,
    actor: Actor,
    Path(order_id): Path<i64>,
) -> ApiResult<LedgerEntry> {
    Ok(Json(ledger::backfill_sale_entry(&state, order_id, &actor).await?))
}

/// POST /api/ledger/adjustments
pub async fn record_adjustment(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<LedgerAdjustmentCreate>,
) -> ApiResult<LedgerEntry> {
    Ok(Json(ledger::record_adjustment(&state, &payload, &actor).await?))
}

/// GET /api/ledger/export/{period_id}
pub async fn export_csv(
    State(state): State<AppState>,
    actor: Actor,
    Path(period_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let body = csv::export_period_csv(&state, &period_id, &actor).await?;
    let disposition = format!("attachment; filename=\"ledger-{period_id}.csv\"");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

/// GET /api/reports
pub async fn list_reports(State(state): State<AppState>, actor: Actor) -> ApiResult<Vec<Report>> {
    Ok(Json(report::list_reports(&state, &actor).await?))
}

/// POST /api/reports
pub async fn generate_report(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<ReportGenerate>,
) -> ApiResult<Report> {
    Ok(Json(report::generate_report(&state, &payload, &actor).await?))
}

/// GET /api/reports/{id}
pub async fn get_report(State(state): State<AppState>, actor: Actor, Path(id): Path<String>) -> ApiResult<Report> {
    Ok(Json(report::get_report(&state, &id, &actor).await?))
}

/// POST /api/reports/{id}/publish
pub async fn publish_report(State(state): State<AppState>, actor: Actor, Path(id): Path<String>) -> ApiResult<Report> {
    Ok(Json(report::publish_report(&state, &id, &actor).await?))
}

/// GET /api/reports/{id}/verify
pub async fn verify_report(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> ApiResult<ReportVerification> {
    Ok(Json(report::verify_report(&state, &id, &actor).await?))
}

/// GET /api/transactions
pub async fn list_transactions(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<TransactionQuery>,
) -> ApiResult<Vec<LedgerTransaction>> {
    Ok(Json(transactions::list_transactions(&state, query.year, &actor).await?))
}

/// POST /api/transactions
pub async fn create_transaction(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<TransactionCreate>,
) -> ApiResult<LedgerTransaction> {
    Ok(Json(transactions::create_transaction(&state, &payload, &actor).await?))
}

/// GET /api/transactions/{id}
pub async fn get_transaction(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> ApiResult<LedgerTransaction> {
    Ok(Json(transactions::get_transaction(&state, &id, &actor).await?))
}

/// POST /api/transactions/{id}/countersign
pub async fn countersign_transaction(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> ApiResult<LedgerTransaction> {
    Ok(Json(transactions::countersign_transaction(&state, &id, &actor).await?))
}
