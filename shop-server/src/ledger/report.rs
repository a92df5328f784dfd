//! Period reports
//!
//! A report is a frozen aggregate of one period plus its content hash. The
//! period id is the primary key, so generation is idempotent per period and
//! a second attempt is a conflict rather than an overwrite.

use shared::error::{AppError, ErrorCode};
use shared::models::{Report, ReportGenerate, ReportStatus, ReportVerification};

use super::aggregate::{AggregateResult, aggregate_period};
use super::hash::compute_report_hash;
use super::period::ReportPeriod;
use crate::audit::{self, AuditAction};
use crate::auth::Actor;
use crate::db::repository::{RepoError, report as repo};
use crate::error::ServiceResult;
use crate::state::AppState;

fn not_found(id: &str) -> AppError {
    AppError::new(ErrorCode::ReportNotFound).with_detail("report_id", id)
}

fn build_report(period: &ReportPeriod, agg: &AggregateResult, hash: String, actor: &Actor) -> ServiceResult<Report> {
    let data = serde_json::to_string(agg).map_err(|e| AppError::internal(e.to_string()))?;
    Ok(Report {
        id: agg.period_id.clone(),
        period_type: period.period_type,
        period_start: agg.period_start,
        period_end: agg.period_end,
        revenue_cents: agg.revenue_cents,
        total_costs_cents: agg.total_costs_cents,
        payment_fee_cents: agg.payment_fee_cents,
        gross_profit_cents: agg.gross_profit_cents,
        order_count: agg.order_count,
        entry_count: agg.entry_count,
        avg_order_value_cents: agg.avg_order_value_cents,
        top_item_sku: agg.top_item.as_ref().map(|t| t.sku.clone()),
        top_item_quantity: agg.top_item.as_ref().map(|t| t.quantity),
        data,
        content_hash: hash,
        status: ReportStatus::Draft,
        generated_by: actor.label(),
        generated_at: shared::util::now_millis(),
        published_by: None,
        published_at: None,
    })
}

/// Aggregate, hash and persist a draft report for one period
pub async fn generate_report(state: &AppState, data: &ReportGenerate, actor: &Actor) -> ServiceResult<Report> {
    actor.require_admin()?;
    let period = ReportPeriod::new(data.period_type, data.year, data.number)?;
    // An open period would be frozen before its last entries arrive
    if !period.has_ended(shared::util::now_millis()) {
        return Err(AppError::with_message(ErrorCode::InvalidReportPeriod, "Period has not ended yet")
            .with_detail("report_id", period.id())
            .into());
    }

    let agg = aggregate_period(&state.pool, &period).await?;
    let hash = compute_report_hash(&agg);
    let report = build_report(&period, &agg, hash, actor)?;

    let mut tx = state.pool.begin().await?;
    match repo::insert(&mut tx, &report).await {
        Ok(()) => {}
        Err(RepoError::Duplicate(_)) => {
            return Err(AppError::new(ErrorCode::ReportAlreadyExists)
                .with_detail("report_id", report.id.as_str())
                .into());
        }
        Err(e) => return Err(e.into()),
    }
    audit::record(
        &mut tx,
        actor,
        AuditAction::ReportGenerated,
        "report",
        &report.id,
        Some(serde_json::json!({
            "content_hash": report.content_hash,
            "entry_count": report.entry_count,
            "gross_profit_cents": report.gross_profit_cents,
        })),
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        report_id = %report.id,
        content_hash = %report.content_hash,
        entry_count = report.entry_count,
        "Report generated"
    );
    Ok(report)
}

/// `draft -> published`; there is no way back
pub async fn publish_report(state: &AppState, report_id: &str, actor: &Actor) -> ServiceResult<Report> {
    actor.require_admin()?;

    let mut tx = state.pool.begin().await?;
    let Some(report) = repo::publish(&mut tx, report_id, &actor.label(), shared::util::now_millis()).await? else {
        let existing = repo::find_by_id(&mut *tx, report_id).await?;
        return Err(match existing {
            Some(_) => AppError::new(ErrorCode::ReportAlreadyPublished).with_detail("report_id", report_id),
            None => not_found(report_id),
        }
        .into());
    };
    audit::record(&mut tx, actor, AuditAction::ReportPublished, "report", &report.id, None).await?;
    tx.commit().await?;

    tracing::info!(report_id = %report.id, "Report published");
    Ok(report)
}

/// Recompute the stored period from the current ledger and compare hashes
pub async fn verify_report(state: &AppState, report_id: &str, actor: &Actor) -> ServiceResult<ReportVerification> {
    actor.require_back_office()?;
    let report = repo::find_by_id(&state.pool, report_id)
        .await?
        .ok_or_else(|| not_found(report_id))?;
    let period = ReportPeriod::from_id(&report.id).ok_or_else(|| {
        AppError::new(ErrorCode::InvalidReportPeriod).with_detail("report_id", report.id.as_str())
    })?;

    let agg = aggregate_period(&state.pool, &period).await?;
    let computed_hash = compute_report_hash(&agg);
    let intact = computed_hash == report.content_hash;
    if !intact {
        tracing::warn!(
            report_id = %report.id,
            stored_hash = %report.content_hash,
            computed_hash = %computed_hash,
            "Report no longer matches the ledger"
        );
    }
    Ok(ReportVerification {
        report_id: report.id,
        stored_hash: report.content_hash,
        computed_hash,
        intact,
    })
}

pub async fn get_report(state: &AppState, report_id: &str, actor: &Actor) -> ServiceResult<Report> {
    actor.require_back_office()?;
    Ok(repo::find_by_id(&state.pool, report_id)
        .await?
        .ok_or_else(|| not_found(report_id))?)
}

pub async fn list_reports(state: &AppState, actor: &Actor) -> ServiceResult<Vec<Report>> {
    actor.require_back_office()?;
    Ok(repo::list(&state.pool).await?)
}
