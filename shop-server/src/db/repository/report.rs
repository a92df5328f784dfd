//! Report Repository

use super::RepoResult;
use shared::models::{Report, ReportStatus};
use sqlx::{Sqlite, SqliteConnection, SqlitePool};

const COLUMNS: &str = "id, period_type, period_start, period_end, revenue_cents, total_costs_cents, payment_fee_cents, gross_profit_cents, order_count, entry_count, avg_order_value_cents, top_item_sku, top_item_quantity, data, content_hash, status, generated_by, generated_at, published_by, published_at";

/// Insert a draft report
///
/// The primary key is the period id, so a second insert for the same period
/// fails with `RepoError::Duplicate` instead of overwriting.
pub async fn insert(conn: &mut SqliteConnection, report: &Report) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO reports (id, period_type, period_start, period_end, revenue_cents, total_costs_cents, payment_fee_cents, gross_profit_cents, order_count, entry_count, avg_order_value_cents, top_item_sku, top_item_quantity, data, content_hash, status, generated_by, generated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&report.id)
    .bind(report.period_type)
    .bind(report.period_start)
    .bind(report.period_end)
    .bind(report.revenue_cents)
    .bind(report.total_costs_cents)
    .bind(report.payment_fee_cents)
    .bind(report.gross_profit_cents)
    .bind(report.order_count)
    .bind(report.entry_count)
    .bind(report.avg_order_value_cents)
    .bind(&report.top_item_sku)
    .bind(report.top_item_quantity)
    .bind(&report.data)
    .bind(&report.content_hash)
    .bind(report.status)
    .bind(&report.generated_by)
    .bind(report.generated_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn find_by_id<'e, E>(exec: E, id: &str) -> RepoResult<Option<Report>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let report = sqlx::query_as::<_, Report>(&format!("SELECT {COLUMNS} FROM reports WHERE id = ?"))
        .bind(id)
        .fetch_optional(exec)
        .await?;
    Ok(report)
}

/// `draft -> published`; `None` when the report is not a draft
pub async fn publish(
    conn: &mut SqliteConnection,
    id: &str,
    published_by: &str,
    now: i64,
) -> RepoResult<Option<Report>> {
    let updated = sqlx::query_as::<_, Report>(&format!(
        "UPDATE reports SET status = ?1, published_by = ?2, published_at = ?3 \
         WHERE id = ?4 AND status = ?5 RETURNING {COLUMNS}"
    ))
    .bind(ReportStatus::Published)
    .bind(published_by)
    .bind(now)
    .bind(id)
    .bind(ReportStatus::Draft)
    .fetch_optional(conn)
    .await?;
    Ok(updated)
}

pub async fn list(pool: &SqlitePool) -> RepoResult<Vec<Report>> {
    let list = sqlx::query_as::<_, Report>(&format!(
        "SELECT {COLUMNS} FROM reports ORDER BY period_start DESC, id"
    ))
    .fetch_all(pool)
    .await?;
    Ok(list)
}

pub async fn count(pool: &SqlitePool) -> RepoResult<i64> {
    let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reports")
        .fetch_one(pool)
        .await?;
    Ok(n)
}
