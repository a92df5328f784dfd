//! Partner Commission Repository
//!
//! Append-only: rows are inserted once and the only update is `pending -> paid`.

use super::RepoResult;
use shared::models::{CommissionStatus, PartnerCommission};
use sqlx::{Sqlite, SqliteConnection, SqlitePool};

const COLUMNS: &str = "id, partner_config_id, order_id, order_total_cents, commission_percent, commission_cents, status, attribution_source, payout_transfer_id, created_at, paid_at";

pub async fn exists<'e, E>(exec: E, partner_config_id: i64, order_id: i64) -> RepoResult<bool>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let found = sqlx::query_scalar::<_, i64>(
        "SELECT 1 FROM partner_commissions WHERE partner_config_id = ? AND order_id = ?",
    )
    .bind(partner_config_id)
    .bind(order_id)
    .fetch_optional(exec)
    .await?;
    Ok(found.is_some())
}

/// Fields of a new commission row
#[derive(Debug, Clone)]
pub struct NewCommission<'a> {
    pub partner_config_id: i64,
    pub order_id: i64,
    pub order_total_cents: i64,
    pub commission_percent: f64,
    pub commission_cents: i64,
    pub status: CommissionStatus,
    pub attribution_source: Option<&'a str>,
}

/// Insert unless (partner, order) already exists
///
/// Returns `None` when another writer got there first.
pub async fn insert_if_absent(
    conn: &mut SqliteConnection,
    data: &NewCommission<'_>,
    now: i64,
) -> RepoResult<Option<PartnerCommission>> {
    let created = sqlx::query_as::<_, PartnerCommission>(&format!(
        "INSERT INTO partner_commissions (id, partner_config_id, order_id, order_total_cents, commission_percent, commission_cents, status, attribution_source, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT (partner_config_id, order_id) DO NOTHING \
         RETURNING {COLUMNS}"
    ))
    .bind(shared::util::snowflake_id())
    .bind(data.partner_config_id)
    .bind(data.order_id)
    .bind(data.order_total_cents)
    .bind(data.commission_percent)
    .bind(data.commission_cents)
    .bind(data.status)
    .bind(data.attribution_source)
    .bind(now)
    .fetch_optional(conn)
    .await?;
    Ok(created)
}

pub async fn find_by_id<'e, E>(exec: E, id: i64) -> RepoResult<Option<PartnerCommission>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let c = sqlx::query_as::<_, PartnerCommission>(&format!(
        "SELECT {COLUMNS} FROM partner_commissions WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(exec)
    .await?;
    Ok(c)
}

/// `pending -> paid`, setting the payout fields once
pub async fn mark_paid(
    conn: &mut SqliteConnection,
    id: i64,
    transfer_id: &str,
    now: i64,
) -> RepoResult<Option<PartnerCommission>> {
    let updated = sqlx::query_as::<_, PartnerCommission>(&format!(
        "UPDATE partner_commissions SET status = ?1, payout_transfer_id = ?2, paid_at = ?3 \
         WHERE id = ?4 AND status = ?5 AND payout_transfer_id IS NULL \
         RETURNING {COLUMNS}"
    ))
    .bind(CommissionStatus::Paid)
    .bind(transfer_id)
    .bind(now)
    .bind(id)
    .bind(CommissionStatus::Pending)
    .fetch_optional(conn)
    .await?;
    Ok(updated)
}

pub async fn list(
    pool: &SqlitePool,
    partner_config_id: Option<i64>,
    status: Option<CommissionStatus>,
) -> RepoResult<Vec<PartnerCommission>> {
    let list = sqlx::query_as::<_, PartnerCommission>(&format!(
        "SELECT {COLUMNS} FROM partner_commissions \
         WHERE (?1 IS NULL OR partner_config_id = ?1) AND (?2 IS NULL OR status = ?2) \
         ORDER BY created_at DESC, id DESC"
    ))
    .bind(partner_config_id)
    .bind(status)
    .fetch_all(pool)
    .await?;
    Ok(list)
}

pub async fn count_for_order(pool: &SqlitePool, order_id: i64) -> RepoResult<i64> {
    let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM partner_commissions WHERE order_id = ?")
        .bind(order_id)
        .fetch_one(pool)
        .await?;
    Ok(n)
}
