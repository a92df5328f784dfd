//! Partner Config Repository

use super::{RepoError, RepoResult};
use shared::models::{PartnerConfig, PartnerCreate};
use sqlx::{Sqlite, SqliteConnection, SqlitePool};

const COLUMNS: &str = "id, code, name, commission_percent, active, payout_account, created_at";

pub async fn create(conn: &mut SqliteConnection, data: PartnerCreate) -> RepoResult<PartnerConfig> {
    if !(0.0..=100.0).contains(&data.commission_percent) || !data.commission_percent.is_finite() {
        return Err(RepoError::Validation(format!(
            "commission_percent must be within 0..=100, got {}",
            data.commission_percent
        )));
    }
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO partner_configs (id, code, name, commission_percent, active, payout_account, created_at) VALUES (?, ?, ?, ?, 1, ?, ?)",
    )
    .bind(id)
    .bind(data.code.trim())
    .bind(&data.name)
    .bind(data.commission_percent)
    .bind(&data.payout_account)
    .bind(shared::util::now_millis())
    .execute(&mut *conn)
    .await?;

    find_by_id(&mut *conn, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to read partner after insert".into()))
}

pub async fn find_by_id<'e, E>(exec: E, id: i64) -> RepoResult<Option<PartnerConfig>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let partner = sqlx::query_as::<_, PartnerConfig>(&format!(
        "SELECT {COLUMNS} FROM partner_configs WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(exec)
    .await?;
    Ok(partner)
}

/// Case-sensitive code lookup
pub async fn find_by_code<'e, E>(exec: E, code: &str) -> RepoResult<Option<PartnerConfig>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let partner = sqlx::query_as::<_, PartnerConfig>(&format!(
        "SELECT {COLUMNS} FROM partner_configs WHERE code = ?"
    ))
    .bind(code)
    .fetch_optional(exec)
    .await?;
    Ok(partner)
}

pub async fn set_active(conn: &mut SqliteConnection, id: i64, active: bool) -> RepoResult<bool> {
    let rows = sqlx::query("UPDATE partner_configs SET active = ? WHERE id = ?")
        .bind(active)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(rows.rows_affected() > 0)
}

pub async fn list(pool: &SqlitePool) -> RepoResult<Vec<PartnerConfig>> {
    let list = sqlx::query_as::<_, PartnerConfig>(&format!(
        "SELECT {COLUMNS} FROM partner_configs ORDER BY code"
    ))
    .fetch_all(pool)
    .await?;
    Ok(list)
}
