//! Audit Log Repository
//!
//! Append-only. Rows are written inside the transaction of the action they
//! describe, so an action and its audit row commit or roll back together.

use super::RepoResult;
use crate::audit::{AuditAction, AuditEntry, AuditQuery};
use sqlx::{SqliteConnection, SqlitePool};

/// Fields of a new audit row
#[derive(Debug, Clone)]
pub struct NewAuditEntry<'a> {
    pub actor_id: &'a str,
    pub actor_email: Option<&'a str>,
    pub action: AuditAction,
    pub resource_type: &'a str,
    pub resource_id: &'a str,
    pub details: Option<&'a serde_json::Value>,
}

pub async fn insert(
    conn: &mut SqliteConnection,
    data: &NewAuditEntry<'_>,
    now: i64,
) -> RepoResult<i64> {
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO audit_log (id, actor_id, actor_email, action, resource_type, resource_id, details, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(data.actor_id)
    .bind(data.actor_email)
    .bind(data.action)
    .bind(data.resource_type)
    .bind(data.resource_id)
    .bind(data.details.map(|d| d.to_string()))
    .bind(now)
    .execute(conn)
    .await?;
    Ok(id)
}

/// Newest first, optionally narrowed to one resource or action
pub async fn list(pool: &SqlitePool, query: &AuditQuery) -> RepoResult<Vec<AuditEntry>> {
    let rows = sqlx::query_as::<_, AuditEntry>(
        "SELECT id, actor_id, actor_email, action, resource_type, resource_id, details, created_at \
         FROM audit_log \
         WHERE (?1 IS NULL OR resource_type = ?1) \
           AND (?2 IS NULL OR resource_id = ?2) \
           AND (?3 IS NULL OR action = ?3) \
         ORDER BY created_at DESC, id DESC \
         LIMIT ?4",
    )
    .bind(&query.resource_type)
    .bind(&query.resource_id)
    .bind(query.action)
    .bind(query.limit.unwrap_or(100).clamp(1, 1000))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
