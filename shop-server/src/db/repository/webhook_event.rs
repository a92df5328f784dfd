//! Processed Webhook Events (delivery dedup)

use super::RepoResult;
use sqlx::SqlitePool;

/// Record a gateway event id; false when it was already processed
pub async fn mark_processed(pool: &SqlitePool, event_id: &str, event_type: &str) -> RepoResult<bool> {
    let rows = sqlx::query(
        "INSERT INTO processed_webhook_events (event_id, event_type, processed_at) VALUES (?, ?, ?) \
         ON CONFLICT (event_id) DO NOTHING",
    )
    .bind(event_id)
    .bind(event_type)
    .bind(shared::util::now_millis())
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Forget an event so the gateway's redelivery is processed again
pub async fn unmark(pool: &SqlitePool, event_id: &str) -> RepoResult<()> {
    sqlx::query("DELETE FROM processed_webhook_events WHERE event_id = ?")
        .bind(event_id)
        .execute(pool)
        .await?;
    Ok(())
}
