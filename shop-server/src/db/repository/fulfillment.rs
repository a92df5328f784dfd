//! Fulfillment Order Repository
//!
//! Every state change is a guarded `UPDATE ... WHERE status = ...` so two
//! racing writers (operator retry vs. retry sweep) cannot both win.

use super::RepoResult;
use serde::Serialize;
use shared::models::{FulfillmentEvent, FulfillmentEventKind, FulfillmentOrder, FulfillmentStatus};
use sqlx::{Sqlite, SqliteConnection, SqlitePool};

const COLUMNS: &str = "id, order_id, producer_id, status, tracking_number, tracking_url, retry_count, last_error, next_attempt_at, created_at, updated_at, confirmed_at, shipped_at, delivered_at";

/// Create the (order, producer) fulfillment order unless it already exists
///
/// Returns `None` when the pair was already present.
pub async fn insert_if_absent(
    conn: &mut SqliteConnection,
    order_id: i64,
    producer_id: i64,
    now: i64,
) -> RepoResult<Option<FulfillmentOrder>> {
    let created = sqlx::query_as::<_, FulfillmentOrder>(&format!(
        "INSERT INTO fulfillment_orders (id, order_id, producer_id, status, retry_count, created_at, updated_at) \
         VALUES (?, ?, ?, ?, 0, ?, ?) \
         ON CONFLICT (order_id, producer_id) DO NOTHING \
         RETURNING {COLUMNS}"
    ))
    .bind(shared::util::snowflake_id())
    .bind(order_id)
    .bind(producer_id)
    .bind(FulfillmentStatus::Pending)
    .bind(now)
    .bind(now)
    .fetch_optional(conn)
    .await?;
    Ok(created)
}

pub async fn find_by_id<'e, E>(exec: E, id: i64) -> RepoResult<Option<FulfillmentOrder>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let fo = sqlx::query_as::<_, FulfillmentOrder>(&format!(
        "SELECT {COLUMNS} FROM fulfillment_orders WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(exec)
    .await?;
    Ok(fo)
}

pub async fn list_for_order<'e, E>(exec: E, order_id: i64) -> RepoResult<Vec<FulfillmentOrder>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let list = sqlx::query_as::<_, FulfillmentOrder>(&format!(
        "SELECT {COLUMNS} FROM fulfillment_orders WHERE order_id = ? ORDER BY producer_id"
    ))
    .bind(order_id)
    .fetch_all(exec)
    .await?;
    Ok(list)
}

pub async fn list(
    pool: &SqlitePool,
    status: Option<FulfillmentStatus>,
    limit: i64,
) -> RepoResult<Vec<FulfillmentOrder>> {
    let list = match status {
        Some(status) => {
            sqlx::query_as::<_, FulfillmentOrder>(&format!(
                "SELECT {COLUMNS} FROM fulfillment_orders WHERE status = ? ORDER BY created_at DESC LIMIT ?"
            ))
            .bind(status)
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, FulfillmentOrder>(&format!(
                "SELECT {COLUMNS} FROM fulfillment_orders ORDER BY created_at DESC LIMIT ?"
            ))
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
    };
    Ok(list)
}

/// Pending fulfillment orders whose backoff has elapsed
pub async fn find_due(pool: &SqlitePool, now: i64, limit: i64) -> RepoResult<Vec<FulfillmentOrder>> {
    let list = sqlx::query_as::<_, FulfillmentOrder>(&format!(
        "SELECT {COLUMNS} FROM fulfillment_orders \
         WHERE status = ? AND (next_attempt_at IS NULL OR next_attempt_at <= ?) \
         ORDER BY created_at LIMIT ?"
    ))
    .bind(FulfillmentStatus::Pending)
    .bind(now)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(list)
}

/// `pending -> sent_to_producer`, clearing the last error
pub async fn record_dispatch_success(
    conn: &mut SqliteConnection,
    id: i64,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE fulfillment_orders SET status = ?1, last_error = NULL, next_attempt_at = NULL, updated_at = ?2 \
         WHERE id = ?3 AND status = ?4",
    )
    .bind(FulfillmentStatus::SentToProducer)
    .bind(now)
    .bind(id)
    .bind(FulfillmentStatus::Pending)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Count a failed attempt on a pending order
///
/// The order becomes `failed` once `retry_count` reaches `max_attempts`,
/// otherwise it stays `pending` until `next_attempt_at`. Returns the updated
/// row, or `None` if the order was no longer pending.
pub async fn record_dispatch_failure(
    conn: &mut SqliteConnection,
    id: i64,
    error: &str,
    max_attempts: u32,
    next_attempt_at: i64,
    now: i64,
) -> RepoResult<Option<FulfillmentOrder>> {
    let updated = sqlx::query_as::<_, FulfillmentOrder>(&format!(
        "UPDATE fulfillment_orders SET \
             retry_count = retry_count + 1, \
             last_error = ?1, \
             status = CASE WHEN retry_count + 1 >= ?2 THEN ?3 ELSE status END, \
             next_attempt_at = CASE WHEN retry_count + 1 >= ?2 THEN NULL ELSE ?4 END, \
             updated_at = ?5 \
         WHERE id = ?6 AND status = ?7 \
         RETURNING {COLUMNS}"
    ))
    .bind(error)
    .bind(i64::from(max_attempts))
    .bind(FulfillmentStatus::Failed)
    .bind(next_attempt_at)
    .bind(now)
    .bind(id)
    .bind(FulfillmentStatus::Pending)
    .fetch_optional(conn)
    .await?;
    Ok(updated)
}

/// Reset to `pending` for an immediate attempt, only if still in `expected`
///
/// `retry_count` is untouched.
pub async fn reset_for_retry(
    conn: &mut SqliteConnection,
    id: i64,
    expected: FulfillmentStatus,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE fulfillment_orders SET status = ?1, next_attempt_at = NULL, updated_at = ?2 \
         WHERE id = ?3 AND status = ?4",
    )
    .bind(FulfillmentStatus::Pending)
    .bind(now)
    .bind(id)
    .bind(expected)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Manual transition, only if still in `expected`
///
/// Milestone timestamps are stamped on first arrival only; tracking fields are
/// kept when not supplied.
pub async fn apply_status(
    conn: &mut SqliteConnection,
    id: i64,
    expected: FulfillmentStatus,
    new_status: FulfillmentStatus,
    tracking_number: Option<&str>,
    tracking_url: Option<&str>,
    now: i64,
) -> RepoResult<Option<FulfillmentOrder>> {
    let updated = sqlx::query_as::<_, FulfillmentOrder>(&format!(
        "UPDATE fulfillment_orders SET \
             status = ?1, \
             tracking_number = COALESCE(?2, tracking_number), \
             tracking_url = COALESCE(?3, tracking_url), \
             confirmed_at = CASE WHEN ?1 = 'confirmed' THEN COALESCE(confirmed_at, ?4) ELSE confirmed_at END, \
             shipped_at = CASE WHEN ?1 = 'shipped' THEN COALESCE(shipped_at, ?4) ELSE shipped_at END, \
             delivered_at = CASE WHEN ?1 = 'delivered' THEN COALESCE(delivered_at, ?4) ELSE delivered_at END, \
             next_attempt_at = NULL, \
             updated_at = ?4 \
         WHERE id = ?5 AND status = ?6 \
         RETURNING {COLUMNS}"
    ))
    .bind(new_status)
    .bind(tracking_number)
    .bind(tracking_url)
    .bind(now)
    .bind(id)
    .bind(expected)
    .fetch_optional(conn)
    .await?;
    Ok(updated)
}

/// Append a history event
#[allow(clippy::too_many_arguments)]
pub async fn insert_event(
    conn: &mut SqliteConnection,
    fulfillment_order_id: i64,
    kind: FulfillmentEventKind,
    old_status: Option<FulfillmentStatus>,
    new_status: FulfillmentStatus,
    actor: &str,
    payload: Option<&serde_json::Value>,
    now: i64,
) -> RepoResult<i64> {
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO fulfillment_events (id, fulfillment_order_id, kind, old_status, new_status, actor, payload, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(fulfillment_order_id)
    .bind(kind)
    .bind(old_status)
    .bind(new_status)
    .bind(actor)
    .bind(payload.map(|p| p.to_string()))
    .bind(now)
    .execute(conn)
    .await?;
    Ok(id)
}

pub async fn events_for<'e, E>(exec: E, fulfillment_order_id: i64) -> RepoResult<Vec<FulfillmentEvent>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let events = sqlx::query_as::<_, FulfillmentEvent>(
        "SELECT id, fulfillment_order_id, kind, old_status, new_status, actor, payload, created_at \
         FROM fulfillment_events WHERE fulfillment_order_id = ? ORDER BY created_at, id",
    )
    .bind(fulfillment_order_id)
    .fetch_all(exec)
    .await?;
    Ok(events)
}

/// Fulfillment order joined with what an operator needs to act on it
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StuckRow {
    pub fulfillment_order_id: i64,
    pub order_number: String,
    pub producer_name: String,
    pub status: FulfillmentStatus,
    pub retry_count: i64,
    pub last_error: Option<String>,
    pub created_at: i64,
}

/// `failed` (any age) or `pending` created before `stale_before`
pub async fn find_stuck(pool: &SqlitePool, stale_before: i64) -> RepoResult<Vec<StuckRow>> {
    let rows = sqlx::query_as::<_, StuckRow>(
        "SELECT f.id AS fulfillment_order_id, o.order_number, p.name AS producer_name, \
                f.status, f.retry_count, f.last_error, f.created_at \
         FROM fulfillment_orders f \
         JOIN orders o ON o.id = f.order_id \
         JOIN producers p ON p.id = f.producer_id \
         WHERE f.status = ?1 OR (f.status = ?2 AND f.created_at < ?3) \
         ORDER BY f.created_at, f.id",
    )
    .bind(FulfillmentStatus::Failed)
    .bind(FulfillmentStatus::Pending)
    .bind(stale_before)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
