//! Producer Repository

use super::{RepoError, RepoResult};
use shared::models::{Producer, ProducerCreate};
use sqlx::{Sqlite, SqliteConnection, SqlitePool};

const COLUMNS: &str = "id, code, name, notify_url, contact_email, active, created_at";

pub async fn create(conn: &mut SqliteConnection, data: ProducerCreate) -> RepoResult<Producer> {
    if data.code.trim().is_empty() {
        return Err(RepoError::Validation("producer code is required".into()));
    }
    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    sqlx::query(
        "INSERT INTO producers (id, code, name, notify_url, contact_email, active, created_at) VALUES (?, ?, ?, ?, ?, 1, ?)",
    )
    .bind(id)
    .bind(data.code.trim())
    .bind(&data.name)
    .bind(&data.notify_url)
    .bind(&data.contact_email)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    find_by_id(&mut *conn, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to read producer after insert".into()))
}

pub async fn find_by_id<'e, E>(exec: E, id: i64) -> RepoResult<Option<Producer>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let producer = sqlx::query_as::<_, Producer>(&format!(
        "SELECT {COLUMNS} FROM producers WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(exec)
    .await?;
    Ok(producer)
}

pub async fn list(pool: &SqlitePool) -> RepoResult<Vec<Producer>> {
    let producers =
        sqlx::query_as::<_, Producer>(&format!("SELECT {COLUMNS} FROM producers ORDER BY code"))
            .fetch_all(pool)
            .await?;
    Ok(producers)
}
