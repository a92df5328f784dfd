//! Off-ledger Transaction Repository

use super::RepoResult;
use shared::models::LedgerTransaction;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};

const COLUMNS: &str = "id, year, seq, amount_cents, description, counterparty, created_by, requires_countersignature, countersigned_by, countersigned_at, created_at";

/// Reserve the next sequence number for `year`
///
/// Single atomic upsert; must run in the same transaction as the insert that
/// uses the number.
pub async fn next_seq(conn: &mut SqliteConnection, year: i64) -> RepoResult<i64> {
    let seq = sqlx::query_scalar::<_, i64>(
        "INSERT INTO transaction_sequences (year, last_seq) VALUES (?, 1) \
         ON CONFLICT (year) DO UPDATE SET last_seq = last_seq + 1 \
         RETURNING last_seq",
    )
    .bind(year)
    .fetch_one(conn)
    .await?;
    Ok(seq)
}

pub async fn insert(conn: &mut SqliteConnection, txn: &LedgerTransaction) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO ledger_transactions (id, year, seq, amount_cents, description, counterparty, created_by, requires_countersignature, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&txn.id)
    .bind(txn.year)
    .bind(txn.seq)
    .bind(txn.amount_cents)
    .bind(&txn.description)
    .bind(&txn.counterparty)
    .bind(&txn.created_by)
    .bind(txn.requires_countersignature)
    .bind(txn.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn find_by_id<'e, E>(exec: E, id: &str) -> RepoResult<Option<LedgerTransaction>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let txn = sqlx::query_as::<_, LedgerTransaction>(&format!(
        "SELECT {COLUMNS} FROM ledger_transactions WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(exec)
    .await?;
    Ok(txn)
}

/// Record the second signature once
pub async fn countersign(
    conn: &mut SqliteConnection,
    id: &str,
    countersigned_by: &str,
    now: i64,
) -> RepoResult<Option<LedgerTransaction>> {
    let updated = sqlx::query_as::<_, LedgerTransaction>(&format!(
        "UPDATE ledger_transactions SET countersigned_by = ?1, countersigned_at = ?2 \
         WHERE id = ?3 AND requires_countersignature = 1 AND countersigned_by IS NULL \
         RETURNING {COLUMNS}"
    ))
    .bind(countersigned_by)
    .bind(now)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(updated)
}

pub async fn list(pool: &SqlitePool, year: Option<i64>) -> RepoResult<Vec<LedgerTransaction>> {
    let list = sqlx::query_as::<_, LedgerTransaction>(&format!(
        "SELECT {COLUMNS} FROM ledger_transactions WHERE (?1 IS NULL OR year = ?1) ORDER BY year DESC, seq DESC"
    ))
    .bind(year)
    .fetch_all(pool)
    .await?;
    Ok(list)
}
