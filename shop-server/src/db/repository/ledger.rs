//! Ledger Repository
//!
//! Insert and read only. The schema rejects UPDATE/DELETE on entries.

use super::RepoResult;
use serde::Serialize;
use shared::models::{LedgerAmounts, LedgerEntry, LedgerEntryType, LedgerShare};
use sqlx::{Sqlite, SqliteConnection, SqlitePool};

const COLUMNS: &str = "id, order_id, entry_type, revenue_cents, producer_cost_cents, packaging_cents, shipping_cents, payment_fee_cents, customs_cents, gross_profit_cents, note, created_by, created_at";

/// Fields of a new ledger entry
#[derive(Debug, Clone)]
pub struct NewEntry<'a> {
    pub order_id: i64,
    pub entry_type: LedgerEntryType,
    pub amounts: &'a LedgerAmounts,
    pub note: Option<&'a str>,
    pub created_by: &'a str,
    pub shares: &'a [(String, i64)],
}

/// Insert an entry and its profit shares
///
/// A second `sale` for the same order fails with `RepoError::Duplicate`.
pub async fn insert_entry(
    conn: &mut SqliteConnection,
    data: &NewEntry<'_>,
    now: i64,
) -> RepoResult<LedgerEntry> {
    let id = shared::util::snowflake_id();
    let mut entry = sqlx::query_as::<_, LedgerEntry>(&format!(
        "INSERT INTO ledger_entries (id, order_id, entry_type, revenue_cents, producer_cost_cents, packaging_cents, shipping_cents, payment_fee_cents, customs_cents, gross_profit_cents, note, created_by, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(data.order_id)
    .bind(data.entry_type)
    .bind(data.amounts.revenue_cents)
    .bind(data.amounts.producer_cost_cents)
    .bind(data.amounts.packaging_cents)
    .bind(data.amounts.shipping_cents)
    .bind(data.amounts.payment_fee_cents)
    .bind(data.amounts.customs_cents)
    .bind(data.amounts.gross_profit())
    .bind(data.note)
    .bind(data.created_by)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    for (beneficiary, amount_cents) in data.shares {
        sqlx::query(
            "INSERT INTO ledger_entry_shares (entry_id, beneficiary, amount_cents) VALUES (?, ?, ?)",
        )
        .bind(id)
        .bind(beneficiary)
        .bind(amount_cents)
        .execute(&mut *conn)
        .await?;
        entry.shares.push(LedgerShare {
            entry_id: id,
            beneficiary: beneficiary.clone(),
            amount_cents: *amount_cents,
        });
    }

    Ok(entry)
}

pub async fn sale_exists<'e, E>(exec: E, order_id: i64) -> RepoResult<bool>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let found = sqlx::query_scalar::<_, i64>(
        "SELECT 1 FROM ledger_entries WHERE order_id = ? AND entry_type = ?",
    )
    .bind(order_id)
    .bind(LedgerEntryType::Sale)
    .fetch_optional(exec)
    .await?;
    Ok(found.is_some())
}

/// Entries with `created_at` in `[start, end)`, oldest first
pub async fn list_in_range(pool: &SqlitePool, start: i64, end: i64) -> RepoResult<Vec<LedgerEntry>> {
    let mut entries = sqlx::query_as::<_, LedgerEntry>(&format!(
        "SELECT {COLUMNS} FROM ledger_entries WHERE created_at >= ? AND created_at < ? ORDER BY created_at, id"
    ))
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    let shares = sqlx::query_as::<_, LedgerShare>(
        "SELECT s.entry_id, s.beneficiary, s.amount_cents FROM ledger_entry_shares s \
         JOIN ledger_entries l ON l.id = s.entry_id \
         WHERE l.created_at >= ? AND l.created_at < ? ORDER BY s.entry_id, s.beneficiary",
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;
    attach_shares(&mut entries, shares);
    Ok(entries)
}

pub async fn list_for_order(pool: &SqlitePool, order_id: i64) -> RepoResult<Vec<LedgerEntry>> {
    let mut entries = sqlx::query_as::<_, LedgerEntry>(&format!(
        "SELECT {COLUMNS} FROM ledger_entries WHERE order_id = ? ORDER BY created_at, id"
    ))
    .bind(order_id)
    .fetch_all(pool)
    .await?;

    let shares = sqlx::query_as::<_, LedgerShare>(
        "SELECT s.entry_id, s.beneficiary, s.amount_cents FROM ledger_entry_shares s \
         JOIN ledger_entries l ON l.id = s.entry_id \
         WHERE l.order_id = ? ORDER BY s.entry_id, s.beneficiary",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    attach_shares(&mut entries, shares);
    Ok(entries)
}

fn attach_shares(entries: &mut [LedgerEntry], shares: Vec<LedgerShare>) {
    for share in shares {
        if let Some(entry) = entries.iter_mut().find(|e| e.id == share.entry_id) {
            entry.shares.push(share);
        }
    }
}

/// Units sold per SKU
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ItemQuantity {
    pub sku: String,
    pub name: String,
    pub quantity: i64,
}

/// Item quantities of orders whose sale entry falls in `[start, end)`
///
/// Keyed on the sale entry rather than the order so the period only depends
/// on its own ledger rows. Sorted by quantity descending, then SKU ascending.
pub async fn item_quantities_in_range(
    pool: &SqlitePool,
    start: i64,
    end: i64,
) -> RepoResult<Vec<ItemQuantity>> {
    let rows = sqlx::query_as::<_, ItemQuantity>(
        "SELECT i.sku AS sku, MIN(i.name) AS name, SUM(i.quantity) AS quantity \
         FROM order_items i \
         JOIN ledger_entries l ON l.order_id = i.order_id AND l.entry_type = ?3 \
         WHERE l.created_at >= ?1 AND l.created_at < ?2 \
         GROUP BY i.sku \
         ORDER BY quantity DESC, i.sku ASC",
    )
    .bind(start)
    .bind(end)
    .bind(LedgerEntryType::Sale)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Entries joined with their order number, for CSV export
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ExportRow {
    pub created_at: i64,
    pub order_id: i64,
    pub order_number: String,
    pub entry_type: LedgerEntryType,
    pub revenue_cents: i64,
    pub producer_cost_cents: i64,
    pub packaging_cents: i64,
    pub shipping_cents: i64,
    pub payment_fee_cents: i64,
    pub customs_cents: i64,
    pub gross_profit_cents: i64,
    pub note: Option<String>,
}

pub async fn export_rows(pool: &SqlitePool, start: i64, end: i64) -> RepoResult<Vec<ExportRow>> {
    let rows = sqlx::query_as::<_, ExportRow>(
        "SELECT l.created_at, l.order_id, o.order_number, l.entry_type, l.revenue_cents, \
                l.producer_cost_cents, l.packaging_cents, l.shipping_cents, l.payment_fee_cents, \
                l.customs_cents, l.gross_profit_cents, l.note \
         FROM ledger_entries l JOIN orders o ON o.id = l.order_id \
         WHERE l.created_at >= ? AND l.created_at < ? \
         ORDER BY l.created_at, l.id",
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
