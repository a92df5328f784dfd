//! Period aggregation over the ledger
//!
//! Pure over its inputs: the same entries and item quantities always give
//! the same [`AggregateResult`].

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared::models::{LedgerEntry, LedgerEntryType};
use sqlx::SqlitePool;

use super::period::ReportPeriod;
use crate::db::repository::{RepoResult, ledger as repo};
use crate::db::repository::ledger::ItemQuantity;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopItem {
    pub sku: String,
    pub name: String,
    pub quantity: i64,
}

/// Everything a period report is made of
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub period_id: String,
    pub period_start: i64,
    pub period_end: i64,
    pub revenue_cents: i64,
    pub producer_cost_cents: i64,
    pub packaging_cents: i64,
    pub shipping_cents: i64,
    pub payment_fee_cents: i64,
    pub customs_cents: i64,
    pub total_costs_cents: i64,
    pub gross_profit_cents: i64,
    /// Gross profit per beneficiary
    pub shares: BTreeMap<String, i64>,
    pub entry_count: i64,
    /// Orders with a sale entry in the period
    pub order_count: i64,
    /// Sale revenue / order count, rounded half away from zero
    pub avg_order_value_cents: i64,
    pub top_item: Option<TopItem>,
    /// SHA-256 over every entry row in order, so any row change shows up
    pub entries_digest: String,
}

/// Digest of the ordered entry rows, shares included
pub fn digest_entries(entries: &[LedgerEntry]) -> String {
    let mut hasher = Sha256::new();
    for e in entries {
        hasher.update(e.id.to_le_bytes());
        hasher.update(e.order_id.to_le_bytes());
        hasher.update(e.entry_type.as_str().as_bytes());
        hasher.update(b"\x00");
        for amount in [
            e.revenue_cents,
            e.producer_cost_cents,
            e.packaging_cents,
            e.shipping_cents,
            e.payment_fee_cents,
            e.customs_cents,
            e.gross_profit_cents,
        ] {
            hasher.update(amount.to_le_bytes());
        }
        hasher.update(e.note.as_deref().unwrap_or_default().as_bytes());
        hasher.update(b"\x00");
        hasher.update(e.created_at.to_le_bytes());
        for share in &e.shares {
            hasher.update(share.beneficiary.as_bytes());
            hasher.update(b"\x00");
            hasher.update(share.amount_cents.to_le_bytes());
        }
        hasher.update(b"\x1e");
    }
    hex::encode(hasher.finalize())
}

/// Aggregate already-loaded rows
///
/// `items` must be sorted by quantity descending then SKU ascending; the
/// first one is the top item.
pub fn aggregate_entries(period: &ReportPeriod, entries: &[LedgerEntry], items: &[ItemQuantity]) -> AggregateResult {
    let (period_start, period_end) = period.bounds();
    let mut agg = AggregateResult {
        period_id: period.id(),
        period_start,
        period_end,
        revenue_cents: 0,
        producer_cost_cents: 0,
        packaging_cents: 0,
        shipping_cents: 0,
        payment_fee_cents: 0,
        customs_cents: 0,
        total_costs_cents: 0,
        gross_profit_cents: 0,
        shares: BTreeMap::new(),
        entry_count: entries.len() as i64,
        order_count: 0,
        avg_order_value_cents: 0,
        top_item: None,
        entries_digest: digest_entries(entries),
    };

    let mut sale_orders = BTreeSet::new();
    let mut sale_revenue: i64 = 0;
    for e in entries {
        agg.revenue_cents += e.revenue_cents;
        agg.producer_cost_cents += e.producer_cost_cents;
        agg.packaging_cents += e.packaging_cents;
        agg.shipping_cents += e.shipping_cents;
        agg.payment_fee_cents += e.payment_fee_cents;
        agg.customs_cents += e.customs_cents;
        agg.gross_profit_cents += e.gross_profit_cents;
        for share in &e.shares {
            *agg.shares.entry(share.beneficiary.clone()).or_default() += share.amount_cents;
        }
        if e.entry_type == LedgerEntryType::Sale {
            sale_orders.insert(e.order_id);
            sale_revenue += e.revenue_cents;
        }
    }
    agg.total_costs_cents = agg.producer_cost_cents
        + agg.packaging_cents
        + agg.shipping_cents
        + agg.payment_fee_cents
        + agg.customs_cents;

    agg.order_count = sale_orders.len() as i64;
    if agg.order_count > 0 {
        agg.avg_order_value_cents = (Decimal::from(sale_revenue) / Decimal::from(agg.order_count))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .unwrap_or_default();
    }

    agg.top_item = items.first().map(|i| TopItem {
        sku: i.sku.clone(),
        name: i.name.clone(),
        quantity: i.quantity,
    });
    agg
}

/// Load and aggregate everything in the period's bounds
pub async fn aggregate_period(pool: &SqlitePool, period: &ReportPeriod) -> RepoResult<AggregateResult> {
    let (start, end) = period.bounds();
    let entries = repo::list_in_range(pool, start, end).await?;
    let items = repo::item_quantities_in_range(pool, start, end).await?;
    Ok(aggregate_entries(period, &entries, &items))
}
