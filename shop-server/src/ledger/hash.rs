//! Report content hash
//!
//! SHA-256 over a fixed-order serialization of the aggregate: integers as
//! little-endian bytes, strings `\x00`-terminated, optional values tagged.

use sha2::{Digest, Sha256};

use super::aggregate::AggregateResult;

pub fn compute_report_hash(agg: &AggregateResult) -> String {
    let mut hasher = Sha256::new();

    hash_str(&mut hasher, &agg.period_id);
    hasher.update(agg.period_start.to_le_bytes());
    hasher.update(agg.period_end.to_le_bytes());

    for amount in [
        agg.revenue_cents,
        agg.producer_cost_cents,
        agg.packaging_cents,
        agg.shipping_cents,
        agg.payment_fee_cents,
        agg.customs_cents,
        agg.total_costs_cents,
        agg.gross_profit_cents,
    ] {
        hasher.update(amount.to_le_bytes());
    }

    // BTreeMap: sorted by beneficiary
    hasher.update((agg.shares.len() as u64).to_le_bytes());
    for (beneficiary, amount) in &agg.shares {
        hash_str(&mut hasher, beneficiary);
        hasher.update(amount.to_le_bytes());
    }

    hasher.update(agg.entry_count.to_le_bytes());
    hasher.update(agg.order_count.to_le_bytes());
    hasher.update(agg.avg_order_value_cents.to_le_bytes());

    match &agg.top_item {
        Some(item) => {
            hasher.update(b"\x01");
            hash_str(&mut hasher, &item.sku);
            hash_str(&mut hasher, &item.name);
            hasher.update(item.quantity.to_le_bytes());
        }
        None => hasher.update(b"\x00"),
    }

    hash_str(&mut hasher, &agg.entries_digest);

    hex::encode(hasher.finalize())
}

fn hash_str(hasher: &mut Sha256, value: &str) {
    hasher.update(value.as_bytes());
    hasher.update(b"\x00");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::aggregate::{aggregate_entries, digest_entries};
    use crate::ledger::period::ReportPeriod;
    use shared::models::{LedgerEntry, LedgerEntryType, ReportPeriodType};

    fn sale(id: i64, revenue: i64) -> LedgerEntry {
        LedgerEntry {
            id,
            order_id: id,
            entry_type: LedgerEntryType::Sale,
            revenue_cents: revenue,
            producer_cost_cents: 0,
            packaging_cents: 0,
            shipping_cents: 0,
            payment_fee_cents: 0,
            customs_cents: 0,
            gross_profit_cents: revenue,
            note: None,
            created_by: "test".into(),
            created_at: id,
            shares: Vec::new(),
        }
    }

    fn period() -> ReportPeriod {
        ReportPeriod::new(ReportPeriodType::Quarterly, 2026, Some(1)).unwrap()
    }

    #[test]
    fn same_input_same_hash() {
        let entries = vec![sale(1, 1000), sale(2, 2000)];
        let a = compute_report_hash(&aggregate_entries(&period(), &entries, &[]));
        let b = compute_report_hash(&aggregate_entries(&period(), &entries, &[]));
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn one_more_entry_changes_hash() {
        let mut entries = vec![sale(1, 1000)];
        let before = compute_report_hash(&aggregate_entries(&period(), &entries, &[]));
        entries.push(sale(2, 0));
        let after = compute_report_hash(&aggregate_entries(&period(), &entries, &[]));
        assert_ne!(before, after);
    }

    #[test]
    fn digest_is_part_of_hash() {
        let entries = vec![sale(1, 1000)];
        let mut agg = aggregate_entries(&period(), &entries, &[]);
        let original = compute_report_hash(&agg);
        agg.entries_digest = digest_entries(&[sale(1, 1001)]);
        assert_ne!(compute_report_hash(&agg), original);
    }
}
