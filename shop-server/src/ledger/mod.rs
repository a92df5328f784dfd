//! Ledger, period reports and off-ledger transactions

pub mod aggregate;
pub mod csv;
pub mod entries;
pub mod hash;
pub mod period;
pub mod report;
pub mod split;
pub mod transactions;

pub use aggregate::{AggregateResult, aggregate_period};
pub use entries::{backfill_sale_entry, record_adjustment, record_sale_entry};
pub use hash::compute_report_hash;
pub use period::ReportPeriod;
pub use report::{generate_report, publish_report, verify_report};
pub use transactions::{countersign_transaction, create_transaction};
