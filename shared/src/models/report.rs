//! Period Report Model

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum ReportPeriodType {
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl ReportPeriodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum ReportStatus {
    Draft,
    Published,
}

/// Persisted period report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Report {
    /// Deterministic id, e.g. `MB-2026-03`
    pub id: String,
    pub period_type: ReportPeriodType,
    /// Inclusive start (Unix millis)
    pub period_start: i64,
    /// Exclusive end (Unix millis)
    pub period_end: i64,
    pub revenue_cents: i64,
    pub total_costs_cents: i64,
    pub payment_fee_cents: i64,
    pub gross_profit_cents: i64,
    pub order_count: i64,
    pub entry_count: i64,
    pub avg_order_value_cents: i64,
    pub top_item_sku: Option<String>,
    pub top_item_quantity: Option<i64>,
    /// Canonical JSON of the full aggregate
    pub data: String,
    /// SHA-256 hex over the canonical aggregate
    pub content_hash: String,
    pub status: ReportStatus,
    pub generated_by: String,
    pub generated_at: i64,
    pub published_by: Option<String>,
    pub published_at: Option<i64>,
}

/// Generate report payload
///
/// `number` is the ISO week, month or quarter; ignored for yearly reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportGenerate {
    pub period_type: ReportPeriodType,
    pub year: i32,
    pub number: Option<u32>,
}

/// Result of recomputing a stored report from the current ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportVerification {
    pub report_id: String,
    pub stored_hash: String,
    pub computed_hash: String,
    pub intact: bool,
}
