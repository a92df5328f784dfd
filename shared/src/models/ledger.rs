//! Ledger Model
//!
//! Append-only. Corrections are recorded as new `adjustment` or `refund`
//! entries, never by editing an existing row.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum LedgerEntryType {
    Sale,
    Adjustment,
    Refund,
}

impl LedgerEntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sale => "sale",
            Self::Adjustment => "adjustment",
            Self::Refund => "refund",
        }
    }
}

/// Monetary event for one order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct LedgerEntry {
    pub id: i64,
    pub order_id: i64,
    pub entry_type: LedgerEntryType,
    pub revenue_cents: i64,
    pub producer_cost_cents: i64,
    pub packaging_cents: i64,
    pub shipping_cents: i64,
    /// Exact processing fee reported by the payment gateway
    pub payment_fee_cents: i64,
    pub customs_cents: i64,
    /// revenue - (producer cost + packaging + shipping + fee + customs)
    pub gross_profit_cents: i64,
    pub note: Option<String>,
    pub created_by: String,
    pub created_at: i64,

    #[cfg_attr(feature = "db", sqlx(skip))]
    #[serde(default)]
    pub shares: Vec<LedgerShare>,
}

/// Beneficiary share of an entry's gross profit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct LedgerShare {
    pub entry_id: i64,
    pub beneficiary: String,
    pub amount_cents: i64,
}

/// Monetary breakdown of a new entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerAmounts {
    #[serde(default)]
    pub revenue_cents: i64,
    #[serde(default)]
    pub producer_cost_cents: i64,
    #[serde(default)]
    pub packaging_cents: i64,
    #[serde(default)]
    pub shipping_cents: i64,
    #[serde(default)]
    pub payment_fee_cents: i64,
    #[serde(default)]
    pub customs_cents: i64,
}

impl LedgerAmounts {
    pub fn total_costs(&self) -> i64 {
        self.producer_cost_cents
            + self.packaging_cents
            + self.shipping_cents
            + self.payment_fee_cents
            + self.customs_cents
    }

    pub fn gross_profit(&self) -> i64 {
        self.revenue_cents - self.total_costs()
    }
}

/// Operator correction payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerAdjustmentCreate {
    pub order_id: i64,
    pub entry_type: LedgerEntryType,
    #[serde(flatten)]
    pub amounts: LedgerAmounts,
    pub note: String,
}
