//! Off-ledger Transaction Model
//!
//! Manual money movements (owner draws, supplier prepayments, ...) that do
//! not belong to a single order. Large ones need a second admin.

use serde::{Deserialize, Serialize};

/// Transactions whose absolute amount exceeds this need a countersignature
pub const COUNTERSIGNATURE_THRESHOLD_CENTS: i64 = 100_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct LedgerTransaction {
    /// `TXN-<year>-<seq:04>`
    pub id: String,
    pub year: i64,
    pub seq: i64,
    /// Signed; negative for outgoing money
    pub amount_cents: i64,
    pub description: String,
    pub counterparty: Option<String>,
    pub created_by: String,
    pub requires_countersignature: bool,
    pub countersigned_by: Option<String>,
    pub countersigned_at: Option<i64>,
    pub created_at: i64,
}

impl LedgerTransaction {
    /// Required and not yet given
    pub fn awaiting_countersignature(&self) -> bool {
        self.requires_countersignature && self.countersigned_by.is_none()
    }
}

/// Whether an amount needs a second signature
pub fn requires_countersignature(amount_cents: i64) -> bool {
    amount_cents.unsigned_abs() > COUNTERSIGNATURE_THRESHOLD_CENTS as u64
}

/// Create transaction payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionCreate {
    pub amount_cents: i64,
    pub description: String,
    pub counterparty: Option<String>,
}
