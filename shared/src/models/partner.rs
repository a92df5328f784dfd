//! Partner & Commission Models

use serde::{Deserialize, Serialize};

/// Partner configuration (B2B affiliate)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct PartnerConfig {
    pub id: i64,
    /// Attribution code, unique
    pub code: String,
    pub name: String,
    /// Percent of order total; 0 means commission is waived
    pub commission_percent: f64,
    pub active: bool,
    pub payout_account: Option<String>,
    pub created_at: i64,
}

/// Create partner payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerCreate {
    pub code: String,
    pub name: String,
    pub commission_percent: f64,
    pub payout_account: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum CommissionStatus {
    Pending,
    Paid,
    Waived,
}

impl CommissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Waived => "waived",
        }
    }
}

/// Commission owed to a partner for one order
///
/// Exactly one per (partner, order). Amount fields are never rewritten;
/// the only transition is `pending -> paid`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct PartnerCommission {
    pub id: i64,
    pub partner_config_id: i64,
    pub order_id: i64,
    pub order_total_cents: i64,
    /// Percent snapshot at creation time
    pub commission_percent: f64,
    pub commission_cents: i64,
    pub status: CommissionStatus,
    /// Raw attribution string that produced this commission
    pub attribution_source: Option<String>,
    pub payout_transfer_id: Option<String>,
    pub created_at: i64,
    pub paid_at: Option<i64>,
}

/// Mark commission paid payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionPayout {
    pub transfer_id: String,
}
