//! Audit trail for operator and money-moving actions
//!
//! Each action is written to the `audit_log` table in the caller's transaction
//! and mirrored to the `audit` tracing target (rotated audit log files).

use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;

use crate::auth::Actor;
use crate::db::repository::{RepoResult, audit as repo};

/// Audited action (closed set, never free text)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AuditAction {
    // Orders
    OrderPaid,
    ProducerCreated,

    // Fulfillment
    FulfillmentStatusChanged,
    FulfillmentRetryRequested,

    // Commissions
    PartnerCreated,
    PartnerDeactivated,
    CommissionCreated,
    CommissionPaid,

    // Ledger
    LedgerSaleRecorded,
    LedgerAdjustmentRecorded,
    ReportGenerated,
    ReportPublished,
    TransactionCreated,
    TransactionCountersigned,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrderPaid => "order_paid",
            Self::ProducerCreated => "producer_created",
            Self::FulfillmentStatusChanged => "fulfillment_status_changed",
            Self::FulfillmentRetryRequested => "fulfillment_retry_requested",
            Self::PartnerCreated => "partner_created",
            Self::PartnerDeactivated => "partner_deactivated",
            Self::CommissionCreated => "commission_created",
            Self::CommissionPaid => "commission_paid",
            Self::LedgerSaleRecorded => "ledger_sale_recorded",
            Self::LedgerAdjustmentRecorded => "ledger_adjustment_recorded",
            Self::ReportGenerated => "report_generated",
            Self::ReportPublished => "report_published",
            Self::TransactionCreated => "transaction_created",
            Self::TransactionCountersigned => "transaction_countersigned",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored audit row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditEntry {
    pub id: i64,
    pub actor_id: String,
    pub actor_email: Option<String>,
    pub action: AuditAction,
    /// e.g. "fulfillment_order", "report"
    pub resource_type: String,
    pub resource_id: String,
    /// JSON details
    pub details: Option<String>,
    pub created_at: i64,
}

/// Audit list filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub action: Option<AuditAction>,
    pub limit: Option<i64>,
}

/// Write one audit row on `conn` and mirror it to the audit log target
pub async fn record(
    conn: &mut SqliteConnection,
    actor: &Actor,
    action: AuditAction,
    resource_type: &str,
    resource_id: &str,
    details: Option<serde_json::Value>,
) -> RepoResult<i64> {
    let id = repo::insert(
        conn,
        &repo::NewAuditEntry {
            actor_id: &actor.id,
            actor_email: actor.email.as_deref(),
            action,
            resource_type,
            resource_id,
            details: details.as_ref(),
        },
        shared::util::now_millis(),
    )
    .await?;

    let resource = format!("{resource_type}:{resource_id}");
    if let Some(d) = &details {
        crate::audit_log!(
            actor.id.as_str(),
            action.as_str(),
            resource.as_str(),
            d.to_string().as_str()
        );
    } else {
        crate::audit_log!(actor.id.as_str(), action.as_str(), resource.as_str());
    }
    Ok(id)
}
