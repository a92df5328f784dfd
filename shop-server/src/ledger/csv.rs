//! Ledger CSV export
//!
//! Rendered from the ledger on every request; nothing is cached or stored.

use chrono::DateTime;

use super::period::ReportPeriod;
use crate::auth::Actor;
use crate::db::repository::ledger::{self as repo, ExportRow};
use crate::error::ServiceResult;
use crate::money::cents_to_major;
use crate::state::AppState;
use shared::error::{AppError, ErrorCode};

pub const CSV_HEADER: &str = "date,order_id,order_number,entry_type,revenue,producer_cost,packaging,shipping,payment_fee,customs,gross_profit,note";

/// Quote a field when it contains a separator, quote or line break
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn format_date(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

pub fn render_csv(rows: &[ExportRow]) -> String {
    let mut out = String::with_capacity(CSV_HEADER.len() + rows.len() * 96);
    out.push_str(CSV_HEADER);
    out.push('\n');
    for row in rows {
        let fields = [
            format_date(row.created_at),
            row.order_id.to_string(),
            escape(&row.order_number),
            row.entry_type.as_str().to_string(),
            cents_to_major(row.revenue_cents),
            cents_to_major(row.producer_cost_cents),
            cents_to_major(row.packaging_cents),
            cents_to_major(row.shipping_cents),
            cents_to_major(row.payment_fee_cents),
            cents_to_major(row.customs_cents),
            cents_to_major(row.gross_profit_cents),
            escape(row.note.as_deref().unwrap_or_default()),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

/// CSV of every entry in the period, e.g. `MB-2026-03`
pub async fn export_period_csv(state: &AppState, period_id: &str, actor: &Actor) -> ServiceResult<String> {
    actor.require_back_office()?;
    let period = ReportPeriod::from_id(period_id).ok_or_else(|| {
        AppError::new(ErrorCode::InvalidReportPeriod).with_detail("period_id", period_id)
    })?;
    let (start, end) = period.bounds();
    let rows = repo::export_rows(&state.pool, start, end).await?;
    tracing::debug!(period_id, rows = rows.len(), "Ledger CSV rendered");
    Ok(render_csv(&rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::LedgerEntryType;

    fn row(note: Option<&str>) -> ExportRow {
        ExportRow {
            // 2026-03-14T12:00:00Z
            created_at: 1_773_489_600_000,
            order_id: 42,
            order_number: "SO-1001".into(),
            entry_type: LedgerEntryType::Sale,
            revenue_cents: 2599,
            producer_cost_cents: 1200,
            packaging_cents: 50,
            shipping_cents: 0,
            payment_fee_cents: 105,
            customs_cents: 0,
            gross_profit_cents: 1244,
            note: note.map(Into::into),
        }
    }

    #[test]
    fn header_and_major_units() {
        let csv = render_csv(&[row(None)]);
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER));
        assert_eq!(
            lines.next(),
            Some("2026-03-14,42,SO-1001,sale,25.99,12.00,0.50,0.00,1.05,0.00,12.44,")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn notes_are_quoted_and_escaped() {
        let csv = render_csv(&[row(Some("said \"ok\", paid"))]);
        assert!(csv.ends_with(",\"said \"\"ok\"\", paid\"\n"));
    }

    #[test]
    fn empty_ledger_is_just_the_header() {
        assert_eq!(render_csv(&[]), format!("{CSV_HEADER}\n"));
    }

    #[tokio::test]
    async fn export_reads_current_ledger() {
        use crate::ledger::entries::record_sale_entry;
        use crate::test_support::{self, TestEnv};
        use chrono::{Datelike, Utc};

        let env = TestEnv::new().await;
        let p = test_support::producer(&env.state, "P").await;
        let order = test_support::order(&env.state, "SO-7", &[(p.id, "SKU", 1, 1000)]).await;
        let today = Utc::now().date_naive();
        let period_id = format!("MB-{}-{:02}", today.year(), today.month());

        let before = export_period_csv(&env.state, &period_id, &test_support::viewer()).await.unwrap();
        assert_eq!(before.lines().count(), 1);

        record_sale_entry(&env.state, &order, &Actor::system("test")).await.unwrap();
        let after = export_period_csv(&env.state, &period_id, &test_support::viewer()).await.unwrap();
        assert_eq!(after.lines().count(), 2);
        assert!(after.contains(",SO-7,sale,10.00,"));

        let err = export_period_csv(&env.state, "XX-1", &test_support::viewer()).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::InvalidReportPeriod));
    }
}
