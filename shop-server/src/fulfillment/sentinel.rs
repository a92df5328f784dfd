//! Stuck-order sentinel
//!
//! Read-only sweep, triggered externally. Reports `failed` fulfillment orders
//! of any age and `pending` ones older than the stale threshold, as one
//! grouped alert.

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::models::FulfillmentStatus;

use crate::db::repository::fulfillment::{self as repo, StuckRow};
use crate::error::ServiceResult;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct SentinelReport {
    /// Nothing stuck
    pub ok: bool,
    pub count: usize,
    pub failed: Vec<StuckRow>,
    pub stale_pending: Vec<StuckRow>,
    /// Whether the alert channel accepted the message
    pub alert_sent: bool,
}

/// Run one sweep and alert when anything is stuck
pub async fn run(state: &AppState) -> ServiceResult<SentinelReport> {
    let stale_before = shared::util::now_millis() - state.config.stale_pending_minutes * 60_000;
    let rows = repo::find_stuck(&state.pool, stale_before).await?;

    let (failed, stale_pending): (Vec<_>, Vec<_>) = rows
        .into_iter()
        .partition(|r| r.status == FulfillmentStatus::Failed);
    let count = failed.len() + stale_pending.len();

    if count == 0 {
        tracing::debug!("Sentinel: no stuck fulfillment orders");
        return Ok(SentinelReport {
            ok: true,
            count: 0,
            failed,
            stale_pending,
            alert_sent: false,
        });
    }

    let message = format_alert(&failed, &stale_pending, state.config.stale_pending_minutes);
    let alert_sent = match state.channels.alerts.send(&message).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "Sentinel alert could not be delivered");
            false
        }
    };
    tracing::warn!(
        failed = failed.len(),
        stale_pending = stale_pending.len(),
        "Sentinel found stuck fulfillment orders"
    );

    Ok(SentinelReport {
        ok: false,
        count,
        failed,
        stale_pending,
        alert_sent,
    })
}

fn format_created(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn format_row(row: &StuckRow) -> String {
    format!(
        "• {} / {} (retries: {}, created: {}) {}",
        row.order_number,
        row.producer_name,
        row.retry_count,
        format_created(row.created_at),
        row.last_error.as_deref().unwrap_or("-"),
    )
}

/// Alert text; depends only on the rows, so re-runs repeat it verbatim
pub fn format_alert(failed: &[StuckRow], stale_pending: &[StuckRow], stale_minutes: i64) -> String {
    let mut lines = vec![format!(
        "Stuck fulfillment orders: {}",
        failed.len() + stale_pending.len()
    )];
    if !failed.is_empty() {
        lines.push(format!("Failed ({}):", failed.len()));
        lines.extend(failed.iter().map(format_row));
    }
    if !stale_pending.is_empty() {
        lines.push(format!("Pending for more than {stale_minutes} min ({}):", stale_pending.len()));
        lines.extend(stale_pending.iter().map(format_row));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{self, TestEnv};

    #[tokio::test]
    async fn nothing_stuck_is_ok() {
        let env = TestEnv::new().await;
        let report = run(&env.state).await.unwrap();
        assert!(report.ok);
        assert_eq!(report.count, 0);
        assert!(env.alerts.messages().is_empty());
    }

    #[tokio::test]
    async fn flags_failed_and_stale_pending_only() {
        let env = TestEnv::new().await;
        let p1 = test_support::producer(&env.state, "P1").await;
        let p2 = test_support::producer(&env.state, "P2").await;
        let p3 = test_support::producer(&env.state, "P3").await;
        let now = shared::util::now_millis();

        let o1 = test_support::order(&env.state, "SO-1", &[(p1.id, "S1", 1, 100)]).await;
        let o2 = test_support::order(&env.state, "SO-2", &[(p2.id, "S2", 1, 100)]).await;
        let o3 = test_support::order(&env.state, "SO-3", &[(p3.id, "S3", 1, 100)]).await;

        let mut conn = env.state.pool.acquire().await.unwrap();
        // failed, recent
        let failed = repo::insert_if_absent(&mut conn, o1.id, p1.id, now - 60_000)
            .await
            .unwrap()
            .unwrap();
        repo::record_dispatch_failure(&mut conn, failed.id, "timeout", 1, now, now)
            .await
            .unwrap()
            .unwrap();
        // pending, two hours old
        let stale = repo::insert_if_absent(&mut conn, o2.id, p2.id, now - 2 * 3_600_000)
            .await
            .unwrap()
            .unwrap();
        // pending, five minutes old
        repo::insert_if_absent(&mut conn, o3.id, p3.id, now - 5 * 60_000)
            .await
            .unwrap()
            .unwrap();
        drop(conn);

        let report = run(&env.state).await.unwrap();
        assert!(!report.ok);
        assert_eq!(report.count, 2);
        assert_eq!(report.failed[0].fulfillment_order_id, failed.id);
        assert_eq!(report.failed[0].last_error.as_deref(), Some("timeout"));
        assert_eq!(report.stale_pending[0].fulfillment_order_id, stale.id);
        assert!(report.alert_sent);

        // Read-only: a second run alerts again with the same content
        run(&env.state).await.unwrap();
        let messages = env.alerts.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], messages[1]);
        assert!(messages[0].contains("SO-1"));
        assert!(messages[0].contains("SO-2"));
        assert!(!messages[0].contains("SO-3"));
    }
}
