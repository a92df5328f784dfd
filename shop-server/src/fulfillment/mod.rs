//! Fulfillment: per-producer sub-orders, dispatch with bounded retries,
//! operator overrides and the stuck-order sentinel.

pub mod dispatcher;
pub mod sentinel;

use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::{FulfillmentStatus, OrderStatus};

pub use dispatcher::{DispatchOutcome, DispatchSummary, create_for_order};
pub use sentinel::SentinelReport;

/// Dispatch attempt budget and backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Failed attempts before the order becomes `failed`
    pub max_attempts: u32,
    pub base_delay_secs: u64,
    pub max_delay_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_secs: 60,
            max_delay_secs: 3600,
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt after `retry_count` failures:
    /// `base * 2^retry_count`, capped at `max_delay_secs`
    pub fn backoff_secs(&self, retry_count: u32) -> u64 {
        2u64.checked_pow(retry_count)
            .and_then(|factor| self.base_delay_secs.checked_mul(factor))
            .unwrap_or(u64::MAX)
            .min(self.max_delay_secs)
    }

    /// Unix millis of the next attempt
    pub fn next_attempt_at(&self, now: i64, retry_count: u32) -> i64 {
        let delay_ms = i64::try_from(self.backoff_secs(retry_count).saturating_mul(1000)).unwrap_or(i64::MAX);
        now.saturating_add(delay_ms)
    }
}

/// Validate a manual operator transition
///
/// `pending` is only reachable through the retry endpoint. Delivered and
/// cancelled orders accept nothing but a replay of their own state.
pub fn validate_transition(from: FulfillmentStatus, to: FulfillmentStatus) -> Result<(), AppError> {
    if to == FulfillmentStatus::Pending {
        return Err(AppError::with_message(
            ErrorCode::FulfillmentInvalidTransition,
            "Use the retry endpoint to reset a fulfillment order to pending",
        )
        .with_detail("from", from.as_str())
        .with_detail("to", to.as_str()));
    }
    if from.is_final() && from != to {
        return Err(AppError::with_message(
            ErrorCode::FulfillmentInvalidTransition,
            format!("Fulfillment order is {from}; no further transitions allowed"),
        )
        .with_detail("from", from.as_str())
        .with_detail("to", to.as_str()));
    }
    Ok(())
}

/// Parent order status implied by its fulfillment orders
///
/// Cancelled sub-orders are ignored. `None` when nothing has shipped yet.
pub fn aggregate_order_status(statuses: &[FulfillmentStatus]) -> Option<OrderStatus> {
    let live: Vec<_> = statuses
        .iter()
        .filter(|s| **s != FulfillmentStatus::Cancelled)
        .collect();
    if live.is_empty() {
        return None;
    }
    if live.iter().all(|s| **s == FulfillmentStatus::Delivered) {
        Some(OrderStatus::Delivered)
    } else if live.iter().all(|s| s.has_shipped()) {
        Some(OrderStatus::Shipped)
    } else if live.iter().any(|s| s.has_shipped()) {
        Some(OrderStatus::PartiallyShipped)
    } else {
        None
    }
}
