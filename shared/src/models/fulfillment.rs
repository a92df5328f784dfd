//! Fulfillment Order Model
//!
//! One fulfillment order per (customer order, producer). Status history is
//! kept in `fulfillment_events`, never rewritten.

use serde::{Deserialize, Serialize};

/// Fulfillment order lifecycle
///
/// ```text
/// pending -> sent_to_producer -> confirmed -> shipped -> delivered
///    |  ^
///    v  | (operator retry)
///  failed            cancelled (from any non-terminal state)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum FulfillmentStatus {
    Pending,
    SentToProducer,
    Confirmed,
    Shipped,
    Delivered,
    Failed,
    Cancelled,
}

impl FulfillmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::SentToProducer => "sent_to_producer",
            Self::Confirmed => "confirmed",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// No transition leaves these states except an identical replay
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// States from which the operator retry endpoint may re-dispatch
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Pending | Self::Failed)
    }

    /// Shipped or further along the happy path
    pub fn has_shipped(&self) -> bool {
        matches!(self, Self::Shipped | Self::Delivered)
    }
}

impl std::fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FulfillmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "sent_to_producer" => Ok(Self::SentToProducer),
            "confirmed" => Ok(Self::Confirmed),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown fulfillment status: {other}")),
        }
    }
}

/// Fulfillment order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct FulfillmentOrder {
    pub id: i64,
    pub order_id: i64,
    pub producer_id: i64,
    pub status: FulfillmentStatus,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
    /// Failed dispatch attempts so far; never decreases
    pub retry_count: i64,
    pub last_error: Option<String>,
    /// Earliest time the automatic sweep may attempt dispatch again
    pub next_attempt_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    pub confirmed_at: Option<i64>,
    pub shipped_at: Option<i64>,
    pub delivered_at: Option<i64>,
}

/// Kind of fulfillment history event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum FulfillmentEventKind {
    Created,
    DispatchSucceeded,
    DispatchFailed,
    StatusChanged,
    RetryRequested,
}

/// Fulfillment history event (append-only)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct FulfillmentEvent {
    pub id: i64,
    pub fulfillment_order_id: i64,
    pub kind: FulfillmentEventKind,
    pub old_status: Option<FulfillmentStatus>,
    pub new_status: FulfillmentStatus,
    /// Operator id, or `system` for automatic transitions
    pub actor: String,
    /// JSON snapshot (error text, tracking info, ...)
    pub payload: Option<String>,
    pub created_at: i64,
}

/// Manual status update payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FulfillmentStatusUpdate {
    pub status: FulfillmentStatus,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
    pub note: Option<String>,
}
