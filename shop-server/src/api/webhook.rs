//! Payment webhook
//!
//! POST /stripe/webhook: raw body for signature verification. Each event id
//! is processed at most once; a failed event is forgotten again so the
//! gateway's redelivery gets another chance.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};

use shared::error::ErrorCode;

use crate::channels::stripe;
use crate::db::repository::webhook_event;
use crate::error::ServiceError;
use crate::orders;
use crate::security_log;
use crate::state::AppState;

pub async fn handle_webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> StatusCode {
    let Some(sig_header) = headers.get("stripe-signature").and_then(|v| v.to_str().ok()) else {
        security_log!(WARN, "webhook_signature_missing", source = "stripe");
        return StatusCode::BAD_REQUEST;
    };

    let now_secs = chrono::Utc::now().timestamp();
    if let Err(reason) =
        stripe::verify_webhook_signature(&body, sig_header, &state.config.stripe_webhook_secret, now_secs)
    {
        security_log!(WARN, "webhook_signature_invalid", source = "stripe", reason = reason);
        return StatusCode::BAD_REQUEST;
    }

    let event: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to parse webhook JSON");
            return StatusCode::BAD_REQUEST;
        }
    };
    let event_type = event["type"].as_str().unwrap_or_default();
    let Some(event_id) = event["id"].as_str() else {
        tracing::warn!(event_type, "Webhook event missing id");
        return StatusCode::BAD_REQUEST;
    };
    tracing::info!(event_id, event_type, "Received payment webhook");

    match webhook_event::mark_processed(&state.pool, event_id, event_type).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::info!(event_id, "Duplicate webhook event, skipping");
            return StatusCode::OK;
        }
        Err(e) => {
            tracing::error!(error = %e, "DB error recording webhook event");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    }

    let status = match event_type {
        "checkout.session.completed" => handle_checkout_completed(&state, &event).await,
        _ => {
            tracing::debug!(event_type, "Unhandled webhook event type");
            StatusCode::OK
        }
    };

    if status.is_server_error()
        && let Err(e) = webhook_event::unmark(&state.pool, event_id).await
    {
        tracing::error!(event_id, error = %e, "Failed to release webhook event for redelivery");
    }
    status
}

/// checkout.session.completed -> order paid
///
/// `client_reference_id` carries the order number, `payment_intent` the
/// payment reference used for the fee lookup.
async fn handle_checkout_completed(state: &AppState, event: &serde_json::Value) -> StatusCode {
    let Some(obj) = event.get("data").and_then(|d| d.get("object")) else {
        return StatusCode::OK;
    };
    let Some(order_number) = obj["client_reference_id"].as_str() else {
        tracing::warn!("checkout.session.completed missing client_reference_id");
        return StatusCode::OK;
    };
    let Some(payment_ref) = obj["payment_intent"].as_str() else {
        tracing::warn!(order_number, "checkout.session.completed missing payment_intent");
        return StatusCode::OK;
    };

    match orders::record_paid_order(state, order_number, payment_ref).await {
        Ok(outcome) => {
            tracing::info!(
                order_number,
                newly_paid = outcome.newly_paid,
                fulfillment_orders = outcome.fulfillment_orders.len(),
                ledger_deferred = outcome.ledger_deferred,
                "Payment processed"
            );
            StatusCode::OK
        }
        Err(e) if is_permanent(&e) => {
            tracing::warn!(order_number, error = %e, "Payment could not be applied");
            StatusCode::OK
        }
        Err(e) => {
            tracing::error!(order_number, error = %e, "Payment processing failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Business rejections (unknown or unpayable order) will not succeed on
/// redelivery. Business keys are absorbed by the pipeline itself, so a
/// unique violation reaching here is a storage fault and is retried.
fn is_permanent(err: &ServiceError) -> bool {
    matches!(err.code(), Some(code) if code != ErrorCode::AlreadyExists)
}
