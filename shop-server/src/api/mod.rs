//! HTTP API
//!
//! - `/health`: liveness
//! - `/stripe/webhook`: payment confirmation (signature-verified raw body)
//! - `/api/storefront/*`: checkout intake, cron token
//! - `/api/cron/*`: retry sweep and sentinel, cron token
//! - everything else under `/api`: operators, bearer token

pub mod audit;
pub mod cron;
pub mod fulfillment;
pub mod health;
pub mod ledger;
pub mod partners;
pub mod producers;
pub mod storefront;
pub mod webhook;

use axum::Router;
use axum::routing::{get, post, put};
use shared::error::AppError;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub type ApiResult<T> = Result<axum::Json<T>, AppError>;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    let storefront = Router::new()
        .route("/api/storefront/orders", post(storefront::create_order))
        .route("/api/storefront/orders/{order_number}", get(storefront::get_order));

    let cron = Router::new()
        .route("/api/cron/dispatch-due", post(cron::dispatch_due))
        .route("/api/cron/sentinel", post(cron::sentinel));

    let operator = Router::new()
        .route("/api/producers", get(producers::list).post(producers::create))
        .route("/api/fulfillment", get(fulfillment::list))
        .route("/api/fulfillment/{id}", get(fulfillment::get_by_id))
        .route("/api/fulfillment/{id}/retry", post(fulfillment::retry))
        .route("/api/fulfillment/{id}/status", put(fulfillment::update_status))
        .route("/api/partners", get(partners::list).post(partners::create))
        .route("/api/partners/{id}/deactivate", post(partners::deactivate))
        .route("/api/commissions", get(partners::list_commissions))
        .route("/api/commissions/{id}/pay", post(partners::mark_paid))
        .route("/api/ledger/orders/{order_id}", get(ledger::order_entries))
        .route("/api/ledger/orders/{order_id}/sale", post(ledger::backfill_sale))
        .route("/api/ledger/adjustments", post(ledger::record_adjustment))
        .route("/api/ledger/export/{period_id}", get(ledger::export_csv))
        .route("/api/reports", get(ledger::list_reports).post(ledger::generate_report))
        .route("/api/reports/{id}", get(ledger::get_report))
        .route("/api/reports/{id}/publish", post(ledger::publish_report))
        .route("/api/reports/{id}/verify", get(ledger::verify_report))
        .route("/api/transactions", get(ledger::list_transactions).post(ledger::create_transaction))
        .route("/api/transactions/{id}", get(ledger::get_transaction))
        .route("/api/transactions/{id}/countersign", post(ledger::countersign_transaction))
        .route("/api/audit", get(audit::list));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/stripe/webhook", post(webhook::handle_webhook))
        .merge(storefront)
        .merge(cron)
        .merge(operator)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
