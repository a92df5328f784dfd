//! shop-server: storefront back office
//!
//! Business-rules core behind the storefront:
//! - Fulfillment dispatcher (per-producer sub-orders, retry/backoff, manual override)
//! - Stuck-order sentinel
//! - Partner commission engine (attribution, idempotent, append-only)
//! - Ledger, period reports with content hash, CSV export
//! - Off-ledger transactions with countersignature
//!
//! Everything is exposed through an axum router (`api::create_router`). Outbound
//! systems (producers, tracking dashboard, alerts, payment gateway) sit behind
//! traits in [`channels`] so tests run against in-process stubs.

pub mod api;
pub mod audit;
pub mod auth;
pub mod channels;
pub mod commission;
pub mod config;
pub mod db;
pub mod error;
pub mod fulfillment;
pub mod ledger;
pub mod money;
pub mod orders;
pub mod producers;
pub mod side_effects;
pub mod state;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::Config;
pub use state::AppState;
