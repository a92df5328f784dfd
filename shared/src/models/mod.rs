//! Data models
//!
//! Shared between the server and API clients (admin UI, partner portal).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! Money is `i64` minor units (cents), timestamps are `i64` Unix millis.

pub mod fulfillment;
pub mod ledger;
pub mod order;
pub mod partner;
pub mod producer;
pub mod report;
pub mod transaction;

// Re-exports
pub use fulfillment::*;
pub use ledger::*;
pub use order::*;
pub use partner::*;
pub use producer::*;
pub use report::*;
pub use transaction::*;
