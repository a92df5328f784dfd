//! Shared types for the storefront back office
//!
//! Error codes, API response envelope, domain models and small utilities
//! used by the server and by API clients (admin UI, partner portal).

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};
