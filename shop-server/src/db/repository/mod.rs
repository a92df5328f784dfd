//! Repository Module
//!
//! Free async functions over SQLite. Functions that must run inside a
//! caller-owned transaction take `&mut SqliteConnection` (pass `&mut *tx`);
//! single-statement reads accept any executor.

pub mod audit;
pub mod commission;
pub mod fulfillment;
pub mod ledger;
pub mod order;
pub mod partner;
pub mod producer;
pub mod report;
pub mod transaction;
pub mod webhook_event;

use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => RepoError::NotFound("row".into()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Duplicate(db.message().to_string())
            }
            _ => RepoError::Database(err.to_string()),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;
