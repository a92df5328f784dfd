//! Logging and small helpers

pub mod logger;
