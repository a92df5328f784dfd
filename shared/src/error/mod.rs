//! Unified error system
//!
//! - [`ErrorCode`]: Standardized numeric error codes
//! - [`ErrorCategory`]: Classification of errors by domain
//! - [`AppError`]: Rich error type with codes, messages, and details
//! - [`ApiResponse`]: Unified API response format
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode, ApiResponse};
//!
//! let err = AppError::new(ErrorCode::ReportAlreadyPublished)
//!     .with_detail("report_id", "MB-2026-03");
//!
//! let response = ApiResponse::<()>::error(&err);
//! assert_eq!(response.code, Some(6103));
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError, AppResult};
