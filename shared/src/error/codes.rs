//! Unified error codes for the back office
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Order / fulfillment errors
//! - 5xxx: Payment / commission errors
//! - 6xxx: Ledger / report errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so the admin UI and the
/// partner portal can switch on them without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,
    /// Resource is not in a state that allows the operation
    StateConflict = 9,

    // ==================== 1xxx: Auth ====================
    /// Caller is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,
    /// Webhook signature missing or wrong
    WebhookSignatureInvalid = 1010,
    /// Cron token missing or wrong
    CronTokenInvalid = 1011,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Admin role required
    AdminRequired = 2003,
    /// Countersigner must differ from the creator
    CountersignerIsCreator = 2010,

    // ==================== 4xxx: Order / Fulfillment ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order is not awaiting payment
    OrderNotPayable = 4002,
    /// Order has no items
    OrderEmpty = 4007,
    /// Fulfillment order not found
    FulfillmentNotFound = 4101,
    /// Requested fulfillment transition is not allowed
    FulfillmentInvalidTransition = 4102,
    /// Fulfillment order cannot be retried from its current state
    FulfillmentNotRetryable = 4103,
    /// Producer not found
    ProducerNotFound = 4201,

    // ==================== 5xxx: Payment / Commission ====================
    /// Payment gateway call failed
    PaymentFailed = 5001,
    /// Gateway did not report the processing fee
    PaymentFeeUnavailable = 5010,
    /// Partner not found
    PartnerNotFound = 5101,
    /// Commission not found
    CommissionNotFound = 5102,
    /// Commission is not pending
    CommissionNotPayable = 5103,

    // ==================== 6xxx: Ledger / Report ====================
    /// Sale entry already recorded for this order
    LedgerEntryExists = 6001,
    /// Report not found
    ReportNotFound = 6101,
    /// Report for this period already exists
    ReportAlreadyExists = 6102,
    /// Report is already published
    ReportAlreadyPublished = 6103,
    /// Report period is invalid
    InvalidReportPeriod = 6104,
    /// Off-ledger transaction not found
    TransactionNotFound = 6201,
    /// Transaction does not need a countersignature
    CountersignatureNotRequired = 6202,
    /// Transaction is already countersigned
    AlreadyCountersigned = 6203,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9003,
    /// Network error
    NetworkError = 9004,
    /// Operation timed out
    TimeoutError = 9005,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",
            ErrorCode::StateConflict => "Resource state does not allow this operation",

            // Auth
            ErrorCode::NotAuthenticated => "Caller is not authenticated",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",
            ErrorCode::WebhookSignatureInvalid => "Webhook signature is invalid",
            ErrorCode::CronTokenInvalid => "Cron token is invalid",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::AdminRequired => "Administrator role is required",
            ErrorCode::CountersignerIsCreator => "Countersigner must differ from the creator",

            // Order / Fulfillment
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderNotPayable => "Order is not awaiting payment",
            ErrorCode::OrderEmpty => "Order has no items",
            ErrorCode::FulfillmentNotFound => "Fulfillment order not found",
            ErrorCode::FulfillmentInvalidTransition => "Fulfillment transition is not allowed",
            ErrorCode::FulfillmentNotRetryable => "Fulfillment order cannot be retried",
            ErrorCode::ProducerNotFound => "Producer not found",

            // Payment / Commission
            ErrorCode::PaymentFailed => "Payment gateway call failed",
            ErrorCode::PaymentFeeUnavailable => "Payment fee is not available",
            ErrorCode::PartnerNotFound => "Partner not found",
            ErrorCode::CommissionNotFound => "Commission not found",
            ErrorCode::CommissionNotPayable => "Commission is not pending",

            // Ledger / Report
            ErrorCode::LedgerEntryExists => "Ledger entry already recorded",
            ErrorCode::ReportNotFound => "Report not found",
            ErrorCode::ReportAlreadyExists => "Report already exists",
            ErrorCode::ReportAlreadyPublished => "Report is already published",
            ErrorCode::InvalidReportPeriod => "Invalid report period",
            ErrorCode::TransactionNotFound => "Transaction not found",
            ErrorCode::CountersignatureNotRequired => "Transaction does not require a countersignature",
            ErrorCode::AlreadyCountersigned => "Transaction is already countersigned",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::TimeoutError => "Operation timed out",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),
            9 => Ok(ErrorCode::StateConflict),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),
            1010 => Ok(ErrorCode::WebhookSignatureInvalid),
            1011 => Ok(ErrorCode::CronTokenInvalid),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2003 => Ok(ErrorCode::AdminRequired),
            2010 => Ok(ErrorCode::CountersignerIsCreator),

            // Order / Fulfillment
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderNotPayable),
            4007 => Ok(ErrorCode::OrderEmpty),
            4101 => Ok(ErrorCode::FulfillmentNotFound),
            4102 => Ok(ErrorCode::FulfillmentInvalidTransition),
            4103 => Ok(ErrorCode::FulfillmentNotRetryable),
            4201 => Ok(ErrorCode::ProducerNotFound),

            // Payment / Commission
            5001 => Ok(ErrorCode::PaymentFailed),
            5010 => Ok(ErrorCode::PaymentFeeUnavailable),
            5101 => Ok(ErrorCode::PartnerNotFound),
            5102 => Ok(ErrorCode::CommissionNotFound),
            5103 => Ok(ErrorCode::CommissionNotPayable),

            // Ledger / Report
            6001 => Ok(ErrorCode::LedgerEntryExists),
            6101 => Ok(ErrorCode::ReportNotFound),
            6102 => Ok(ErrorCode::ReportAlreadyExists),
            6103 => Ok(ErrorCode::ReportAlreadyPublished),
            6104 => Ok(ErrorCode::InvalidReportPeriod),
            6201 => Ok(ErrorCode::TransactionNotFound),
            6202 => Ok(ErrorCode::CountersignatureNotRequired),
            6203 => Ok(ErrorCode::AlreadyCountersigned),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::ConfigError),
            9004 => Ok(ErrorCode::NetworkError),
            9005 => Ok(ErrorCode::TimeoutError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::StateConflict.code(), 9);
        assert_eq!(ErrorCode::NotAuthenticated.code(), 1001);
        assert_eq!(ErrorCode::AdminRequired.code(), 2003);
        assert_eq!(ErrorCode::FulfillmentNotRetryable.code(), 4103);
        assert_eq!(ErrorCode::CommissionNotPayable.code(), 5103);
        assert_eq!(ErrorCode::ReportAlreadyExists.code(), 6102);
        assert_eq!(ErrorCode::InternalError.code(), 9001);
    }

    #[test]
    fn test_try_from_valid() {
        assert_eq!(ErrorCode::try_from(0), Ok(ErrorCode::Success));
        assert_eq!(ErrorCode::try_from(4101), Ok(ErrorCode::FulfillmentNotFound));
        assert_eq!(ErrorCode::try_from(6203), Ok(ErrorCode::AlreadyCountersigned));
        assert_eq!(ErrorCode::try_from(9002), Ok(ErrorCode::DatabaseError));
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(999), Err(InvalidErrorCode(999)));
        assert_eq!(ErrorCode::try_from(3001), Err(InvalidErrorCode(3001)));
        assert_eq!(ErrorCode::try_from(10000), Err(InvalidErrorCode(10000)));
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_string(&ErrorCode::ReportNotFound).unwrap();
        assert_eq!(json, "6101");

        let code: ErrorCode = serde_json::from_str("4102").unwrap();
        assert_eq!(code, ErrorCode::FulfillmentInvalidTransition);

        let result: Result<ErrorCode, _> = serde_json::from_str("7001");
        assert!(result.is_err());
    }

    #[test]
    fn test_display_and_message() {
        assert_eq!(format!("{}", ErrorCode::OrderNotFound), "4001");
        assert_eq!(ErrorCode::OrderNotFound.message(), "Order not found");
        assert_eq!(
            format!("{}", InvalidErrorCode(999)),
            "invalid error code: 999"
        );
    }
}
