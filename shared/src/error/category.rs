//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Authentication errors (1xxx)
    Auth,
    /// Permission errors (2xxx)
    Permission,
    /// Order and fulfillment errors (4xxx)
    Fulfillment,
    /// Payment and commission errors (5xxx)
    Payment,
    /// Ledger and report errors (6xxx)
    Ledger,
    /// System errors (9xxx and anything unassigned)
    System,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            1000..2000 => Self::Auth,
            2000..3000 => Self::Permission,
            4000..5000 => Self::Fulfillment,
            5000..6000 => Self::Payment,
            6000..7000 => Self::Ledger,
            _ => Self::System,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Auth => "auth",
            Self::Permission => "permission",
            Self::Fulfillment => "fulfillment",
            Self::Payment => "payment",
            Self::Ledger => "ledger",
            Self::System => "system",
        }
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_code() {
        assert_eq!(ErrorCategory::from_code(0), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(999), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(1010), ErrorCategory::Auth);
        assert_eq!(ErrorCategory::from_code(2010), ErrorCategory::Permission);
        assert_eq!(ErrorCategory::from_code(4102), ErrorCategory::Fulfillment);
        assert_eq!(ErrorCategory::from_code(5103), ErrorCategory::Payment);
        assert_eq!(ErrorCategory::from_code(6101), ErrorCategory::Ledger);
        assert_eq!(ErrorCategory::from_code(9001), ErrorCategory::System);
        assert_eq!(ErrorCategory::from_code(3001), ErrorCategory::System);
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(
            ErrorCode::FulfillmentNotRetryable.category(),
            ErrorCategory::Fulfillment
        );
        assert_eq!(ErrorCode::PartnerNotFound.category(), ErrorCategory::Payment);
        assert_eq!(ErrorCode::ReportAlreadyPublished.category(), ErrorCategory::Ledger);
        assert_eq!(ErrorCode::DatabaseError.category(), ErrorCategory::System);
    }

    #[test]
    fn test_category_serialize() {
        let json = serde_json::to_string(&ErrorCategory::Fulfillment).unwrap();
        assert_eq!(json, "\"fulfillment\"");
        assert_eq!(ErrorCategory::Ledger.name(), "ledger");
    }
}
