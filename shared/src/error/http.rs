//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound
            | Self::OrderNotFound
            | Self::FulfillmentNotFound
            | Self::ProducerNotFound
            | Self::PartnerNotFound
            | Self::CommissionNotFound
            | Self::ReportNotFound
            | Self::TransactionNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::AlreadyExists
            | Self::StateConflict
            | Self::OrderNotPayable
            | Self::FulfillmentInvalidTransition
            | Self::FulfillmentNotRetryable
            | Self::CommissionNotPayable
            | Self::LedgerEntryExists
            | Self::ReportAlreadyExists
            | Self::ReportAlreadyPublished
            | Self::CountersignatureNotRequired
            | Self::AlreadyCountersigned => StatusCode::CONFLICT,

            // 401 Unauthorized
            Self::NotAuthenticated
            | Self::TokenExpired
            | Self::TokenInvalid
            | Self::WebhookSignatureInvalid
            | Self::CronTokenInvalid => StatusCode::UNAUTHORIZED,

            // 403 Forbidden
            Self::PermissionDenied | Self::AdminRequired | Self::CountersignerIsCreator => {
                StatusCode::FORBIDDEN
            }

            // 502 Bad Gateway (upstream gateway misbehaved)
            Self::PaymentFailed | Self::PaymentFeeUnavailable => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable (transient errors, client can retry)
            Self::NetworkError | Self::TimeoutError => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            Self::Unknown | Self::InternalError | Self::DatabaseError | Self::ConfigError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            // 400 Bad Request (validation)
            Self::ValidationFailed
            | Self::InvalidRequest
            | Self::InvalidFormat
            | Self::RequiredField
            | Self::ValueOutOfRange
            | Self::OrderEmpty
            | Self::InvalidReportPeriod => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_status() {
        assert_eq!(ErrorCode::NotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::FulfillmentNotFound.http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ErrorCode::ReportNotFound.http_status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_conflict_status() {
        assert_eq!(
            ErrorCode::ReportAlreadyExists.http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ErrorCode::ReportAlreadyPublished.http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ErrorCode::FulfillmentNotRetryable.http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ErrorCode::AlreadyCountersigned.http_status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_auth_status() {
        assert_eq!(
            ErrorCode::NotAuthenticated.http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ErrorCode::WebhookSignatureInvalid.http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ErrorCode::AdminRequired.http_status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ErrorCode::CountersignerIsCreator.http_status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_bad_request_and_system_status() {
        assert_eq!(
            ErrorCode::ValidationFailed.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::InvalidReportPeriod.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::DatabaseError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorCode::PaymentFeeUnavailable.http_status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
