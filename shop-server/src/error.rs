//! Service-layer error type
//!
//! `ServiceError` bridges DB-layer errors (`sqlx::Error`, [`RepoError`]) and
//! the API-layer error (`AppError`) so services can use `?` on both.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

use crate::db::repository::RepoError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Service-layer error
///
/// - `Db`: Database/infrastructure errors (logged, mapped to InternalError)
/// - `App`: Business-rule errors (passed through to the client)
#[derive(Debug)]
pub enum ServiceError {
    Db(BoxError),
    App(AppError),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Db(e) => write!(f, "database error: {e}"),
            ServiceError::App(e) => write!(f, "{} ({})", e.message, e.code),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        ServiceError::Db(e.into())
    }
}

impl From<BoxError> for ServiceError {
    fn from(e: BoxError) -> Self {
        ServiceError::Db(e)
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

impl From<RepoError> for ServiceError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound(what) => ServiceError::App(AppError::not_found(what)),
            RepoError::Duplicate(what) => ServiceError::App(
                AppError::new(ErrorCode::AlreadyExists).with_detail("resource", what),
            ),
            RepoError::Validation(msg) => ServiceError::App(AppError::validation(msg)),
            RepoError::Database(msg) => ServiceError::Db(msg.into()),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Db(db_err) => {
                tracing::error!(error = %db_err, "Service database error");
                AppError::new(ErrorCode::InternalError)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

impl ServiceError {
    /// Business error code, if this is one
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ServiceError::App(e) => Some(e.code),
            ServiceError::Db(_) => None,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
