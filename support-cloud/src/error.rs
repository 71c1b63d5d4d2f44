//! Service-layer error type
//!
//! `ServiceError` carries either a storage failure (`BoxError`) or an
//! `AppError` meant for the client, so services can use `?` on both.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

use crate::store::BoxError;

#[derive(Debug)]
pub enum ServiceError {
    /// Database or infrastructure error; logged and hidden behind InternalError
    Db(BoxError),
    /// Business-rule error passed through to the client
    App(AppError),
}

impl ServiceError {
    /// Server-side failures are worth a provider retry; client errors are not.
    pub fn is_server_error(&self) -> bool {
        match self {
            ServiceError::Db(_) => true,
            ServiceError::App(e) => e.http_status().is_server_error(),
        }
    }
}

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

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Db(db_err) => {
                tracing::error!(error = %db_err, "Service database error");
                AppError::new(ErrorCode::DatabaseError)
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

pub type ServiceResult<T> = Result<T, ServiceError>;
