//! Error responses.
//!
//! Domain errors are mapped onto [`AppError`], which carries the HTTP
//! status and a machine-readable code.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use residia_core::billing::BillingError;
use residia_core::ledger::LedgerError;
use residia_core::store::StoreError;
use residia_shared::AppError;
use serde_json::json;
use tracing::error;

/// An [`AppError`] rendered as a JSON response.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = if status.is_server_error() {
            error!(error = %self.0, "Request failed");
            match self.0 {
                AppError::Unavailable(_) => "Service temporarily unavailable".to_string(),
                _ => "An error occurred".to_string(),
            }
        } else {
            self.0.to_string()
        };

        (
            status,
            Json(json!({
                "error": self.0.error_code(),
                "message": message
            })),
        )
            .into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        Self(error)
    }
}

fn store_error(error: &StoreError) -> AppError {
    match error {
        StoreError::Unavailable(_) => AppError::Unavailable(error.to_string()),
        StoreError::Query(_) | StoreError::Mapping(_) => AppError::Database(error.to_string()),
    }
}

impl From<BillingError> for ApiError {
    fn from(error: BillingError) -> Self {
        Self(match &error {
            BillingError::CommunityNotFound(_) | BillingError::UnitNotFound(_) => {
                AppError::NotFound(error.to_string())
            }
            BillingError::MalformedDate { .. }
            | BillingError::InvalidUnit { .. }
            | BillingError::ConfigurationMissing(_)
            | BillingError::HorizonInFuture { .. } => AppError::Validation(error.to_string()),
            BillingError::StoreUnavailable(_) | BillingError::PersistenceTimeout { .. } => {
                AppError::Unavailable(error.to_string())
            }
            BillingError::PersistenceFailure { source, .. } => store_error(source),
        })
    }
}

impl From<LedgerError> for ApiError {
    fn from(error: LedgerError) -> Self {
        Self(match &error {
            LedgerError::CommunityNotFound(_) => AppError::NotFound(error.to_string()),
            LedgerError::InvalidMonth(_) | LedgerError::RangeTooLarge { .. } => {
                AppError::Validation(error.to_string())
            }
            LedgerError::Store(source) => store_error(source),
        })
    }
}
