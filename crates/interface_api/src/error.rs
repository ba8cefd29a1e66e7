//! API error handling

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use domain_billing::BillingError;
use workflow_billing_period::WorkflowError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Billing(#[from] BillingError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ApiError {
    /// HTTP status and machine-readable kind
    pub fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Billing(err) => match err {
                BillingError::BillNotFound(_) => (StatusCode::NOT_FOUND, "bill_not_found"),
                BillingError::BillClosed(_) => (StatusCode::CONFLICT, "bill_closed"),
                BillingError::UnsupportedCurrency(_) => {
                    (StatusCode::BAD_REQUEST, "unsupported_currency")
                }
                BillingError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, "invalid_amount"),
                BillingError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
            },
            ApiError::Workflow(err) => match err {
                WorkflowError::NotFound(_) => (StatusCode::NOT_FOUND, "period_not_found"),
                WorkflowError::AlreadyRunning(_) => {
                    (StatusCode::CONFLICT, "period_already_running")
                }
                WorkflowError::Stopped(_) => (StatusCode::CONFLICT, "period_stopped"),
                WorkflowError::PeriodTooLong { .. } => (StatusCode::BAD_REQUEST, "period_too_long"),
            },
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_kind();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
