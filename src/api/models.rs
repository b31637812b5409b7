//! Shared API response and error types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::domains::billing::models::BillingError;
use crate::domains::loyalty::models::LoyaltyError;

/// Error body used by the auth middleware.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// HTTP-facing error wrapper. Domain errors map here at the handler
/// boundary.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    Conflict(String),
    UnprocessableEntity(String),
    BadGateway(String),
    InternalError(String),
}

impl ApiError {
    /// Field-level validation failures from `validator` derives.
    pub fn from_validation(errors: validator::ValidationErrors) -> Self {
        Self::UnprocessableEntity(errors.to_string())
    }
}

impl From<LoyaltyError> for ApiError {
    fn from(err: LoyaltyError) -> Self {
        match err {
            LoyaltyError::TemplateNotFound
            | LoyaltyError::CardNotFound
            | LoyaltyError::CustomerNotFound => ApiError::NotFound(err.to_string()),
            LoyaltyError::DuplicateTemplateName
            | LoyaltyError::RewardOutOfRange { .. }
            | LoyaltyError::MissingValidityDays => ApiError::UnprocessableEntity(err.to_string()),
            LoyaltyError::Database(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::OrderNotFound
            | BillingError::PaymentNotFound
            | BillingError::PackageNotFound => ApiError::NotFound(err.to_string()),
            BillingError::AlreadyProcessed { .. } => ApiError::Conflict(err.to_string()),
            BillingError::UnsupportedProvider { .. } => ApiError::BadRequest(err.to_string()),
            BillingError::InvalidPaymentResponse => ApiError::BadGateway(err.to_string()),
            BillingError::InvalidAmount | BillingError::Database(_) => {
                ApiError::InternalError(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::UnprocessableEntity(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "success": false,
            "error": message,
        }));

        (status, body).into_response()
    }
}
