use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::domain::aggregates::{CartError, QuoteError};
use crate::domain::pricing::RuleSetError;
use crate::CommerceError;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Unprocessable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::Internal(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        (status, Json(json!({ "error": error_message }))).into_response()
    }
}

impl From<CommerceError> for ApiError {
    fn from(err: CommerceError) -> Self {
        let msg = err.to_string();
        match err {
            CommerceError::QuoteNotFound(_) => Self::NotFound(msg),
            CommerceError::Forbidden(_) => Self::Forbidden(msg),
            CommerceError::Conflict(_) => Self::Conflict(msg),
            CommerceError::Quote(QuoteError::DiscountCapExceeded { .. }) => Self::Unprocessable(msg),
            CommerceError::Quote(QuoteError::InvalidTransition { .. }) => Self::Conflict(msg),
            CommerceError::Quote(QuoteError::ItemNotFound(_)) => Self::NotFound(msg),
            CommerceError::Quote(_) => Self::BadRequest(msg),
            CommerceError::Cart(CartError::CheckoutNotAllowed(_)) => Self::Forbidden(msg),
            CommerceError::Cart(CartError::BelowMinimumOrder { .. }) => Self::Unprocessable(msg),
            CommerceError::Cart(_) => Self::BadRequest(msg),
            CommerceError::RuleSet(RuleSetError::VersionConflict { .. }) => Self::Conflict(msg),
            CommerceError::RuleSet(_) => Self::BadRequest(msg),
            CommerceError::Storage(_) => Self::Internal(msg),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::BadRequest(err.to_string())
    }
}
