//! Error types for minikart-api
//!
//! Every failure leaves the service as `{"error": {"code", "message"}}`.
//! Messages never include file paths, source indices or match counts.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body is not valid JSON for the endpoint (400)
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    /// Required field absent or empty (400)
    #[error("Missing field: {0}")]
    MissingField(String),

    /// Item quantity not positive (400)
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Promo code outside the accepted length window (400)
    #[error("promo code length is invalid")]
    InvalidPromoLength,

    /// Promo code not found in enough coupon sources (400)
    #[error("promo code is invalid")]
    InvalidPromoCode,

    /// Promo code lookup timed out or was interrupted (503)
    #[error("promo code validation is temporarily unavailable")]
    PromoUnavailable,

    /// Order references products that do not exist (400)
    #[error("one or more products not found: {}", .0.join(", "))]
    UnknownProducts(Vec<String>),

    /// Product lookup by id found nothing (404)
    #[error("product not found: {0}")]
    ProductNotFound(String),

    /// Order lookup by id found nothing (404)
    #[error("order not found: {0}")]
    OrderNotFound(String),

    /// Malformed query parameter or path segment (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing or wrong API key (401)
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Database failure (500)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidJson(_)
            | ApiError::MissingField(_)
            | ApiError::InvalidQuantity(_)
            | ApiError::InvalidPromoLength
            | ApiError::InvalidPromoCode
            | ApiError::UnknownProducts(_)
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PromoUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::ProductNotFound(_) | ApiError::OrderNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::MissingField(_) => "MISSING_FIELD",
            ApiError::InvalidQuantity(_) => "INVALID_QUANTITY",
            ApiError::InvalidPromoLength => "INVALID_PROMO_LENGTH",
            ApiError::InvalidPromoCode => "INVALID_PROMO_CODE",
            ApiError::PromoUnavailable => "PROMO_VALIDATION_UNAVAILABLE",
            ApiError::UnknownProducts(_) | ApiError::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            ApiError::OrderNotFound(_) => "ORDER_NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Database(_) | ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            // Internal details stay in the log
            ApiError::Database(e) => {
                error!(error = %e, "Database error while handling request");
                "internal server error".to_string()
            }
            ApiError::Internal(msg) => {
                error!(error = %msg, "Internal error while handling request");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
