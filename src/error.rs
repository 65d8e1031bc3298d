//! Unified API error type.
//!
//! Every handler returns `Result<T, ApiError>`. Client mistakes map to 4xx
//! with their message; anything unexpected is logged and answered with a
//! generic 500.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;
use crate::domain::aggregates::{CategoryError, OrderError, ProductError};
use crate::repository::RepositoryError;
use crate::shipping::ShippingError;
use crate::variants::VariantError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(&'static str),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Product(#[from] ProductError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Category(#[from] CategoryError),

    #[error(transparent)]
    Variant(#[from] VariantError),

    #[error(transparent)]
    Shipping(#[from] ShippingError),

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Multipart(#[from] MultipartError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Validation(_) | Self::Product(_) | Self::Order(_) | Self::Category(_) => StatusCode::BAD_REQUEST,
            Self::Shipping(_) => StatusCode::BAD_REQUEST,
            Self::Variant(e) => match e {
                VariantError::TooManyCombinations { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Multipart(e) => e.status(),
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Auth(e) => match e {
                AuthError::MissingToken | AuthError::InvalidToken(_) | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::Forbidden => StatusCode::FORBIDDEN,
                AuthError::Signing(_) | AuthError::Hashing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Repository(e) => match e {
                RepositoryError::Duplicate(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "Server error".to_string()
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
            self.to_string()
        };
        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::PriceError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::from(AuthError::MissingToken).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::from(AuthError::Forbidden).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound("Order not found").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::from(ProductError::Price(PriceError::Negative)).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Internal("boom".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            ApiError::from(RepositoryError::Duplicate("email".into())).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_server_errors_are_masked() {
        let response = ApiError::Internal("db password leaked".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
