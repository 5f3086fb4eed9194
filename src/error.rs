use aide::OperationOutput;
use axum::{http::StatusCode, response::IntoResponse, Json};
use schemars::JsonSchema;
use serde_json::json;

use crate::checkout::CheckoutError;

/// Represent errors in the application
///
/// All `ServiceError`s can be transformed to http errors.
#[derive(Debug, Clone, JsonSchema)]
pub enum ServiceError {
    BadRequest(String),
    Unauthorized(&'static str),
    Forbidden(&'static str),
    NotFound(String),
    Conflict(String),
    InternalServerError(String),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::error::Error for ServiceError {}

/// Helper for `ServiceError` result
pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<sqlx::Error> for ServiceError {
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_error) = error {
            if db_error.is_unique_violation() {
                return ServiceError::Conflict(db_error.to_string());
            }
        }

        ServiceError::InternalServerError(error.to_string())
    }
}

impl From<CheckoutError> for ServiceError {
    fn from(error: CheckoutError) -> Self {
        match error {
            CheckoutError::EmptyCart => {
                ServiceError::BadRequest("Cart must contain at least one product.".to_string())
            }
            CheckoutError::NonPositiveQuantity { product_id } => ServiceError::BadRequest(format!(
                "Quantity for product {product_id} must be a positive integer."
            )),
            CheckoutError::UnknownProduct { product_id } => {
                ServiceError::NotFound(format!("Product with ID {product_id} not found."))
            }
        }
    }
}

impl OperationOutput for ServiceError {
    type Inner = String;
}
impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ServiceError::BadRequest(ref message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
            }
            ServiceError::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "error": message })))
            }
            ServiceError::Forbidden(message) => {
                (StatusCode::FORBIDDEN, Json(json!({ "error": message })))
            }
            ServiceError::NotFound(ref message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message })))
            }
            ServiceError::Conflict(ref message) => {
                (StatusCode::CONFLICT, Json(json!({ "error": message })))
            }
            ServiceError::InternalServerError(ref cause) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "cause": cause })),
            ),
        }
        .into_response()
    }
}
