pub mod auth;
pub mod cashiers;
pub mod categories;
pub mod products;
pub mod profile;
pub mod transactions;

use aide::axum::ApiRouter;
use aide::OperationOutput;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use rand::Rng;
use schemars::JsonSchema;
use serde::Serialize;

use crate::database::AppState;
use crate::env;
use crate::error::{ServiceError, ServiceResult};

pub fn router(app_state: AppState) -> ApiRouter {
    ApiRouter::new()
        .merge(auth::router(app_state.clone()))
        .merge(cashiers::router(app_state.clone()))
        .merge(categories::router(app_state.clone()))
        .merge(products::router(app_state.clone()))
        .merge(profile::router(app_state.clone()))
        .merge(transactions::router(app_state))
}

/// Response body for endpoints that only report an outcome.
#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct MessageDto {
    pub message: String,
}

/// Json response with status `201 Created`.
#[derive(Debug, PartialEq)]
pub struct Created<T>(pub T);

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::CREATED, Json(self.0)).into_response()
    }
}

impl<T: JsonSchema + Serialize> OperationOutput for Created<T> {
    type Inner = T;
}

pub fn password_hash(password: &str) -> Vec<u8> {
    argon2rs::argon2i_simple(password, env::PASSWORD_SALT.as_str()).to_vec()
}

pub fn password_hash_verify(hash: &[u8], password: &str) -> ServiceResult<bool> {
    Ok(hash == password_hash(password).as_slice())
}

/// 6-digit one-time code for the mail verification flows.
pub fn generate_otp() -> i32 {
    rand::thread_rng().gen_range(100_000..1_000_000)
}

pub fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };

    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

pub fn validate_email(email: &str) -> ServiceResult<()> {
    if is_email(email) {
        Ok(())
    } else {
        Err(ServiceError::BadRequest("Invalid email".to_string()))
    }
}

/// Password policy for new and reset passwords.
pub fn validate_password(password: &str) -> ServiceResult<()> {
    if password.chars().count() < 6 {
        return Err(ServiceError::BadRequest(
            "Password must contain 6 or more characters.".to_string(),
        ));
    }

    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(ServiceError::BadRequest(
            "Password must contain at least 1 upper case letter.".to_string(),
        ));
    }

    if !password.chars().any(|c| !c.is_alphanumeric()) {
        return Err(ServiceError::BadRequest(
            "Password must contain at least 1 special character.".to_string(),
        ));
    }

    Ok(())
}

/// Split a context-prefixed external id like `rp-<uuid>` into its context
/// marker and the uuid itself. The uuid part may contain further dashes.
pub fn split_prefixed_uuid(value: &str) -> ServiceResult<(&str, &str)> {
    value
        .split_once('-')
        .ok_or_else(|| ServiceError::BadRequest("Invalid credentials".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_is_six_digits() {
        for _ in 0..100 {
            let otp = generate_otp();
            assert!((100_000..1_000_000).contains(&otp));
        }
    }

    #[test]
    fn email_detection() {
        assert!(is_email("john.doe@example.org"));
        assert!(is_email("a@b.co"));

        assert!(!is_email("johndoe"));
        assert!(!is_email("@example.org"));
        assert!(!is_email("john@org"));
        assert!(!is_email("john@.org"));
    }

    #[test]
    fn password_policy() {
        assert!(validate_password("Secret!").is_ok());

        // too short
        assert!(validate_password("S!ab").is_err());
        // no upper case
        assert!(validate_password("secret!").is_err());
        // no special character
        assert!(validate_password("Secret1").is_err());
    }

    #[test]
    fn prefixed_uuid_splitting() {
        assert_eq!(
            split_prefixed_uuid("rp-123e4567-e89b").unwrap(),
            ("rp", "123e4567-e89b")
        );
        assert!(split_prefixed_uuid("plain").is_err());
    }
}
