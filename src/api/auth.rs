use std::ops::Add;

use aide::axum::routing::{delete_with, get_with, patch_with, post_with, put_with};
use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use aide::OperationOutput;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::AppState;
use crate::error::{ServiceError, ServiceResult};
use crate::request_state::RequestState;
use crate::{env, mail, models};

use super::{
    generate_otp, is_email, password_hash, password_hash_verify, split_prefixed_uuid,
    validate_email, validate_password, MessageDto,
};

pub fn router(app_state: AppState) -> ApiRouter {
    ApiRouter::new()
        .api_route("/auth/register", post_with(register, register_docs))
        .api_route("/auth/login", post_with(login, login_docs))
        .api_route("/auth/account", get_with(keep_login, keep_login_docs))
        .api_route(
            "/auth/forgot-password",
            put_with(forgot_password, forgot_password_docs),
        )
        .api_route(
            "/auth/reset-password",
            patch_with(reset_password, reset_password_docs),
        )
        .api_route("/auth", delete_with(logout, logout_docs))
        .with_state(app_state)
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RoleDto {
    Admin,
    Cashier,
}

impl From<models::Role> for RoleDto {
    fn from(value: models::Role) -> Self {
        match value {
            models::Role::Admin => RoleDto::Admin,
            models::Role::Cashier => RoleDto::Cashier,
        }
    }
}

/// Public projection of a user. Password hash and OTP state never leave the
/// server.
#[derive(Debug, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub user_id: u64,
    pub uuid: String,
    pub role: RoleDto,
    pub username: String,
    pub email: String,
    pub is_disabled: bool,
}

impl From<&models::User> for UserDto {
    fn from(value: &models::User) -> Self {
        Self {
            user_id: value.id.to_owned(),
            uuid: value.uuid.to_owned(),
            role: value.role.into(),
            username: value.username.to_owned(),
            email: value.email.to_owned(),
            is_disabled: value.is_disabled,
        }
    }
}

/// Json response that additionally carries the session token in the
/// `Authorization` header.
#[derive(Debug, PartialEq)]
pub struct WithBearerToken<T> {
    pub token: String,
    pub body: T,
}

impl<T: Serialize> IntoResponse for WithBearerToken<T> {
    fn into_response(self) -> axum::response::Response {
        let value = HeaderValue::from_str(format!("Bearer {}", self.token).as_str()).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, value);
        (StatusCode::OK, headers, Json(self.body)).into_response()
    }
}

impl<T: JsonSchema + Serialize> OperationOutput for WithBearerToken<T> {
    type Inner = T;
}

fn session_valid_until() -> chrono::DateTime<Utc> {
    Utc::now().add(Duration::hours(24))
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
pub struct RegisterDto {
    pub username: String,
    pub password: String,
    pub email: String,
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct RegisteredUserDto {
    pub message: String,
    pub user: UserDto,
}

async fn register(
    mut state: RequestState,
    form: Json<RegisterDto>,
) -> ServiceResult<WithBearerToken<RegisteredUserDto>> {
    let form = form.0;

    if form.username.trim().is_empty() {
        return Err(ServiceError::BadRequest("Username is required".to_string()));
    }
    if form.password.is_empty() {
        return Err(ServiceError::BadRequest("Password is required".to_string()));
    }
    validate_email(&form.email)?;

    let existing = state
        .db
        .get_user_by_username_and_email(&form.username, &form.email)
        .await?;
    if existing.is_some() {
        return Err(ServiceError::BadRequest("User already exists".to_string()));
    }

    let user = models::User {
        id: 0,
        uuid: Uuid::new_v4().to_string(),
        role: models::Role::Admin,
        username: form.username,
        password_hash: password_hash(&form.password),
        email: form.email,
        is_disabled: false,
        otp: None,
    };
    let user = state.db.store_user(user).await?;

    let token = state
        .db
        .create_session_token(user.id, session_valid_until())
        .await?;

    Ok(WithBearerToken {
        token,
        body: RegisteredUserDto {
            message: "Admin created successfully".to_string(),
            user: UserDto::from(&user),
        },
    })
}

fn register_docs(op: TransformOperation) -> TransformOperation {
    op.description("Register a new admin account.")
        .tag("auth")
        .response::<200, Json<RegisteredUserDto>>()
        .response_with::<400, (), _>(|res| res.description("The user already exists!"))
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
pub struct LoginDto {
    /// Username or email address.
    pub username: String,
    pub password: String,
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct AuthenticatedUserDto {
    pub user: UserDto,
}

async fn login(
    mut state: RequestState,
    form: Json<LoginDto>,
) -> ServiceResult<WithBearerToken<AuthenticatedUserDto>> {
    let form = form.0;

    if form.username.trim().is_empty() {
        return Err(ServiceError::BadRequest("Username is required".to_string()));
    }
    if form.password.is_empty() {
        return Err(ServiceError::BadRequest("Password is required".to_string()));
    }

    let user = if is_email(&form.username) {
        state.db.get_user_by_email(&form.username).await?
    } else {
        state.db.get_user_by_username(&form.username).await?
    };

    let Some(user) = user else {
        return Err(ServiceError::BadRequest("User does not exist".to_string()));
    };

    if user.is_disabled {
        return Err(ServiceError::BadRequest("Cashier is disabled".to_string()));
    }

    if !password_hash_verify(&user.password_hash, &form.password)? {
        return Err(ServiceError::BadRequest("Invalid credentials".to_string()));
    }

    let token = state
        .db
        .create_session_token(user.id, session_valid_until())
        .await?;

    Ok(WithBearerToken {
        token,
        body: AuthenticatedUserDto {
            user: UserDto::from(&user),
        },
    })
}

fn login_docs(op: TransformOperation) -> TransformOperation {
    op.description("Login with username or email and password.")
        .tag("auth")
        .response::<200, Json<AuthenticatedUserDto>>()
        .response_with::<400, (), _>(|res| res.description("Invalid username or password!"))
}

async fn keep_login(state: RequestState) -> ServiceResult<Json<AuthenticatedUserDto>> {
    let session = state.session_require()?;

    Ok(Json(AuthenticatedUserDto {
        user: UserDto::from(&session.user),
    }))
}

fn keep_login_docs(op: TransformOperation) -> TransformOperation {
    op.description("Get the account of the current session.")
        .tag("auth")
        .response::<200, Json<AuthenticatedUserDto>>()
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .security_requirement_scopes("SessionToken", ["admin", "cashier"])
}

async fn logout(mut state: RequestState) -> ServiceResult<StatusCode> {
    if let Some(session) = state.session {
        state.db.delete_session_token(session.token).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}

fn logout_docs(op: TransformOperation) -> TransformOperation {
    op.description("Logout the current session.")
        .tag("auth")
        .response_with::<204, (), _>(|res| res.description("Logout was successfull!"))
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
pub struct ForgotPasswordDto {
    pub email: String,
}

async fn forgot_password(
    mut state: RequestState,
    form: Json<ForgotPasswordDto>,
) -> ServiceResult<Json<MessageDto>> {
    let form = form.0;
    validate_email(&form.email)?;

    let Some(mut user) = state.db.get_user_by_email(&form.email).await? else {
        return Err(ServiceError::BadRequest("User does not exist".to_string()));
    };

    let otp = models::Otp {
        code: generate_otp(),
        valid_until: Utc::now().add(Duration::days(1)),
    };
    user.otp = Some(otp);
    let user = state.db.store_user(user).await?;

    let link = format!(
        "{}/reset-password/rp-{}",
        env::BASE_URL.as_str(),
        user.uuid
    );
    mail::send_password_reset_mail(&user, otp.code, &link).await?;

    Ok(Json(MessageDto {
        message: "Check your email to get your reset password link.".to_string(),
    }))
}

fn forgot_password_docs(op: TransformOperation) -> TransformOperation {
    op.description("Request a password reset code via email.")
        .tag("auth")
        .response::<200, Json<MessageDto>>()
        .response_with::<400, (), _>(|res| res.description("The user does not exist!"))
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordDto {
    /// Context-prefixed external id from the reset link, eg `rp-<uuid>`.
    pub uuid: String,
    /// The one-time code from the reset mail.
    pub token: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct PasswordResetDto {
    pub message: String,
    pub user: UserDto,
}

async fn reset_password(
    mut state: RequestState,
    form: Json<ResetPasswordDto>,
) -> ServiceResult<Json<PasswordResetDto>> {
    let form = form.0;

    let (context, uuid) = split_prefixed_uuid(&form.uuid)?;
    if context != "rp" {
        return Err(ServiceError::BadRequest("Invalid credentials".to_string()));
    }

    let Some(mut user) = state.db.get_user_by_uuid(uuid).await? else {
        return Err(ServiceError::BadRequest("User does not exist".to_string()));
    };

    let Some(otp) = user.otp else {
        return Err(ServiceError::BadRequest("Invalid credentials".to_string()));
    };
    if form.token.parse::<i32>().ok() != Some(otp.code) || otp.is_expired(Utc::now()) {
        return Err(ServiceError::BadRequest("Invalid credentials".to_string()));
    }

    validate_password(&form.new_password)?;
    if form.confirm_password != form.new_password {
        return Err(ServiceError::BadRequest(
            "Must match \"New Password\" field value".to_string(),
        ));
    }

    user.password_hash = password_hash(&form.new_password);
    user.otp = None;
    let user = state.db.store_user(user).await?;

    Ok(Json(PasswordResetDto {
        message: "You have reset your password successfully! Please login again!".to_string(),
        user: UserDto::from(&user),
    }))
}

fn reset_password_docs(op: TransformOperation) -> TransformOperation {
    op.description("Reset a password with the code from the reset mail.")
        .tag("auth")
        .response::<200, Json<PasswordResetDto>>()
        .response_with::<400, (), _>(|res| res.description("Invalid reset code!"))
}
