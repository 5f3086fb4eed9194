use std::ops::Add;

use aide::axum::routing::{get_with, patch_with};
use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::Path;
use axum::Json;
use chrono::{Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::AppState;
use crate::error::{ServiceError, ServiceResult};
use crate::request_state::RequestState;
use crate::{env, mail, models};

use super::auth::{UserDto, WithBearerToken};
use super::{
    generate_otp, password_hash, password_hash_verify, split_prefixed_uuid, validate_email,
    validate_password, MessageDto,
};

pub fn router(app_state: AppState) -> ApiRouter {
    ApiRouter::new()
        .api_route(
            "/cashiers",
            get_with(list_cashiers, list_cashiers_docs)
                .post_with(create_cashier, create_cashier_docs),
        )
        .api_route(
            "/cashiers/disabled",
            get_with(list_disabled_cashiers, list_disabled_cashiers_docs),
        )
        .api_route("/cashier/:uuid", get_with(get_cashier, get_cashier_docs))
        .api_route(
            "/cashier/:uuid/username",
            patch_with(change_username, change_username_docs),
        )
        .api_route(
            "/cashier/:uuid/verify-password-change",
            patch_with(verify_password_change, verify_password_change_docs),
        )
        .api_route(
            "/cashier/:uuid/password",
            patch_with(change_password, change_password_docs),
        )
        .api_route(
            "/cashier/:uuid/verify-email-change",
            patch_with(verify_email_change, verify_email_change_docs),
        )
        .api_route(
            "/cashier/:uuid/email",
            patch_with(change_email, change_email_docs),
        )
        .api_route(
            "/cashier/:uuid/disable",
            patch_with(disable_cashier, disable_cashier_docs),
        )
        .with_state(app_state)
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
pub struct CreateCashierDto {
    pub username: String,
    pub password: String,
    pub email: String,
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct CreatedCashierDto {
    pub message: String,
    pub user: UserDto,
}

async fn create_cashier(
    mut state: RequestState,
    form: Json<CreateCashierDto>,
) -> ServiceResult<WithBearerToken<CreatedCashierDto>> {
    state.session_require_admin()?;
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
        return Err(ServiceError::BadRequest(
            "Cashier already exists".to_string(),
        ));
    }

    let user = models::User {
        id: 0,
        uuid: Uuid::new_v4().to_string(),
        role: models::Role::Cashier,
        username: form.username,
        password_hash: password_hash(&form.password),
        email: form.email,
        is_disabled: false,
        otp: None,
    };
    let user = state.db.store_user(user).await?;

    let token = state
        .db
        .create_session_token(user.id, Utc::now().add(Duration::hours(24)))
        .await?;

    Ok(WithBearerToken {
        token,
        body: CreatedCashierDto {
            message: "Cashier created successfully".to_string(),
            user: UserDto::from(&user),
        },
    })
}

fn create_cashier_docs(op: TransformOperation) -> TransformOperation {
    op.description("Create a new cashier account.")
        .tag("cashiers")
        .response::<200, Json<CreatedCashierDto>>()
        .response_with::<400, (), _>(|res| res.description("The cashier already exists!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["admin"])
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CashierListData {
    pub total_cashiers: u64,
    pub cashiers: Vec<UserDto>,
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct CashierListDto {
    pub r#type: String,
    pub message: String,
    pub data: CashierListData,
}

async fn list_cashiers(mut state: RequestState) -> ServiceResult<Json<CashierListDto>> {
    state.session_require_admin()?;

    let cashiers = state.db.get_cashiers(false).await?;

    Ok(Json(CashierListDto {
        r#type: "success".to_string(),
        message: "All Data Cashiers Fetched".to_string(),
        data: CashierListData {
            total_cashiers: cashiers.len() as u64,
            cashiers: cashiers.iter().map(|c| c.into()).collect(),
        },
    }))
}

fn list_cashiers_docs(op: TransformOperation) -> TransformOperation {
    op.description("List all active cashiers.")
        .tag("cashiers")
        .response::<200, Json<CashierListDto>>()
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["admin"])
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisabledCashierListData {
    pub total_disabled_cashiers: u64,
    pub disabled_cashiers: Vec<UserDto>,
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct DisabledCashierListDto {
    pub r#type: String,
    pub message: String,
    pub data: DisabledCashierListData,
}

async fn list_disabled_cashiers(
    mut state: RequestState,
) -> ServiceResult<Json<DisabledCashierListDto>> {
    state.session_require_admin()?;

    let cashiers = state.db.get_cashiers(true).await?;

    Ok(Json(DisabledCashierListDto {
        r#type: "success".to_string(),
        message: "All Disabled Cashiers Fetched".to_string(),
        data: DisabledCashierListData {
            total_disabled_cashiers: cashiers.len() as u64,
            disabled_cashiers: cashiers.iter().map(|c| c.into()).collect(),
        },
    }))
}

fn list_disabled_cashiers_docs(op: TransformOperation) -> TransformOperation {
    op.description("List all disabled cashiers.")
        .tag("cashiers")
        .response::<200, Json<DisabledCashierListDto>>()
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["admin"])
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct CashierDto {
    pub r#type: String,
    pub message: String,
    pub data: UserDto,
}

async fn get_cashier(
    mut state: RequestState,
    Path(uuid): Path<String>,
) -> ServiceResult<Json<CashierDto>> {
    state.session_require_admin()?;

    let Some(user) = state.db.get_user_by_uuid(&uuid).await? else {
        return Err(ServiceError::NotFound("User does not exist".to_string()));
    };

    if user.is_disabled {
        return Err(ServiceError::BadRequest("Cashier is disabled".to_string()));
    }

    Ok(Json(CashierDto {
        r#type: "success".to_string(),
        message: "Cashier fetched".to_string(),
        data: UserDto::from(&user),
    }))
}

fn get_cashier_docs(op: TransformOperation) -> TransformOperation {
    op.description("Get a cashier by its external id.")
        .tag("cashiers")
        .response::<200, Json<CashierDto>>()
        .response_with::<404, (), _>(|res| res.description("The requested cashier does not exist!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["admin"])
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
pub struct ChangeUsernameDto {
    pub username: String,
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct UpdatedCashierDto {
    pub message: String,
    pub user: UserDto,
}

async fn change_username(
    mut state: RequestState,
    Path(uuid): Path<String>,
    form: Json<ChangeUsernameDto>,
) -> ServiceResult<Json<UpdatedCashierDto>> {
    state.session_require_admin()?;
    let form = form.0;

    if form.username.chars().count() < 5 {
        return Err(ServiceError::BadRequest(
            "Username minimum 5 characters".to_string(),
        ));
    }

    if state
        .db
        .get_user_by_username(&form.username)
        .await?
        .is_some()
    {
        return Err(ServiceError::BadRequest(
            "Username already exists".to_string(),
        ));
    }

    let Some(mut user) = state.db.get_user_by_uuid(&uuid).await? else {
        return Err(ServiceError::NotFound("User does not exist".to_string()));
    };

    user.username = form.username;
    let user = state.db.store_user(user).await?;

    Ok(Json(UpdatedCashierDto {
        message: "You have changed the Cashier's username successfully!".to_string(),
        user: UserDto::from(&user),
    }))
}

fn change_username_docs(op: TransformOperation) -> TransformOperation {
    op.description("Change a cashier's username.")
        .tag("cashiers")
        .response::<200, Json<UpdatedCashierDto>>()
        .response_with::<400, (), _>(|res| res.description("The username is already taken!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["admin"])
}

async fn verify_password_change(
    mut state: RequestState,
    Path(uuid): Path<String>,
) -> ServiceResult<Json<MessageDto>> {
    let session = state.session_require_admin()?;

    let otp = models::Otp {
        code: generate_otp(),
        valid_until: Utc::now().add(Duration::days(1)),
    };

    let mut admin = session.user;
    admin.otp = Some(otp);
    let admin = state.db.store_user(admin).await?;

    let link = format!(
        "{}/admin/cashiers/{}/change-password/cp-{}",
        env::BASE_URL.as_str(),
        uuid,
        admin.uuid
    );
    mail::send_cashier_password_change_mail(&admin, otp.code, &link).await?;

    Ok(Json(MessageDto {
        message: "Check your email to get the OTP & change password link.".to_string(),
    }))
}

fn verify_password_change_docs(op: TransformOperation) -> TransformOperation {
    op.description("Request an OTP that authorizes changing a cashier's password.")
        .tag("cashiers")
        .response::<200, Json<MessageDto>>()
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["admin"])
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordDto {
    /// Context-prefixed admin id from the change link, eg `cp-<uuid>`.
    pub uuid: String,
    /// The one-time code from the verification mail.
    pub token: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct ChangedPasswordDto {
    pub message: String,
    pub cashier: UserDto,
}

async fn change_password(
    mut state: RequestState,
    Path(cashier_uuid): Path<String>,
    form: Json<ChangePasswordDto>,
) -> ServiceResult<Json<ChangedPasswordDto>> {
    state.session_require_admin()?;
    let form = form.0;

    let (context, admin_uuid) = split_prefixed_uuid(&form.uuid)?;
    if context != "cp" {
        return Err(ServiceError::BadRequest("Invalid credentials".to_string()));
    }

    let Some(mut admin) = state.db.get_user_by_uuid(admin_uuid).await? else {
        return Err(ServiceError::BadRequest("User does not exist".to_string()));
    };

    let Some(otp) = admin.otp else {
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

    let Some(mut cashier) = state.db.get_user_by_uuid(&cashier_uuid).await? else {
        return Err(ServiceError::NotFound("Cashier does not exist".to_string()));
    };

    cashier.password_hash = password_hash(&form.new_password);
    cashier.otp = None;
    let cashier = state.db.store_user(cashier).await?;

    admin.otp = None;
    state.db.store_user(admin).await?;

    Ok(Json(ChangedPasswordDto {
        message: "You have changed Cashier's password successfully!".to_string(),
        cashier: UserDto::from(&cashier),
    }))
}

fn change_password_docs(op: TransformOperation) -> TransformOperation {
    op.description("Change a cashier's password with the code from the verification mail.")
        .tag("cashiers")
        .response::<200, Json<ChangedPasswordDto>>()
        .response_with::<400, (), _>(|res| res.description("Invalid verification code!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["admin"])
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
pub struct VerifyEmailChangeDto {
    pub password: String,
}

async fn verify_email_change(
    mut state: RequestState,
    Path(_uuid): Path<String>,
    form: Json<VerifyEmailChangeDto>,
) -> ServiceResult<Json<MessageDto>> {
    let session = state.session_require_admin()?;
    let form = form.0;

    if form.password.is_empty() {
        return Err(ServiceError::BadRequest("Password is required".to_string()));
    }

    if !password_hash_verify(&session.user.password_hash, &form.password)? {
        return Err(ServiceError::BadRequest("Invalid credentials".to_string()));
    }

    Ok(Json(MessageDto {
        message: "Verify Success! You can now change the Cashier's email.".to_string(),
    }))
}

fn verify_email_change_docs(op: TransformOperation) -> TransformOperation {
    op.description("Re-check the admin password before changing a cashier's email.")
        .tag("cashiers")
        .response::<200, Json<MessageDto>>()
        .response_with::<400, (), _>(|res| res.description("Invalid credentials!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["admin"])
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEmailDto {
    pub new_email: String,
}

async fn change_email(
    mut state: RequestState,
    Path(uuid): Path<String>,
    form: Json<ChangeEmailDto>,
) -> ServiceResult<Json<ChangedEmailDto>> {
    state.session_require_admin()?;
    let form = form.0;

    validate_email(&form.new_email)?;

    let Some(mut cashier) = state.db.get_user_by_uuid(&uuid).await? else {
        return Err(ServiceError::NotFound("Cashier does not exist".to_string()));
    };

    cashier.email = form.new_email;
    let cashier = state.db.store_user(cashier).await?;

    Ok(Json(ChangedEmailDto {
        message: "You have changed Cashier's email successfully!".to_string(),
        cashier: UserDto::from(&cashier),
    }))
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct ChangedEmailDto {
    pub message: String,
    pub cashier: UserDto,
}

fn change_email_docs(op: TransformOperation) -> TransformOperation {
    op.description("Change a cashier's email address.")
        .tag("cashiers")
        .response::<200, Json<ChangedEmailDto>>()
        .response_with::<404, (), _>(|res| res.description("The requested cashier does not exist!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["admin"])
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct DisabledCashierDto {
    pub message: String,
    pub cashier: UserDto,
}

async fn disable_cashier(
    mut state: RequestState,
    Path(uuid): Path<String>,
) -> ServiceResult<Json<DisabledCashierDto>> {
    state.session_require_admin()?;

    let Some(mut cashier) = state.db.get_user_by_uuid(&uuid).await? else {
        return Err(ServiceError::NotFound("Cashier does not exist".to_string()));
    };

    cashier.is_disabled = true;
    let cashier = state.db.store_user(cashier).await?;

    Ok(Json(DisabledCashierDto {
        message: "The Cashier disabled successfully.".to_string(),
        cashier: UserDto::from(&cashier),
    }))
}

fn disable_cashier_docs(op: TransformOperation) -> TransformOperation {
    op.description("Disable a cashier. Cashiers are never hard-deleted.")
        .tag("cashiers")
        .response::<200, Json<DisabledCashierDto>>()
        .response_with::<404, (), _>(|res| res.description("The requested cashier does not exist!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["admin"])
}
