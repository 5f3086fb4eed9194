use aide::OperationInput;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    RequestPartsExt,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};

use crate::{
    database::{AppState, DatabaseConnection},
    error::{ServiceError, ServiceResult},
    models::{Role, Session},
};

/// Per-request context: a database connection and the session resolved from
/// the `Authorization` bearer header, if one was sent.
pub struct RequestState {
    pub db: DatabaseConnection,
    pub session: Option<Session>,
}

impl RequestState {
    pub fn session_require(&self) -> ServiceResult<Session> {
        self.session
            .clone()
            .ok_or(ServiceError::Unauthorized("Missing login!"))
    }

    pub fn session_require_admin(&self) -> ServiceResult<Session> {
        let session = self.session_require()?;

        if session.user.role != Role::Admin {
            return Err(ServiceError::Forbidden("Missing permissions!"));
        }

        Ok(session)
    }

    pub fn session_require_cashier(&self) -> ServiceResult<Session> {
        let session = self.session_require()?;

        if session.user.role != Role::Cashier {
            return Err(ServiceError::Forbidden("Missing permissions!"));
        }

        Ok(session)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestState
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        let connection = state
            .pool
            .acquire()
            .await
            .map_err(|err| ServiceError::InternalServerError(err.to_string()))?;
        let mut db = DatabaseConnection { connection };

        let session = if let Ok(TypedHeader(Authorization(bearer))) =
            parts.extract::<TypedHeader<Authorization<Bearer>>>().await
        {
            let session_token = bearer.token().to_owned();
            db.get_session_by_session_token(session_token).await?
        } else {
            None
        };

        if let Some(ref session) = session {
            log::debug!(
                "resolved session for user {} (valid until {})",
                session.user.id,
                session.valid_until
            );
        }

        Ok(Self { db, session })
    }
}

impl OperationInput for RequestState {}
