use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use crate::{
    auth::{repo_types::Session, services::current_session},
    error::AppError,
    state::AppState,
};

/// The caller's session, if any. Never rejects on a missing session.
pub struct MaybeSession(pub Option<Session>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = current_session(state, &parts.headers).await?;
        Ok(MaybeSession(session))
    }
}

/// Gate for protected views: without a session the request is redirected to
/// `/login` before the handler body runs.
pub struct RequireSession(pub Session);

#[async_trait]
impl FromRequestParts<AppState> for RequireSession {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match current_session(state, &parts.headers).await {
            Ok(Some(session)) => Ok(RequireSession(session)),
            Ok(None) => {
                debug!(path = %parts.uri.path(), "no session; redirecting to login");
                Err(Redirect::to("/login").into_response())
            }
            Err(e) => Err(AppError::Internal(e).into_response()),
        }
    }
}
