use axum::{
    extract::{FromRef, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use tracing::{debug, error, instrument};

use crate::{
    auth::{
        dto::{AuthPage, LoginForm, RegisterForm},
        extractors::MaybeSession,
        jwt::SessionKeys,
        services::{self, CredentialError, IssuedSession},
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", get(register_page).post(register))
        .route("/login", get(login_page).post(login))
        .route("/logout", post(logout))
}

#[instrument(skip_all)]
pub async fn register_page(MaybeSession(session): MaybeSession) -> Response {
    if session.is_some() {
        return Redirect::to("/dashboard").into_response();
    }
    Json(AuthPage::register(None)).into_response()
}

#[instrument(skip_all)]
pub async fn login_page(MaybeSession(session): MaybeSession) -> Response {
    if session.is_some() {
        return Redirect::to("/dashboard").into_response();
    }
    Json(AuthPage::login(None)).into_response()
}

#[instrument(skip(state, form))]
pub async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> Response {
    match services::register(&state, form).await {
        Ok(issued) => signed_in(&state, issued, AuthPage::register),
        Err(e) => form_error(e, AuthPage::register),
    }
}

#[instrument(skip(state, form))]
pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    match services::login(&state, form).await {
        Ok(issued) => signed_in(&state, issued, AuthPage::login),
        Err(e) => form_error(e, AuthPage::login),
    }
}

#[instrument(skip(state, headers))]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(e) = services::logout(&state, &headers).await {
        // The cookie is cleared regardless; the row expires on its own.
        error!(error = ?e, "session destroy failed");
    }
    let keys = SessionKeys::from_ref(&state);
    let mut res = Redirect::to("/").into_response();
    match keys.clear_cookie() {
        Ok(cookie) => {
            res.headers_mut().insert(header::SET_COOKIE, cookie);
            res
        }
        Err(e) => AppError::Internal(e).into_response(),
    }
}

/// 303 to the dashboard with the session cookie; on failure the form that
/// started the flow is shown again.
fn signed_in(
    state: &AppState,
    issued: IssuedSession,
    page: fn(Option<String>) -> AuthPage,
) -> Response {
    let keys = SessionKeys::from_ref(state);
    match keys.session_cookie(&issued.token) {
        Ok(cookie) => {
            debug!(
                session_id = %issued.session.id,
                user_id = %issued.session.user_id,
                "session cookie issued"
            );
            let mut res = Redirect::to("/dashboard").into_response();
            res.headers_mut().insert(header::SET_COOKIE, cookie);
            res
        }
        Err(e) => form_error(CredentialError::Internal(e), page),
    }
}

/// Re-render the form with a human-readable message and a 4xx/5xx status.
fn form_error(e: CredentialError, page: fn(Option<String>) -> AuthPage) -> Response {
    let app_err = AppError::from(e);
    let status = app_err.status();
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(error = ?app_err, "credential flow failed");
    }
    (status, Json(page(Some(app_err.public_message())))).into_response()
}
