use anyhow::Context;
use axum::{extract::FromRef, http::HeaderMap};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::{
    auth::{
        dto::{LoginForm, RegisterForm},
        jwt::SessionKeys,
        password::{hash_password_blocking, verify_password_blocking},
        repo::CreateUserError,
        repo_types::{NewUser, Session},
    },
    error::{AppError, GENERIC_FAILURE},
    state::AppState,
    wallet::STARTING_TOKENS,
};

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Please fill in all fields.")]
    MissingFields,
    #[error("Please enter your email and password.")]
    MissingCredentials,
    #[error("Passwords do not match.")]
    PasswordMismatch,
    #[error("Please enter a valid email address.")]
    InvalidEmail,
    #[error("That email is already registered.")]
    EmailTaken,
    /// Unknown email and wrong password both end up here.
    #[error("Invalid email or password.")]
    InvalidCredentials,
    #[error("{}", GENERIC_FAILURE)]
    Internal(#[from] anyhow::Error),
}

impl From<CredentialError> for AppError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::Internal(inner) => AppError::Internal(inner),
            CredentialError::EmailTaken => AppError::State(e.to_string()),
            CredentialError::InvalidCredentials => AppError::Auth(e.to_string()),
            other => AppError::Validation(other.to_string()),
        }
    }
}

/// A session that has been stored, together with the signed cookie token for it.
#[derive(Debug)]
pub struct IssuedSession {
    pub session: Session,
    pub token: String,
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub async fn register(
    state: &AppState,
    form: RegisterForm,
) -> Result<IssuedSession, CredentialError> {
    let name = form.name.trim().to_string();
    let email = normalize_email(&form.email);

    if name.is_empty()
        || email.is_empty()
        || form.password.is_empty()
        || form.confirm_password.is_empty()
    {
        return Err(CredentialError::MissingFields);
    }
    if form.password != form.confirm_password {
        return Err(CredentialError::PasswordMismatch);
    }
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(CredentialError::InvalidEmail);
    }

    if state.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(CredentialError::EmailTaken);
    }

    let password_hash = hash_password_blocking(form.password).await?;
    let user = state
        .users
        .create(NewUser {
            name,
            email,
            password_hash,
            token_balance: STARTING_TOKENS,
        })
        .await
        .map_err(|e| match e {
            CreateUserError::EmailTaken => CredentialError::EmailTaken,
            CreateUserError::Other(inner) => CredentialError::Internal(inner),
        })?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(start_session(state, &user).await?)
}

pub async fn login(state: &AppState, form: LoginForm) -> Result<IssuedSession, CredentialError> {
    let email = normalize_email(&form.email);
    if email.is_empty() || form.password.is_empty() {
        return Err(CredentialError::MissingCredentials);
    }

    let user = state.users.find_by_email(&email).await?;
    let stored = user.as_ref().map(|u| u.password_hash.clone());
    let ok = verify_password_blocking(form.password, stored).await?;

    let user = match user {
        Some(u) if ok => u,
        Some(u) => {
            warn!(user_id = %u.id, "login invalid password");
            return Err(CredentialError::InvalidCredentials);
        }
        None => {
            warn!(email = %email, "login unknown email");
            return Err(CredentialError::InvalidCredentials);
        }
    };

    info!(user_id = %user.id, "user logged in");
    Ok(start_session(state, &user).await?)
}

async fn start_session(
    state: &AppState,
    user: &crate::auth::repo_types::User,
) -> anyhow::Result<IssuedSession> {
    let keys = SessionKeys::from_ref(state);

    let purged = state.sessions.purge_expired().await?;
    if purged > 0 {
        debug!(purged, "expired sessions purged");
    }

    let session = Session::for_user(user, keys.ttl)?;
    state.sessions.insert(&session).await?;
    let token = keys.sign(session.id, session.expires_at)?;
    Ok(IssuedSession { session, token })
}

/// Destroys the session named by the request cookie, if any. Always succeeds
/// for missing, tampered or already-destroyed sessions.
pub async fn logout(state: &AppState, headers: &HeaderMap) -> anyhow::Result<()> {
    let keys = SessionKeys::from_ref(state);
    let Some(raw) = keys.read_cookie(headers) else {
        return Ok(());
    };
    if let Ok(claims) = keys.verify(raw) {
        state
            .sessions
            .delete(claims.sid)
            .await
            .context("destroy session")?;
        info!(session_id = %claims.sid, "session destroyed");
    }
    Ok(())
}

/// Session named by the request cookie, if it is valid and unexpired.
pub async fn current_session(
    state: &AppState,
    headers: &HeaderMap,
) -> anyhow::Result<Option<Session>> {
    let keys = SessionKeys::from_ref(state);
    let Some(raw) = keys.read_cookie(headers) else {
        return Ok(None);
    };
    let claims = match keys.verify(raw) {
        Ok(c) => c,
        Err(e) => {
            debug!(error = %e, "ignoring invalid session cookie");
            return Ok(None);
        }
    };
    state.sessions.find_active(claims.sid).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::http::{header, HeaderValue};

    fn state() -> AppState {
        AppState::in_memory(AppConfig::for_tests())
    }

    fn register_form(email: &str, password: &str) -> RegisterForm {
        RegisterForm {
            name: "Asha Rao".into(),
            email: email.into(),
            password: password.into(),
            confirm_password: password.into(),
        }
    }

    fn cookie_headers(state: &AppState, token: &str) -> HeaderMap {
        let keys = SessionKeys::from_ref(state);
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("{}={}", keys.cookie_name, token)).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn register_then_login_yields_starting_balance() {
        let st = state();
        let reg = register(&st, register_form("asha@example.com", "pa55word")).await.unwrap();
        assert_eq!(reg.session.cached_token_balance, 120);

        let issued = login(
            &st,
            LoginForm {
                email: "asha@example.com".into(),
                password: "pa55word".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(issued.session.cached_token_balance, 120);
        assert_eq!(issued.session.email, "asha@example.com");
        assert_eq!(issued.session.name, "Asha Rao");
    }

    #[tokio::test]
    async fn register_rejects_missing_fields() {
        let st = state();
        let mut form = register_form("a@b.co", "pw");
        form.name = "   ".into();
        let err = register(&st, form).await.unwrap_err();
        assert!(matches!(err, CredentialError::MissingFields));
        assert_eq!(err.to_string(), "Please fill in all fields.");
    }

    #[tokio::test]
    async fn register_rejects_password_mismatch() {
        let st = state();
        let mut form = register_form("a@b.co", "pw-one");
        form.confirm_password = "pw-two".into();
        let err = register(&st, form).await.unwrap_err();
        assert!(matches!(err, CredentialError::PasswordMismatch));
    }

    #[tokio::test]
    async fn second_registration_with_same_email_is_taken_regardless_of_password() {
        let st = state();
        register(&st, register_form("dup@example.com", "first")).await.unwrap();
        let err = register(&st, register_form("dup@example.com", "second")).await.unwrap_err();
        assert!(matches!(err, CredentialError::EmailTaken));

        // case and whitespace do not make a new identity
        let err = register(&st, register_form("  DUP@Example.com ", "third")).await.unwrap_err();
        assert!(matches!(err, CredentialError::EmailTaken));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let st = state();
        register(&st, register_form("known@example.com", "right")).await.unwrap();

        let wrong_pw = login(
            &st,
            LoginForm {
                email: "known@example.com".into(),
                password: "wrong".into(),
            },
        )
        .await
        .unwrap_err();
        let unknown = login(
            &st,
            LoginForm {
                email: "nobody@example.com".into(),
                password: "right".into(),
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(wrong_pw, CredentialError::InvalidCredentials));
        assert!(matches!(unknown, CredentialError::InvalidCredentials));
        assert_eq!(wrong_pw.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn login_requires_both_fields() {
        let st = state();
        let err = login(
            &st,
            LoginForm {
                email: "".into(),
                password: "x".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CredentialError::MissingCredentials));
    }

    #[tokio::test]
    async fn current_session_follows_cookie_and_logout_is_idempotent() {
        let st = state();
        let issued = register(&st, register_form("s@example.com", "pw")).await.unwrap();
        let headers = cookie_headers(&st, &issued.token);

        let found = current_session(&st, &headers).await.unwrap().expect("session");
        assert_eq!(found.id, issued.session.id);

        logout(&st, &headers).await.unwrap();
        assert!(current_session(&st, &headers).await.unwrap().is_none());
        logout(&st, &headers).await.unwrap();
        logout(&st, &HeaderMap::new()).await.unwrap();
    }

    #[tokio::test]
    async fn tampered_cookie_is_no_session() {
        let st = state();
        let issued = register(&st, register_form("t@example.com", "pw")).await.unwrap();
        let mut token = issued.token.clone();
        token.push('x');
        let headers = cookie_headers(&st, &token);
        assert!(current_session(&st, &headers).await.unwrap().is_none());
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("a@b"));
    }
}
