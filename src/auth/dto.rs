use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo_types::Session;

/// Body of `POST /register` (urlencoded form).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// Body of `POST /login` (urlencoded form).
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// View model for the register/login pages.
#[derive(Debug, Serialize)]
pub struct AuthPage {
    pub title: &'static str,
    pub page_class: &'static str,
    pub error: Option<String>,
}

impl AuthPage {
    pub fn register(error: Option<String>) -> Self {
        Self {
            title: "Join SkillSaarthi",
            page_class: "page-auth",
            error,
        }
    }

    pub fn login(error: Option<String>) -> Self {
        Self {
            title: "Log in | SkillSaarthi",
            page_class: "page-auth",
            error,
        }
    }
}

/// Public part of the session user exposed to views.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub tokens: i64,
}

impl From<&Session> for CurrentUser {
    fn from(s: &Session) -> Self {
        Self {
            id: s.user_id,
            name: s.name.clone(),
            email: s.email.clone(),
            tokens: s.cached_token_balance,
        }
    }
}
