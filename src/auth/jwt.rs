use axum::{
    extract::FromRef,
    http::{header, HeaderMap, HeaderValue},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{auth::claims::SessionClaims, config::SessionConfig, state::AppState};

/// Signs and verifies the session cookie, and renders its `Set-Cookie` header.
#[derive(Clone)]
pub struct SessionKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub cookie_name: String,
    pub ttl: TimeDuration,
    pub secure: bool,
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        let SessionConfig {
            secret,
            issuer,
            cookie_name,
            ttl_hours,
            cookie_secure,
        } = state.config.session.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            cookie_name,
            ttl: TimeDuration::hours(ttl_hours),
            secure: cookie_secure,
        }
    }
}

impl SessionKeys {
    pub fn sign(&self, sid: Uuid, expires_at: OffsetDateTime) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let claims = SessionClaims {
            sid,
            iat: now.unix_timestamp() as usize,
            exp: expires_at.unix_timestamp() as usize,
            iss: self.issuer.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(session_id = %sid, "session cookie signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<SessionClaims> {
        let mut validation = Validation::default();
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation.set_required_spec_claims(&["exp", "iss"]);
        validation.leeway = 0;
        let data = decode::<SessionClaims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }

    /// Raw cookie value for this app, if the request carries one.
    pub fn read_cookie<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|raw| raw.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .map(|(_, value)| value)
    }

    pub fn session_cookie(&self, token: &str) -> anyhow::Result<HeaderValue> {
        self.build_cookie(token, self.ttl.whole_seconds())
    }

    pub fn clear_cookie(&self) -> anyhow::Result<HeaderValue> {
        self.build_cookie("", 0)
    }

    fn build_cookie(&self, value: &str, max_age: i64) -> anyhow::Result<HeaderValue> {
        let mut parts = vec![
            format!("{}={}", self.cookie_name, value),
            "Path=/".to_string(),
            "HttpOnly".to_string(),
            "SameSite=Lax".to_string(),
            format!("Max-Age={}", max_age),
        ];
        if self.secure {
            parts.push("Secure".to_string());
        }
        Ok(HeaderValue::from_str(&parts.join("; "))?)
    }
}
