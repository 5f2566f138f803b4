use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String, // stored trimmed + lowercased
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, not exposed in JSON
    pub token_balance: i64,
    pub created_at: OffsetDateTime,
}

/// Fields needed to insert a user; id and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub token_balance: i64,
}

/// Server-side session. `cached_token_balance` is a snapshot taken at login
/// and refreshed by protected views.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub cached_token_balance: i64,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl Session {
    /// Errors when `ttl` pushes the expiry past the representable date range.
    pub fn for_user(user: &User, ttl: time::Duration) -> anyhow::Result<Self> {
        let now = OffsetDateTime::now_utc();
        let expires_at = now
            .checked_add(ttl)
            .ok_or_else(|| anyhow::anyhow!("session ttl {ttl} overflows the expiry timestamp"))?;
        Ok(Self {
            id: Uuid::new_v4(),
            user_id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            cached_token_balance: user.token_balance,
            created_at: now,
            expires_at,
        })
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }
}
