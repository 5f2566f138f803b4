use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, Session, User};

#[derive(Debug, thiserror::Error)]
pub enum CreateUserError {
    #[error("email already registered")]
    EmailTaken,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    /// Insert a user. Must fail with `EmailTaken` when the email already exists,
    /// even if a concurrent insert won the race after the caller's lookup.
    async fn create(&self, user: NewUser) -> Result<User, CreateUserError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: &Session) -> anyhow::Result<()>;
    /// Returns the session only while it has not expired.
    async fn find_active(&self, id: Uuid) -> anyhow::Result<Option<Session>>;
    async fn update_balance(&self, id: Uuid, balance: i64) -> anyhow::Result<()>;
    /// Idempotent.
    async fn delete(&self, id: Uuid) -> anyhow::Result<()>;
    /// Drop expired sessions, returning how many were removed.
    async fn purge_expired(&self) -> anyhow::Result<u64>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, token_balance, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, token_balance, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn create(&self, user: NewUser) -> Result<User, CreateUserError> {
        let res = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash, token_balance)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, password_hash, token_balance, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.token_balance)
        .fetch_one(&self.db)
        .await;

        match res {
            Ok(u) => Ok(u),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(CreateUserError::EmailTaken)
            }
            Err(e) => Err(CreateUserError::Other(anyhow::Error::new(e).context("insert user"))),
        }
    }
}

#[derive(Clone)]
pub struct PgSessionStore {
    db: PgPool,
}

impl PgSessionStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, s: &Session) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, name, email, cached_token_balance, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(s.id)
        .bind(s.user_id)
        .bind(&s.name)
        .bind(&s.email)
        .bind(s.cached_token_balance)
        .bind(s.created_at)
        .bind(s.expires_at)
        .execute(&self.db)
        .await
        .context("insert session")?;
        Ok(())
    }

    async fn find_active(&self, id: Uuid) -> anyhow::Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, user_id, name, email, cached_token_balance, created_at, expires_at
            FROM sessions
            WHERE id = $1 AND expires_at > now()
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find session")?;
        Ok(session)
    }

    async fn update_balance(&self, id: Uuid, balance: i64) -> anyhow::Result<()> {
        sqlx::query(r#"UPDATE sessions SET cached_token_balance = $2 WHERE id = $1"#)
            .bind(id)
            .bind(balance)
            .execute(&self.db)
            .await
            .context("update session balance")?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(r#"DELETE FROM sessions WHERE id = $1"#)
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete session")?;
        Ok(())
    }

    async fn purge_expired(&self) -> anyhow::Result<u64> {
        let res = sqlx::query(r#"DELETE FROM sessions WHERE expires_at <= now()"#)
            .execute(&self.db)
            .await
            .context("purge expired sessions")?;
        Ok(res.rows_affected())
    }
}
