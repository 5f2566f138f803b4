use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::{
    repo::{CreateUserError, SessionStore, UserStore},
    repo_types::{NewUser, Session, User},
};

/// In-process user store for `STORAGE_BACKEND=memory` and tests.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn create(&self, new: NewUser) -> Result<User, CreateUserError> {
        // Uniqueness check and insert under one write lock.
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == new.email) {
            return Err(CreateUserError::EmailTaken);
        }
        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            token_balance: new.token_balance,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[cfg(test)]
impl MemoryUserStore {
    /// Test hook standing in for a future ledger write.
    pub async fn set_balance(&self, id: Uuid, balance: i64) {
        if let Some(u) = self.users.write().await.get_mut(&id) {
            u.token_balance = balance;
        }
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, session: &Session) -> anyhow::Result<()> {
        self.sessions
            .write()
            .await
            .insert(session.id, session.clone());
        Ok(())
    }

    async fn find_active(&self, id: Uuid) -> anyhow::Result<Option<Session>> {
        let now = OffsetDateTime::now_utc();
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&id).filter(|s| !s.is_expired(now)).cloned())
    }

    async fn update_balance(&self, id: Uuid, balance: i64) -> anyhow::Result<()> {
        if let Some(s) = self.sessions.write().await.get_mut(&id) {
            s.cached_token_balance = balance;
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        self.sessions.write().await.remove(&id);
        Ok(())
    }

    async fn purge_expired(&self) -> anyhow::Result<u64> {
        let now = OffsetDateTime::now_utc();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        Ok((before - sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Asha".into(),
            email: email.into(),
            password_hash: "hash".into(),
            token_balance: 120,
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicate_email() {
        let store = MemoryUserStore::default();
        store.create(new_user("a@b.co")).await.expect("first insert");
        let err = store.create(new_user("a@b.co")).await.unwrap_err();
        assert!(matches!(err, CreateUserError::EmailTaken));
    }

    #[tokio::test]
    async fn expired_sessions_are_invisible_and_purged() {
        let users = MemoryUserStore::default();
        let user = users.create(new_user("s@b.co")).await.unwrap();
        let store = MemorySessionStore::default();

        let live = Session::for_user(&user, time::Duration::hours(24)).unwrap();
        let mut stale = Session::for_user(&user, time::Duration::hours(24)).unwrap();
        stale.expires_at = OffsetDateTime::now_utc() - time::Duration::seconds(1);
        store.insert(&live).await.unwrap();
        store.insert(&stale).await.unwrap();

        assert!(store.find_active(live.id).await.unwrap().is_some());
        assert!(store.find_active(stale.id).await.unwrap().is_none());
        assert_eq!(store.purge_expired().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn session_expiry_overflow_is_an_error() {
        let users = MemoryUserStore::default();
        let user = users.create(new_user("o@b.co")).await.unwrap();
        assert!(Session::for_user(&user, time::Duration::MAX).is_err());
        let s = Session::for_user(&user, time::Duration::hours(8760)).unwrap();
        assert!(s.expires_at > s.created_at);
    }
}
