use crate::auth::memory::{MemorySessionStore, MemoryUserStore};
use crate::auth::repo::{PgSessionStore, PgUserStore, SessionStore, UserStore};
use crate::catalog::{Catalog, PgCatalog, StaticCatalog};
use crate::config::{AppConfig, StorageBackend};
use crate::requests::memory::MemoryRequestStore;
use crate::requests::repo::{PgRequestStore, RequestStore};
use anyhow::Context;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub requests: Arc<dyn RequestStore>,
    pub catalog: Arc<dyn Catalog>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        match config.storage {
            StorageBackend::Memory => {
                tracing::warn!("STORAGE_BACKEND=memory: all data is lost on restart");
                Ok(Self::in_memory(config))
            }
            StorageBackend::Postgres => {
                let url = config
                    .database_url
                    .clone()
                    .context("DATABASE_URL is required")?;
                let db = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(10)
                    .connect(&url)
                    .await
                    .context("connect to database")?;

                if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
                    tracing::error!(error = %e, "database migration failed");
                    return Err(e).context("run migrations");
                }

                Ok(Self::from_pool(db, config))
            }
        }
    }

    pub fn from_pool(db: PgPool, config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
            users: Arc::new(PgUserStore::new(db.clone())),
            sessions: Arc::new(PgSessionStore::new(db.clone())),
            requests: Arc::new(PgRequestStore::new(db.clone())),
            catalog: Arc::new(PgCatalog::new(db)),
        }
    }

    /// Every store in process memory; used for the demo backend and in tests.
    pub fn in_memory(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
            users: Arc::new(MemoryUserStore::default()),
            sessions: Arc::new(MemorySessionStore::default()),
            requests: Arc::new(MemoryRequestStore::default()),
            catalog: Arc::new(StaticCatalog::default()),
        }
    }

    #[cfg(test)]
    pub fn with_users(mut self, users: Arc<dyn UserStore>) -> Self {
        self.users = users;
        self
    }
}
