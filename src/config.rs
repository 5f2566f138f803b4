use anyhow::{bail, Context};

/// Placeholder secret shipped with local `.env` samples; never valid in production.
pub const DEV_SESSION_SECRET: &str = "skillsaarthi-dev-secret";

/// Accepted `SESSION_TTL_HOURS` range: one hour to one year.
pub const SESSION_TTL_HOURS_RANGE: std::ops::RangeInclusive<i64> = 1..=8760;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub cookie_name: String,
    pub ttl_hours: i64,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref() {
            None | Some("development") | Some("dev") => Environment::Development,
            Some("production") | Some("prod") => Environment::Production,
            Some(other) => bail!("unknown APP_ENV {other:?}"),
        };

        let storage = match lookup("STORAGE_BACKEND").as_deref() {
            None | Some("postgres") => StorageBackend::Postgres,
            Some("memory") => StorageBackend::Memory,
            Some(other) => bail!("unknown STORAGE_BACKEND {other:?}"),
        };

        let database_url = lookup("DATABASE_URL");
        if storage == StorageBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL is required when STORAGE_BACKEND=postgres");
        }
        if environment == Environment::Production && storage == StorageBackend::Memory {
            bail!("STORAGE_BACKEND=memory is not allowed in production");
        }

        let secret = lookup("SESSION_SECRET").context("SESSION_SECRET is required")?;
        if environment == Environment::Production
            && (secret == DEV_SESSION_SECRET || secret.len() < 32)
        {
            bail!("SESSION_SECRET must be a non-default value of at least 32 bytes in production");
        }

        let port = match lookup("APP_PORT") {
            Some(v) => v.parse::<u16>().with_context(|| format!("invalid APP_PORT {v:?}"))?,
            None => 3000,
        };

        let ttl_hours = match lookup("SESSION_TTL_HOURS") {
            Some(v) => {
                let h = v
                    .trim()
                    .parse::<i64>()
                    .with_context(|| format!("invalid SESSION_TTL_HOURS {v:?}"))?;
                if !SESSION_TTL_HOURS_RANGE.contains(&h) {
                    bail!(
                        "SESSION_TTL_HOURS must be between {} and {} hours, got {h}",
                        SESSION_TTL_HOURS_RANGE.start(),
                        SESSION_TTL_HOURS_RANGE.end()
                    );
                }
                h
            }
            None => 24,
        };

        let cookie_secure = lookup("COOKIE_SECURE")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(environment == Environment::Production);

        let session = SessionConfig {
            secret,
            issuer: lookup("SESSION_ISSUER").unwrap_or_else(|| "skillsaarthi".into()),
            cookie_name: lookup("SESSION_COOKIE_NAME")
                .unwrap_or_else(|| "skillsaarthi.sid".into()),
            ttl_hours,
            cookie_secure,
        };

        Ok(Self {
            environment,
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            storage,
            database_url,
            session,
        })
    }

    /// Configuration for unit tests: in-memory storage, insecure cookie.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            environment: Environment::Development,
            host: "127.0.0.1".into(),
            port: 0,
            storage: StorageBackend::Memory,
            database_url: None,
            session: SessionConfig {
                secret: "test-session-secret-test-session-secret".into(),
                issuer: "skillsaarthi-test".into(),
                cookie_name: "skillsaarthi.sid".into(),
                ttl_hours: 24,
                cookie_secure: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn development_defaults() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/skillsaarthi"),
            ("SESSION_SECRET", DEV_SESSION_SECRET),
        ]))
        .expect("config should load");

        assert_eq!(cfg.environment, Environment::Development);
        assert_eq!(cfg.storage, StorageBackend::Postgres);
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.session.ttl_hours, 24);
        assert_eq!(cfg.session.cookie_name, "skillsaarthi.sid");
        assert!(!cfg.session.cookie_secure);
    }

    #[test]
    fn postgres_requires_database_url() {
        let err = AppConfig::from_lookup(lookup_from(&[("SESSION_SECRET", "x")])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn memory_backend_needs_no_database_url() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("STORAGE_BACKEND", "memory"),
            ("SESSION_SECRET", "whatever"),
        ]))
        .expect("config should load");
        assert_eq!(cfg.storage, StorageBackend::Memory);
        assert!(cfg.database_url.is_none());
    }

    #[test]
    fn production_rejects_placeholder_secret() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("APP_ENV", "production"),
            ("DATABASE_URL", "postgres://db/prod"),
            ("SESSION_SECRET", DEV_SESSION_SECRET),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("SESSION_SECRET"));
    }

    #[test]
    fn production_defaults_to_secure_cookie() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("APP_ENV", "production"),
            ("DATABASE_URL", "postgres://db/prod"),
            ("SESSION_SECRET", "0123456789abcdef0123456789abcdef-prod"),
        ]))
        .expect("config should load");
        assert!(cfg.session.cookie_secure);
    }

    #[test]
    fn session_ttl_outside_one_hour_to_one_year_is_rejected() {
        for bad in ["0", "-5", "8761", "100000000", "soon"] {
            let err = AppConfig::from_lookup(lookup_from(&[
                ("STORAGE_BACKEND", "memory"),
                ("SESSION_SECRET", "whatever"),
                ("SESSION_TTL_HOURS", bad),
            ]))
            .unwrap_err();
            assert!(err.to_string().contains("SESSION_TTL_HOURS"), "{bad}");
        }

        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("STORAGE_BACKEND", "memory"),
            ("SESSION_SECRET", "whatever"),
            ("SESSION_TTL_HOURS", "8760"),
        ]))
        .expect("one year is allowed");
        assert_eq!(cfg.session.ttl_hours, 8760);
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err =
            AppConfig::from_lookup(lookup_from(&[("STORAGE_BACKEND", "memory")])).unwrap_err();
        assert!(err.to_string().contains("SESSION_SECRET"));
    }
}
