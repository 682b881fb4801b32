use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Secret shipped for local development only; `validate` rejects it in production.
pub const DEV_JWT_SECRET: &str = "mat_bit_key";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub mail: MailConfig,
    pub filter: FilterConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Error bodies carry driver details everywhere except production.
    pub fn exposes_error_details(&self) -> bool {
        !matches!(self, Environment::Production)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub uploads_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// Base URL used when building links to public images. Falls back to the request host.
    pub public_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub name: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// No host means notifications are logged instead of sent.
    pub host: Option<String>,
    pub port: u16,
    pub user: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub from: String,
    pub starttls: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub default_limit: u32,
    pub max_limit: u32,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set to a non-default value in production")]
    InsecureJwtSecret,

    #[error("JWT secret cannot be empty")]
    EmptyJwtSecret,

    #[error("DB_MAX_CONNECTIONS must be greater than zero")]
    InvalidPoolSize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup, so tests never touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").or_else(|| lookup("NODE_ENV")).as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_overrides(lookup)
    }

    fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(v) = lookup("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Some(v) = lookup("UPLOADS_DIR") {
            self.server.uploads_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("MAX_UPLOAD_BYTES") {
            self.server.max_upload_bytes = v.parse().unwrap_or(self.server.max_upload_bytes);
        }
        if let Some(v) = lookup("API_URL") {
            self.server.public_url = Some(v.trim_end_matches('/').to_string());
        }

        // Database overrides
        if let Some(v) = lookup("DB_HOST") {
            self.database.host = v;
        }
        if let Some(v) = lookup("DB_PORT") {
            self.database.port = v.parse().unwrap_or(self.database.port);
        }
        if let Some(v) = lookup("DB_USER") {
            self.database.user = v;
        }
        if let Some(v) = lookup("DB_PASSWORD") {
            self.database.password = v;
        }
        if let Some(v) = lookup("DB_NAME") {
            self.database.name = v;
        }
        if let Some(v) = lookup("DB_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Some(v) = lookup("DB_ACQUIRE_TIMEOUT_SECS") {
            self.database.acquire_timeout_secs = v.parse().unwrap_or(self.database.acquire_timeout_secs);
        }
        if let Some(v) = lookup("DB_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // Security overrides
        if let Some(v) = lookup("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Some(v) = lookup("JWT_EXPIRES_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Some(v) = lookup("CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Mail overrides
        if let Some(v) = lookup("MAIL_HOST") {
            self.mail.host = Some(v).filter(|h| !h.is_empty());
        }
        if let Some(v) = lookup("MAIL_PORT") {
            self.mail.port = v.parse().unwrap_or(self.mail.port);
        }
        if let Some(v) = lookup("MAIL_USER") {
            self.mail.user = Some(v).filter(|u| !u.is_empty());
        }
        if let Some(v) = lookup("MAIL_PASSWORD") {
            self.mail.password = Some(v);
        }
        if let Some(v) = lookup("MAIL_FROM") {
            self.mail.from = v;
        } else if let Some(user) = &self.mail.user {
            if user.contains('@') {
                self.mail.from = user.clone();
            }
        }
        if let Some(v) = lookup("MAIL_STARTTLS") {
            self.mail.starttls = v.parse().unwrap_or(self.mail.starttls);
        }

        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.is_empty() {
            return Err(ConfigError::EmptyJwtSecret);
        }
        if self.environment == Environment::Production && self.security.jwt_secret == DEV_JWT_SECRET {
            return Err(ConfigError::InsecureJwtSecret);
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidPoolSize);
        }
        Ok(())
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 3800,
                uploads_dir: PathBuf::from("uploads"),
                max_upload_bytes: 10 * 1024 * 1024, // 10MB
                public_url: None,
            },
            database: DatabaseConfig {
                host: "localhost".to_string(),
                port: 3306,
                user: "root".to_string(),
                password: String::new(),
                name: "bdbitacora".to_string(),
                max_connections: 10,
                acquire_timeout_secs: 30,
                run_migrations: false,
            },
            security: SecurityConfig {
                jwt_secret: DEV_JWT_SECRET.to_string(),
                jwt_expiry_hours: 24,
                cors_origins: vec![],
            },
            mail: MailConfig {
                host: None,
                port: 587,
                user: None,
                password: None,
                from: "bitacora@localhost".to_string(),
                starttls: false,
            },
            filter: FilterConfig {
                default_limit: 10,
                max_limit: 1000,
            },
        }
    }

    fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.database.acquire_timeout_secs = 10;
        config.filter.max_limit = 500;
        config.mail.starttls = true;
        config
    }

    fn production() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Production;
        config.database.acquire_timeout_secs = 5;
        config.filter.max_limit = 200;
        config.mail.starttls = true;
        config
    }

    /// Clamp a requested page size to the configured bounds.
    pub fn page_limit(&self, requested: Option<u32>) -> u32 {
        match requested {
            Some(0) | None => self.filter.default_limit,
            Some(n) => n.min(self.filter.max_limit),
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
    fn test_default_development_config() {
        let config = AppConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.server.port, 3800);
        assert_eq!(config.database.name, "bdbitacora");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.security.jwt_expiry_hours, 24);
        assert_eq!(config.server.max_upload_bytes, 10 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_production_rejects_default_secret() {
        let config = AppConfig::from_lookup(lookup_from(&[("APP_ENV", "production")]));
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.validate(), Err(ConfigError::InsecureJwtSecret));

        let config = AppConfig::from_lookup(lookup_from(&[
            ("APP_ENV", "production"),
            ("JWT_SECRET", "a-real-secret"),
        ]));
        assert!(config.validate().is_ok());
        assert!(!config.environment.exposes_error_details());
    }

    #[test]
    fn test_env_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("PORT", "9000"),
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "not-a-number"),
            ("MAIL_HOST", "smtp.internal"),
            ("MAIL_USER", "bitacora@plant.local"),
            ("CORS_ORIGINS", "http://a.local, http://b.local,"),
        ]));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.port, 3306);
        assert_eq!(config.mail.host.as_deref(), Some("smtp.internal"));
        assert_eq!(config.mail.from, "bitacora@plant.local");
        assert_eq!(config.security.cors_origins, vec!["http://a.local", "http://b.local"]);
    }

    #[test]
    fn test_page_limit_clamps() {
        let config = AppConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config.page_limit(None), 10);
        assert_eq!(config.page_limit(Some(0)), 10);
        assert_eq!(config.page_limit(Some(50)), 50);
        assert_eq!(config.page_limit(Some(5000)), 1000);
    }
}
