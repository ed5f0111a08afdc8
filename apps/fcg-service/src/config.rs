//! Service configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults.
//!
//! | Variable | Default |
//! | --- | --- |
//! | `DATABASE_PATH` | `./fcg.db` |
//! | `JWT_SECRET` | development secret |
//! | `JWT_ISSUER` | `fcg` |
//! | `JWT_AUDIENCE` | `fcg-clients` |
//! | `JWT_LIFETIME_SECS` | `7200` (2 hours) |
//! | `PURCHASE_RETRY_ATTEMPTS` | `3` |
//! | `ADMIN_NAME` / `ADMIN_EMAIL` / `ADMIN_PASSWORD` | unset (no bootstrap) |

use std::env;
use std::path::PathBuf;

use fcg_db::DbConfig;

/// Service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// SQLite file, or `:memory:`
    pub database_path: PathBuf,

    pub jwt: JwtConfig,

    /// How many times a versioned write (wallet, profile, game or promotion)
    /// is attempted when another request updated the same row in between.
    pub purchase_retry_attempts: u32,

    /// Administrator created at startup if missing.
    pub admin: Option<AdminBootstrap>,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub lifetime_secs: i64,
}

#[derive(Clone)]
pub struct AdminBootstrap {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let jwt = JwtConfig {
            secret: var("JWT_SECRET", "fcg-dev-secret-change-in-production"),
            issuer: var("JWT_ISSUER", "fcg"),
            audience: var("JWT_AUDIENCE", "fcg-clients"),
            lifetime_secs: var("JWT_LIFETIME_SECS", "7200")
                .parse()
                .map_err(|_| ConfigError::InvalidValue("JWT_LIFETIME_SECS".to_string()))?,
        };

        if jwt.secret.is_empty() {
            return Err(ConfigError::InvalidValue("JWT_SECRET".to_string()));
        }
        if jwt.lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("JWT_LIFETIME_SECS".to_string()));
        }

        let purchase_retry_attempts: u32 = var("PURCHASE_RETRY_ATTEMPTS", "3")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PURCHASE_RETRY_ATTEMPTS".to_string()))?;
        if purchase_retry_attempts == 0 {
            return Err(ConfigError::InvalidValue("PURCHASE_RETRY_ATTEMPTS".to_string()));
        }

        let admin = match (lookup("ADMIN_EMAIL"), lookup("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminBootstrap {
                name: var("ADMIN_NAME", "Administrator"),
                email,
                password,
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::MissingRequired("ADMIN_PASSWORD".to_string())),
            (None, Some(_)) => return Err(ConfigError::MissingRequired("ADMIN_EMAIL".to_string())),
        };

        Ok(ServiceConfig {
            database_path: PathBuf::from(var("DATABASE_PATH", "./fcg.db")),
            jwt,
            purchase_retry_attempts,
            admin,
        })
    }

    /// Deterministic configuration over an in-memory database.
    pub fn for_tests() -> Self {
        ServiceConfig {
            database_path: PathBuf::from(":memory:"),
            jwt: JwtConfig {
                secret: "test-secret".to_string(),
                issuer: "fcg".to_string(),
                audience: "fcg-clients".to_string(),
                lifetime_secs: 7200,
            },
            purchase_retry_attempts: 3,
            admin: None,
        }
    }

    /// Pool settings for [`database_path`](Self::database_path).
    pub fn db_config(&self) -> DbConfig {
        if self.database_path.as_os_str() == ":memory:" {
            DbConfig::in_memory()
        } else {
            DbConfig::new(&self.database_path)
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ServiceConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceConfig::load_from(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.database_path, PathBuf::from("./fcg.db"));
        assert_eq!(config.jwt.lifetime_secs, 7200);
        assert_eq!(config.jwt.issuer, "fcg");
        assert_eq!(config.purchase_retry_attempts, 3);
        assert!(config.admin.is_none());
    }

    #[test]
    fn test_overrides_and_admin_bootstrap() {
        let config = load(&[
            ("DATABASE_PATH", "/var/lib/fcg/store.db"),
            ("JWT_LIFETIME_SECS", "600"),
            ("PURCHASE_RETRY_ATTEMPTS", "5"),
            ("ADMIN_EMAIL", "root@fcg.dev"),
            ("ADMIN_PASSWORD", "Sup3r$ecret"),
        ])
        .unwrap();

        assert_eq!(config.jwt.lifetime_secs, 600);
        assert_eq!(config.purchase_retry_attempts, 5);
        let admin = config.admin.unwrap();
        assert_eq!(admin.name, "Administrator");
        assert!(!format!("{:?}", admin).contains("Sup3r"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            load(&[("JWT_LIFETIME_SECS", "two hours")]),
            Err(ConfigError::InvalidValue(name)) if name == "JWT_LIFETIME_SECS"
        ));
        assert!(matches!(
            load(&[("PURCHASE_RETRY_ATTEMPTS", "0")]),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            load(&[("ADMIN_EMAIL", "root@fcg.dev")]),
            Err(ConfigError::MissingRequired(name)) if name == "ADMIN_PASSWORD"
        ));
    }

    #[test]
    fn test_test_config_uses_in_memory_database() {
        let config = ServiceConfig::for_tests();
        assert_eq!(config.db_config().max_connections, 1);
    }
}
