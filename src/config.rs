use std::{env, fmt::Display, fs::read_to_string, str::FromStr, sync::Arc};

use log::{info, warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid {key} value: {info}")]
    InvalidValue { key: &'static str, info: String },

    #[error("Secret {0} is not configured")]
    MissingSecret(&'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    /// Origin used when rendering short links, without a trailing slash.
    pub public_url: String,
    pub jwt_secret: Arc<str>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            port: try_load("FOODGRAM_PORT", "8080")?,
            database_url: try_load("DATABASE_URL", "sqlite://foodgram.db")?,
            max_connections: try_load("DATABASE_MAX_CONNECTIONS", "5")?,
            public_url: try_load::<String>("PUBLIC_URL", "https://foodgram.example.org")?
                .trim_end_matches('/')
                .to_string(),
            jwt_secret: read_secret("JWT_SECRET")?.into(),
        })
    }

    pub fn short_link_url(&self, code: &str) -> String {
        format!("{}/s/{code}", self.public_url)
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::InvalidValue {
                key,
                info: e.to_string(),
            }
        })
}

/// Reads `/run/secrets/{name}`, falling back to the environment variable of the same name.
fn read_secret(secret_name: &'static str) -> Result<String, ConfigError> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            info!("Failed to read {secret_name} from file: {e}; trying environment");
        })
        .ok()
        .or_else(|| var(secret_name))
        .filter(|secret| !secret.is_empty())
        .ok_or(ConfigError::MissingSecret(secret_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_values_fall_back_to_defaults() {
        let port: u16 = try_load("FOODGRAM_TEST_UNSET_PORT", "8080").unwrap();
        assert_eq!(port, 8080);
    }

    #[test]
    fn unparsable_default_is_reported() {
        let e = try_load::<u16>("FOODGRAM_TEST_UNSET_PORT", "eighty").unwrap_err();
        assert!(matches!(e, ConfigError::InvalidValue { key: "FOODGRAM_TEST_UNSET_PORT", .. }));
    }

    #[test]
    fn short_links_use_the_public_origin() {
        let config = Config {
            port: 8080,
            database_url: "sqlite::memory:".into(),
            max_connections: 1,
            public_url: "https://food.test".into(),
            jwt_secret: "s".into(),
        };
        assert_eq!(config.short_link_url("6b86b2"), "https://food.test/s/6b86b2");
    }
}
