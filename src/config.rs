use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    Local { root: PathBuf },
    S3 { bucket: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_url: String,
    pub debug: bool,
    pub storage: StorageConfig,
    pub session_lifetime_minutes: i64,
    pub secure_cookies: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
        if database_url.is_empty() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let storage = match env::var("STORAGE_DRIVER").unwrap_or_else(|_| "local".into()).as_str() {
            "local" => StorageConfig::Local {
                root: PathBuf::from(env::var("STORAGE_ROOT").unwrap_or_else(|_| "./storage".into())),
            },
            "s3" => StorageConfig::S3 {
                bucket: env::var("AWS_S3_BUCKET").map_err(|_| ConfigError::Missing("AWS_S3_BUCKET"))?,
            },
            other => {
                return Err(ConfigError::Invalid {
                    name: "STORAGE_DRIVER",
                    value: other.to_string(),
                })
            }
        };

        let session_lifetime_minutes = match env::var("SESSION_LIFETIME_MINUTES") {
            Ok(raw) => raw.parse::<i64>().ok().filter(|m| *m > 0).ok_or(ConfigError::Invalid {
                name: "SESSION_LIFETIME_MINUTES",
                value: raw,
            })?,
            Err(_) => 120,
        };

        Ok(AppConfig {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".into()),
            database_url,
            debug: env_flag("APP_DEBUG"),
            storage,
            session_lifetime_minutes,
            secure_cookies: env_flag("SESSION_COOKIE_SECURE"),
        })
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| parse_flag(&v))
        .unwrap_or(false)
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
