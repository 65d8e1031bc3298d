//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - PostgreSQL connection string
//! - `JWT_SECRET` - HS256 signing secret for bearer tokens
//!
//! ## Optional
//! - `PORT` - Listen port (default: 5000)
//! - `FRONTEND_URL` - Allowed CORS origin (permissive when unset)
//! - `UPLOAD_DIR` - Directory uploaded images are written to (default: public/uploads)
//! - `PUBLIC_URL` - Base prepended to upload URLs (default: empty, relative URLs)
//! - `NATS_URL` - NATS server events are also published to
//! - `DATABASE_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `BOOTSTRAP_ADMIN_EMAIL` / `BOOTSTRAP_ADMIN_PASSWORD` - Super admin created at startup

use std::path::PathBuf;
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_UPLOAD_DIR: &str = "public/uploads";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const MIN_BOOTSTRAP_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(&'static str, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL (contains password)
    pub database_url: SecretString,
    pub jwt_secret: SecretString,
    pub port: u16,
    pub frontend_url: Option<String>,
    pub upload_dir: PathBuf,
    pub public_url: String,
    pub nats_url: Option<String>,
    pub max_connections: u32,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// Credentials of the super admin ensured at startup.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: SecretString,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::MissingEnvVar(key));

        let bootstrap_admin = match (get("BOOTSTRAP_ADMIN_EMAIL"), get("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => {
                if password.len() < MIN_BOOTSTRAP_PASSWORD_LENGTH {
                    return Err(ConfigError::InvalidEnvVar(
                        "BOOTSTRAP_ADMIN_PASSWORD",
                        format!("must be at least {MIN_BOOTSTRAP_PASSWORD_LENGTH} characters"),
                    ));
                }
                Some(BootstrapAdmin { email, password: SecretString::from(password) })
            }
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::MissingEnvVar("BOOTSTRAP_ADMIN_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::MissingEnvVar("BOOTSTRAP_ADMIN_EMAIL")),
        };

        Ok(Self {
            database_url: SecretString::from(required("DATABASE_URL")?),
            jwt_secret: SecretString::from(required("JWT_SECRET")?),
            port: parse_or("PORT", get("PORT"), DEFAULT_PORT)?,
            frontend_url: get("FRONTEND_URL"),
            upload_dir: get("UPLOAD_DIR").map_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR), PathBuf::from),
            public_url: get("PUBLIC_URL").map(|u| u.trim_end_matches('/').to_string()).unwrap_or_default(),
            nats_url: get("NATS_URL"),
            max_connections: parse_or("DATABASE_MAX_CONNECTIONS", get("DATABASE_MAX_CONNECTIONS"), DEFAULT_MAX_CONNECTIONS)?,
            bootstrap_admin,
        })
    }
}

fn parse_or<T: FromStr>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match value {
        Some(v) => v.parse().map_err(|e: T::Err| ConfigError::InvalidEnvVar(key, e.to_string())),
        None => Ok(default),
    }
}
