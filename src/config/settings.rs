use std::env;
use std::fmt;
use crate::error::AppError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 15;
pub const DEFAULT_REFRESH_TOKEN_EXPIRE_DAYS: i64 = 7;

// Secrets shorter than this still start, but with a warning
const RECOMMENDED_SECRET_LEN: usize = 32;

#[derive(Clone, Debug)]
pub struct AppSettings {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub name: String,
    pub environment: String,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

/// Token signing configuration. Loaded once at startup and never mutated.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("access_token_ttl_minutes", &self.access_token_ttl_minutes)
            .field("refresh_token_ttl_days", &self.refresh_token_ttl_days)
            .finish()
    }
}

impl AuthConfig {
    /// Builds the auth section. An absent or empty secret is a hard error:
    /// the server must never start able to mint unsigned tokens.
    pub fn new(
        jwt_secret: impl Into<String>,
        access_token_ttl_minutes: i64,
        refresh_token_ttl_days: i64,
    ) -> Result<Self, AppError> {
        let jwt_secret = jwt_secret.into();
        if jwt_secret.trim().is_empty() {
            return Err(AppError::Configuration("JWT_SECRET must not be empty".to_string()));
        }
        if jwt_secret.len() < RECOMMENDED_SECRET_LEN {
            log::warn!(
                "JWT_SECRET is shorter than {} bytes; use a longer random value in production",
                RECOMMENDED_SECRET_LEN
            );
        }
        if access_token_ttl_minutes <= 0 || refresh_token_ttl_days <= 0 {
            return Err(AppError::Configuration("Token lifetimes must be positive".to_string()));
        }

        Ok(Self {
            jwt_secret,
            access_token_ttl_minutes,
            refresh_token_ttl_days,
        })
    }
}

impl AppSettings {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup so tests don't have to
    /// touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // App config
        let app_name = lookup("APP_NAME").unwrap_or_else(|| "music-app-backend".to_string());
        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        // Database config
        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| AppError::Configuration("DATABASE_URL must be set".to_string()))?;

        // Server config
        let server_host = lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        // SERVER_PORT wins; PORT is what most hosting platforms inject
        let server_port = lookup("SERVER_PORT")
            .or_else(|| lookup("PORT"))
            .unwrap_or_else(|| "8000".to_string())
            .trim()
            .parse::<u16>()
            .map_err(|_| AppError::Configuration("SERVER_PORT/PORT must be a valid port number".to_string()))?;

        // CORS origins
        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        // Auth config
        let jwt_secret = lookup("JWT_SECRET")
            .ok_or_else(|| AppError::Configuration("JWT_SECRET must be set".to_string()))?;

        let access_token_ttl_minutes = positive_or_default(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            lookup("ACCESS_TOKEN_EXPIRE_MINUTES"),
            DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES,
        );
        let refresh_token_ttl_days = positive_or_default(
            "REFRESH_TOKEN_EXPIRE_DAYS",
            lookup("REFRESH_TOKEN_EXPIRE_DAYS"),
            DEFAULT_REFRESH_TOKEN_EXPIRE_DAYS,
        );

        Ok(Self {
            app: AppConfig {
                name: app_name,
                environment,
            },
            database: DatabaseConfig {
                url: database_url,
            },
            server: ServerConfig {
                host: server_host,
                port: server_port,
                cors_origins,
            },
            auth: AuthConfig::new(jwt_secret, access_token_ttl_minutes, refresh_token_ttl_days)?,
        })
    }
}

fn positive_or_default(key: &str, raw: Option<String>, default: i64) -> i64 {
    match raw {
        None => default,
        Some(value) => match value.trim().parse::<i64>() {
            Ok(v) if v > 0 => v,
            _ => {
                log::warn!(
                    "Invalid value '{}' for {}, using default {}",
                    value, key, default
                );
                default
            }
        },
    }
}
