//! Configuration module
//!
//! Settings are read from the environment (after loading an optional `.env`
//! file), following the same fallback-per-variable style for every field.

use std::env;
use std::path::PathBuf;

use crate::constants::DEFAULT_PUBLIC_PREFIX;

const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MEDIA_ROOT: &str = "wwwroot/Videos";

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    /// Flat directory holding every stored file.
    pub media_root: PathBuf,
    /// Directory name under which stored files are published.
    pub public_prefix: String,
    pub ffprobe_path: String,
    pub environment: String,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let config = Config {
            database_url: env::var("DATABASE_URL").ok(),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            media_root: env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_MEDIA_ROOT)),
            public_prefix: env::var("MEDIA_PUBLIC_PREFIX")
                .unwrap_or_else(|_| DEFAULT_PUBLIC_PREFIX.to_string()),
            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or_else(|_| "ffprobe".to_string()),
            environment,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.media_root.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("MEDIA_ROOT cannot be empty"));
        }

        if let Some(url) = &self.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a PostgreSQL connection string"
                ));
            }
        }

        if self.public_prefix.contains("..") {
            return Err(anyhow::anyhow!("MEDIA_PUBLIC_PREFIX cannot contain '..'"));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn database_url(&self) -> Result<&str, anyhow::Error> {
        self.database_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: None,
            db_max_connections: MAX_CONNECTIONS,
            db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
            media_root: PathBuf::from(DEFAULT_MEDIA_ROOT),
            public_prefix: DEFAULT_PUBLIC_PREFIX.to_string(),
            ffprobe_path: "ffprobe".to_string(),
            environment: "development".to_string(),
        }
    }
}
