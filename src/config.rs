use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Process configuration, read from the environment (and `.env` via dotenvy).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub cors_origin: String,
    pub webhook_max_retries: u32,
    pub webhook_base_delay: Duration,
    pub worker_interval: Duration,
    pub no_show_grace: chrono::Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let bind_addr = parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8000)))?;
        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:5173".to_string());

        let webhook_max_retries = parse_or(&lookup, "WEBHOOK_MAX_RETRIES", 3u32)?;
        let webhook_base_delay_ms = parse_or(&lookup, "WEBHOOK_BASE_DELAY_MS", 500u64)?;
        let worker_interval_secs = parse_or(&lookup, "WORKER_INTERVAL_SECS", 300u64)?;
        let no_show_grace_minutes = parse_or(&lookup, "NO_SHOW_GRACE_MINUTES", 120i64)?;

        if worker_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "WORKER_INTERVAL_SECS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            database_url,
            bind_addr,
            cors_origin,
            webhook_max_retries,
            webhook_base_delay: Duration::from_millis(webhook_base_delay_ms),
            worker_interval: Duration::from_secs(worker_interval_secs),
            no_show_grace: chrono::Duration::minutes(no_show_grace_minutes),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}
