use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(60 * 60);
/// Carried for completeness; no transition currently waits on it.
pub const DEFAULT_MATCH_TIMEOUT: Duration = Duration::from_secs(2 * 60);
pub const DEFAULT_RATE_LIMIT: u32 = 30;
pub const DEFAULT_REAP_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_DATABASE_PATH: &str = "database.db";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error("{key} must be greater than zero")]
    Zero { key: &'static str },
}

#[derive(Clone, Debug, PartialEq)]
pub struct RelayConfig {
    pub database_path: String,
    pub inactivity_timeout: Duration,
    pub match_timeout: Duration,
    pub rate_limit: u32,
    pub reap_interval: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            inactivity_timeout: DEFAULT_INACTIVITY_TIMEOUT,
            match_timeout: DEFAULT_MATCH_TIMEOUT,
            rate_limit: DEFAULT_RATE_LIMIT,
            reap_interval: DEFAULT_REAP_INTERVAL,
        }
    }
}

impl RelayConfig {
    /// Loads `.env` if present, then applies `RELAY_*` overrides on top of the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                warn!("Error loading .env file: {err}");
            }
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = lookup("RELAY_DATABASE_PATH") {
            config.database_path = path;
        }
        if let Some(secs) = parse::<u64>(&lookup, "RELAY_INACTIVITY_TIMEOUT_SECS")? {
            config.inactivity_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse::<u64>(&lookup, "RELAY_MATCH_TIMEOUT_SECS")? {
            config.match_timeout = Duration::from_secs(secs);
        }
        if let Some(rate) = parse::<u32>(&lookup, "RELAY_RATE_LIMIT")? {
            config.rate_limit = rate;
        }
        if let Some(secs) = parse::<u64>(&lookup, "RELAY_REAP_INTERVAL_SECS")? {
            config.reap_interval = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit == 0 {
            return Err(ConfigError::Zero {
                key: "RELAY_RATE_LIMIT",
            });
        }
        if self.reap_interval.is_zero() {
            return Err(ConfigError::Zero {
                key: "RELAY_REAP_INTERVAL_SECS",
            });
        }
        Ok(())
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value }),
    }
}
