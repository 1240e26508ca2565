// src/config.rs
use std::env;
use thiserror::Error;

use crate::fal_client::DEFAULT_QUEUE_URL;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is invalid: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Settings read from the environment (after `.env` is loaded).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub fal_key: String,
    pub fal_queue_url: String,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub bind_addr: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let fal_key = non_empty("FAL_KEY").ok_or(ConfigError::Missing("FAL_KEY"))?;
        let db_max_connections = match non_empty("DB_MAX_CONNECTIONS") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "DB_MAX_CONNECTIONS",
                value,
            })?,
            None => 5,
        };

        Ok(Self {
            fal_key,
            fal_queue_url: non_empty("FAL_QUEUE_URL").unwrap_or_else(|| DEFAULT_QUEUE_URL.to_string()),
            database_url: non_empty("DATABASE_URL"),
            db_max_connections,
            bind_addr: non_empty("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
        })
    }

    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::Missing("DATABASE_URL"))
    }
}
