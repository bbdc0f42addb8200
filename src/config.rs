use serde::{Deserialize, Serialize};
use std::env;

use crate::domain::value_objects::DEFAULT_CURRENCY;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub nats_url: Option<String>,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(skip_serializing)]
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Bearer token for `/api/v1/admin`. Admin routes reject everything when unset.
    #[serde(skip_serializing)]
    pub admin_token: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
        Ok(Self {
            database: DatabaseConfig { url, max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10)? },
            server: ServerConfig {
                port: parse_or("PORT", 8083)?,
                admin_token: env::var("ADMIN_API_TOKEN").ok().filter(|t| !t.is_empty()),
            },
            nats_url: env::var("NATS_URL").ok().filter(|u| !u.is_empty()),
            currency: env::var("DEFAULT_CURRENCY").unwrap_or_else(|_| DEFAULT_CURRENCY.to_string()),
        })
    }
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.parse().map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}
