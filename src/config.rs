use std::{env, str::FromStr};

use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub db_max_connections: u32,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Employee directory cache
    pub employee_cache_capacity: u64,
    pub employee_cache_ttl_secs: u64,

    pub log_dir: String,
    pub log_level: tracing::Level,
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key).ok_or_else(|| anyhow!("{key} must be set"))
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let log_level = match lookup("LOG_LEVEL") {
            Some(raw) => tracing::Level::from_str(raw.trim())
                .map_err(|_| anyhow!("LOG_LEVEL has an invalid value: {raw:?}"))?,
            None => tracing::Level::DEBUG,
        };

        Ok(Self {
            server_addr: required(&lookup, "SERVER_ADDR")?,
            database_url: required(&lookup, "DATABASE_URL")?,
            jwt_secret: required(&lookup, "JWT_SECRET")?,
            access_token_ttl: parsed(&lookup, "ACCESS_TOKEN_TTL", 7200)?, // 2 hours
            db_max_connections: parsed(&lookup, "DB_MAX_CONNECTIONS", 10)?,

            rate_login_per_min: parsed(&lookup, "RATE_LOGIN_PER_MIN", 60)?,
            rate_register_per_min: parsed(&lookup, "RATE_REGISTER_PER_MIN", 30)?,
            rate_protected_per_min: parsed(&lookup, "RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: lookup("API_PREFIX").unwrap_or_else(|| "/api".to_string()),

            employee_cache_capacity: parsed(&lookup, "EMPLOYEE_CACHE_CAPACITY", 10_000)?,
            employee_cache_ttl_secs: parsed(&lookup, "EMPLOYEE_CACHE_TTL_SECS", 3600)?,

            log_dir: lookup("LOG_DIR").unwrap_or_else(|| "logs".to_string()),
            log_level,
        })
    }
}
