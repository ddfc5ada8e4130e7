//! Configuration module for the registry.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::AppError;

/// Reset password used when `IPIAL_RESET_PASSWORD` is unset.
pub const DEFAULT_RESET_PASSWORD: &str = "admin@reset";

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the JSON data document
    pub data_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Shared secret required by POST /api/reset
    pub reset_password: String,
    /// Maximum accepted request body, in bytes
    pub body_limit: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let data_path = env::var("IPIAL_DATA_PATH")
            .unwrap_or_else(|_| "./data/ipial_data.json".to_string())
            .into();

        let bind_addr = env::var("IPIAL_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|e| AppError::Validation(format!("Invalid IPIAL_BIND_ADDR: {}", e)))?;

        let log_level = env::var("IPIAL_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let reset_password =
            env::var("IPIAL_RESET_PASSWORD").unwrap_or_else(|_| DEFAULT_RESET_PASSWORD.to_string());

        let body_limit = parse_number("IPIAL_BODY_LIMIT", 50 * 1024 * 1024)?;

        Ok(Self {
            data_path,
            bind_addr,
            log_level,
            reset_password,
            body_limit,
        })
    }
}

/// Client-side configuration for the admin application.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the sync server
    pub server_url: String,
    /// Directory holding the local cache files
    pub cache_dir: PathBuf,
    /// Period of the background pull
    pub sync_interval: Duration,
    /// Inactivity window before the session is dropped
    pub idle_timeout: Duration,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let server_url =
            env::var("IPIAL_SERVER_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let cache_dir = env::var("IPIAL_CACHE_DIR")
            .unwrap_or_else(|_| "./data/cache".to_string())
            .into();

        let sync_interval = sync_interval(parse_number("IPIAL_SYNC_INTERVAL_SECS", 15)?)?;
        let idle_timeout = Duration::from_secs(parse_number("IPIAL_IDLE_TIMEOUT_SECS", 600)?);

        Ok(Self {
            server_url,
            cache_dir,
            sync_interval,
            idle_timeout,
        })
    }
}

/// The periodic pull cannot run on a zero period.
fn sync_interval(secs: u64) -> Result<Duration, AppError> {
    if secs == 0 {
        return Err(AppError::Validation(
            "IPIAL_SYNC_INTERVAL_SECS must be at least 1".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

fn parse_number<T: std::str::FromStr>(name: &str, default: T) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Validation(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        env::remove_var("IPIAL_DATA_PATH");
        env::remove_var("IPIAL_BIND_ADDR");
        env::remove_var("IPIAL_LOG_LEVEL");
        env::remove_var("IPIAL_RESET_PASSWORD");
        env::remove_var("IPIAL_BODY_LIMIT");

        let config = Config::from_env().unwrap();

        assert_eq!(config.data_path, PathBuf::from("./data/ipial_data.json"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:3000");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.reset_password, "admin@reset");
        assert_eq!(config.body_limit, 52_428_800);
    }

    #[test]
    fn test_default_client_config() {
        env::remove_var("IPIAL_SERVER_URL");
        env::remove_var("IPIAL_CACHE_DIR");
        env::remove_var("IPIAL_SYNC_INTERVAL_SECS");
        env::remove_var("IPIAL_IDLE_TIMEOUT_SECS");

        let config = ClientConfig::from_env().unwrap();

        assert_eq!(config.server_url, "http://localhost:3000");
        assert_eq!(config.cache_dir, PathBuf::from("./data/cache"));
        assert_eq!(config.sync_interval, Duration::from_secs(15));
        assert_eq!(config.idle_timeout, Duration::from_secs(600));
    }

    #[test]
    fn test_zero_sync_interval_is_rejected() {
        assert!(matches!(sync_interval(0), Err(AppError::Validation(_))));
        assert_eq!(sync_interval(15).unwrap(), Duration::from_secs(15));
    }
}
