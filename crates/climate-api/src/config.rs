//! # API Configuration
//!
//! Environment-based configuration for the API service.

use std::env;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use climate_analytics::DEFAULT_TARGET_YEAR;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid SERVER_ADDR '{value}': {reason}")]
    InvalidServerAddr { value: String, reason: String },
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address
    pub server_addr: SocketAddr,

    /// Logging level when `RUST_LOG` is unset
    pub log_level: String,

    /// CORS allowed origins (`*` allows any)
    pub cors_origins: Vec<String>,

    /// Upstream data source configuration
    pub upstream: UpstreamConfig,

    /// Default horizon for forecasts without `target_year`
    pub forecast_target_year: i32,

    /// Optional JSON catalog replacing the built-in indicator table
    pub catalog_path: Option<PathBuf>,
}

/// World Bank client and disk cache configuration
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub data_dir: PathBuf,
    pub cache_hours: u64,
    pub base_url: String,
    pub timeout: Duration,
    /// Serve from the disk cache only; never fetch
    pub offline: bool,
}

impl UpstreamConfig {
    #[must_use]
    pub const fn cache_max_age(&self) -> Duration {
        Duration::from_secs(self.cache_hours.saturating_mul(3600))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            log_level: "info".to_string(),
            cors_origins: vec!["http://localhost:3000".to_string()],
            upstream: UpstreamConfig {
                data_dir: PathBuf::from("data"),
                cache_hours: 24,
                base_url: climate_store::worldbank::DEFAULT_BASE_URL.to_string(),
                timeout: Duration::from_secs(30),
                offline: false,
            },
            forecast_target_year: DEFAULT_TARGET_YEAR,
            catalog_path: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Fails only on an unparsable `SERVER_ADDR`; other invalid values fall
    /// back to their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// # Errors
    ///
    /// See [`Config::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let flag = |key: &str| lookup(key).map(|v| matches!(v.trim(), "true" | "1"));

        let server_addr = match lookup("SERVER_ADDR") {
            Some(value) => value
                .parse()
                .map_err(|e: AddrParseError| ConfigError::InvalidServerAddr {
                    reason: e.to_string(),
                    value,
                })?,
            None => defaults.server_addr,
        };

        Ok(Self {
            server_addr,

            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),

            cors_origins: lookup("CORS_ORIGINS").map_or(defaults.cors_origins, |v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            }),

            upstream: UpstreamConfig {
                data_dir: lookup("DATA_DIR").map_or(defaults.upstream.data_dir, PathBuf::from),
                cache_hours: parsed::<u64>(lookup("WB_CACHE_HOURS"))
                    .filter(|hours| hours.checked_mul(3600).is_some())
                    .unwrap_or(defaults.upstream.cache_hours),
                base_url: lookup("WB_BASE_URL").unwrap_or(defaults.upstream.base_url),
                timeout: parsed(lookup("WB_TIMEOUT_SECS"))
                    .map_or(defaults.upstream.timeout, Duration::from_secs),
                offline: flag("OFFLINE").unwrap_or(defaults.upstream.offline),
            },

            forecast_target_year: parsed(lookup("FORECAST_TARGET_YEAR"))
                .unwrap_or(defaults.forecast_target_year),

            catalog_path: lookup("CATALOG_PATH").map(PathBuf::from),
        })
    }
}

fn parsed<T: FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.server_addr.port(), 8000);
        assert_eq!(config.cors_origins, vec!["http://localhost:3000"]);
        assert_eq!(config.upstream.cache_max_age(), Duration::from_secs(86_400));
        assert_eq!(config.upstream.timeout, Duration::from_secs(30));
        assert_eq!(config.forecast_target_year, 2030);
        assert!(!config.upstream.offline);
        assert!(config.catalog_path.is_none());
    }

    #[test]
    fn test_overrides_and_fallbacks() {
        let config = Config::from_lookup(lookup(&[
            ("SERVER_ADDR", "127.0.0.1:9100"),
            ("CORS_ORIGINS", "http://a.test, http://b.test"),
            ("WB_CACHE_HOURS", "6"),
            ("WB_TIMEOUT_SECS", "not-a-number"),
            ("FORECAST_TARGET_YEAR", "2040"),
            ("OFFLINE", "1"),
        ]))
        .unwrap();

        assert_eq!(config.server_addr.port(), 9100);
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.upstream.cache_hours, 6);
        assert_eq!(config.upstream.timeout, Duration::from_secs(30));
        assert_eq!(config.forecast_target_year, 2040);
        assert!(config.upstream.offline);
    }

    #[test]
    fn test_out_of_range_cache_hours_falls_back() {
        let hours = u64::MAX.to_string();
        let config = Config::from_lookup(lookup(&[("WB_CACHE_HOURS", &hours)])).unwrap();
        assert_eq!(config.upstream.cache_hours, 24);

        let upstream = UpstreamConfig {
            cache_hours: u64::MAX,
            ..config.upstream
        };
        assert_eq!(upstream.cache_max_age(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_invalid_server_addr_is_an_error() {
        let err = Config::from_lookup(lookup(&[("SERVER_ADDR", "nowhere")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidServerAddr { .. }));
    }
}
