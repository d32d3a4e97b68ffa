//! API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable                      | Default              |
//! |-------------------------------|----------------------|
//! | `HTTP_BIND_ADDR`              | `0.0.0.0`            |
//! | `HTTP_PORT`                   | `8080`               |
//! | `DATABASE_PATH`               | `./data/meridian.db` |
//! | `DB_MAX_CONNECTIONS`          | `8`                  |
//! | `BUSINESS_UTC_OFFSET_MINUTES` | `0`                  |
//! | `INVOICE_PREFIX`              | `INV`                |
//! | `KITCHEN_CHANNEL_CAPACITY`    | `256`                |

use std::env;
use std::str::FromStr;

use chrono::FixedOffset;
use meridian_core::invoice::{validate_prefix, DEFAULT_INVOICE_PREFIX};

/// Largest accepted business offset, exclusive (one day).
const MAX_OFFSET_MINUTES: i32 = 24 * 60;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (default: 0.0.0.0)
    pub bind_addr: String,

    /// HTTP port
    pub port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Pool size
    pub db_max_connections: u32,

    /// Fixed UTC offset of the store's business day. Drives invoice dates,
    /// promo day/hour rules and listing date filters.
    pub business_offset: FixedOffset,

    /// Invoice number prefix (1-10 alphanumerics)
    pub invoice_prefix: String,

    /// Buffered kitchen events per store before slow displays lag
    pub kitchen_channel_capacity: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            bind_addr: "0.0.0.0".to_string(),
            port: 8080,
            database_path: "./data/meridian.db".to_string(),
            db_max_connections: 8,
            business_offset: utc(),
            invoice_prefix: DEFAULT_INVOICE_PREFIX.to_string(),
            kitchen_channel_capacity: 256,
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup (the process environment
    /// in production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ApiConfig::default();

        let offset_minutes: i32 = parse_or(&lookup, "BUSINESS_UTC_OFFSET_MINUTES", 0)?;
        if offset_minutes.abs() >= MAX_OFFSET_MINUTES {
            return Err(ConfigError::OutOfRange {
                key: "BUSINESS_UTC_OFFSET_MINUTES".to_string(),
                min: -(MAX_OFFSET_MINUTES as i64) + 1,
                max: MAX_OFFSET_MINUTES as i64 - 1,
            });
        }
        let business_offset = FixedOffset::east_opt(offset_minutes * 60)
            .ok_or_else(|| ConfigError::InvalidValue("BUSINESS_UTC_OFFSET_MINUTES".to_string()))?;

        let invoice_prefix = lookup("INVOICE_PREFIX")
            .map(|p| p.trim().to_uppercase())
            .unwrap_or(defaults.invoice_prefix);
        validate_prefix(&invoice_prefix)
            .map_err(|e| ConfigError::InvalidValue(format!("INVOICE_PREFIX ({})", e)))?;

        let config = ApiConfig {
            bind_addr: lookup("HTTP_BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: parse_or(&lookup, "HTTP_PORT", defaults.port)?,
            database_path: lookup("DATABASE_PATH").unwrap_or(defaults.database_path),
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            business_offset,
            invoice_prefix,
            kitchen_channel_capacity: parse_or(
                &lookup,
                "KITCHEN_CHANNEL_CAPACITY",
                defaults.kitchen_channel_capacity,
            )?,
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::OutOfRange {
                key: "DB_MAX_CONNECTIONS".to_string(),
                min: 1,
                max: u32::MAX as i64,
            });
        }
        if config.kitchen_channel_capacity == 0 {
            return Err(ConfigError::OutOfRange {
                key: "KITCHEN_CHANNEL_CAPACITY".to_string(),
                min: 1,
                max: i64::MAX,
            });
        }

        Ok(config)
    }

    /// Returns the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

fn utc() -> FixedOffset {
    chrono::Offset::fix(&chrono::Utc)
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("{key} must be between {min} and {max}")]
    OutOfRange { key: String, min: i64, max: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ApiConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.invoice_prefix, "INV");
        assert_eq!(config.business_offset.local_minus_utc(), 0);
        assert_eq!(config.kitchen_channel_capacity, 256);
    }

    #[test]
    fn test_overrides() {
        let config = ApiConfig::from_lookup(lookup(&[
            ("HTTP_PORT", "9000"),
            ("BUSINESS_UTC_OFFSET_MINUTES", "420"),
            ("INVOICE_PREFIX", "pos"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.business_offset.local_minus_utc(), 7 * 3600);
        assert_eq!(config.invoice_prefix, "POS");
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            ApiConfig::from_lookup(lookup(&[("HTTP_PORT", "http")])),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            ApiConfig::from_lookup(lookup(&[("BUSINESS_UTC_OFFSET_MINUTES", "1440")])),
            Err(ConfigError::OutOfRange { .. })
        ));
        assert!(ApiConfig::from_lookup(lookup(&[("INVOICE_PREFIX", "IN-V")])).is_err());
        assert!(ApiConfig::from_lookup(lookup(&[("DB_MAX_CONNECTIONS", "0")])).is_err());
    }
}
