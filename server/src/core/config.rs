//! Backend configuration types
//!
//! Deserialized from the embedding application's config file (JSON). The
//! `cachesize` option historically arrives through dynamically-typed
//! configuration layers, so it accepts an unsigned integer, a signed
//! integer, or a decimal string and coerces all of them to `u64`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use super::constants::DEFAULT_CHANGESET_CACHE_ENTRIES;

// =============================================================================
// Cache Size
// =============================================================================

/// Error converting a dynamically-typed `cachesize` value
#[derive(Debug, Error, PartialEq, Eq)]
#[error("cachesize must be a non-negative integer, got {0}")]
pub struct CacheSizeError(String);

/// Capacity of the changeset metadata cache, in entries.
///
/// Accepts heterogeneous config input: `12345`, `-1` (rejected), `"12345"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheSize(u64);

impl CacheSize {
    pub fn new(entries: u64) -> Self {
        Self(entries)
    }

    pub fn entries(self) -> u64 {
        self.0
    }
}

impl Default for CacheSize {
    fn default() -> Self {
        Self(DEFAULT_CHANGESET_CACHE_ENTRIES)
    }
}

impl fmt::Display for CacheSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CacheSize {
    fn from(entries: u64) -> Self {
        Self(entries)
    }
}

impl TryFrom<i64> for CacheSize {
    type Error = CacheSizeError;

    fn try_from(entries: i64) -> Result<Self, Self::Error> {
        u64::try_from(entries)
            .map(Self)
            .map_err(|_| CacheSizeError(entries.to_string()))
    }
}

impl FromStr for CacheSize {
    type Err = CacheSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| CacheSizeError(s.to_string()))
    }
}

impl<'de> Deserialize<'de> for CacheSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Unsigned(u64),
            Signed(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Unsigned(v) => Ok(Self(v)),
            Raw::Signed(v) => Self::try_from(v).map_err(serde::de::Error::custom),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

// =============================================================================
// Database Config
// =============================================================================

/// PostgreSQL backend configuration.
///
/// Fields left at `0` (or `None`) fall back to defaults when the factory
/// resolves them, matching how the rest of the config layer treats unset
/// numeric options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database name (required)
    pub dbname: String,
    /// Database host; driver default when absent
    #[serde(default)]
    pub host: Option<String>,
    /// Login role; driver default when absent
    #[serde(default)]
    pub username: Option<String>,
    /// Login password; driver default when absent
    #[serde(default)]
    pub password: Option<String>,
    /// Server port; driver default when absent
    #[serde(default)]
    pub dbport: Option<u16>,
    /// Client text encoding, e.g. `utf8` (required)
    pub charset: String,
    /// Changeset metadata cache capacity
    #[serde(default)]
    pub cachesize: CacheSize,
    /// Maximum connections in the primary pool (0 = default)
    #[serde(default)]
    pub max_connections: u32,
    /// Statement timeout in seconds (0 = default)
    #[serde(default)]
    pub statement_timeout_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cachesize_from_unsigned() {
        let size: CacheSize = serde_json::from_value(serde_json::json!(5000)).unwrap();
        assert_eq!(size.entries(), 5000);
    }

    #[test]
    fn test_cachesize_from_decimal_string() {
        let size: CacheSize = serde_json::from_value(serde_json::json!("5000")).unwrap();
        assert_eq!(size.entries(), 5000);
    }

    #[test]
    fn test_cachesize_from_padded_string() {
        let size: CacheSize = " 42 ".parse::<CacheSize>().unwrap();
        assert_eq!(size.entries(), 42);
    }

    #[test]
    fn test_cachesize_rejects_negative() {
        let result: Result<CacheSize, _> = serde_json::from_value(serde_json::json!(-1));
        assert!(result.is_err());
    }

    #[test]
    fn test_cachesize_rejects_garbage_string() {
        let result: Result<CacheSize, _> = serde_json::from_value(serde_json::json!("lots"));
        assert!(result.is_err());
    }

    #[test]
    fn test_cachesize_signed_conversion() {
        assert_eq!(CacheSize::try_from(7i64).unwrap().entries(), 7);
        assert!(CacheSize::try_from(-7i64).is_err());
    }

    #[test]
    fn test_cachesize_default() {
        assert_eq!(
            CacheSize::default().entries(),
            DEFAULT_CHANGESET_CACHE_ENTRIES
        );
    }

    #[test]
    fn test_config_minimal() {
        let config: DatabaseConfig = serde_json::from_value(serde_json::json!({
            "dbname": "openstreetmap",
            "charset": "utf8",
        }))
        .unwrap();
        assert_eq!(config.dbname, "openstreetmap");
        assert_eq!(config.host, None);
        assert_eq!(config.dbport, None);
        assert_eq!(config.cachesize, CacheSize::default());
        assert_eq!(config.max_connections, 0);
    }

    #[test]
    fn test_config_requires_dbname() {
        let result: Result<DatabaseConfig, _> =
            serde_json::from_value(serde_json::json!({ "charset": "utf8" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_config_full() {
        let config: DatabaseConfig = serde_json::from_value(serde_json::json!({
            "dbname": "openstreetmap",
            "host": "db.example.org",
            "username": "render",
            "password": "hunter2",
            "dbport": 5433,
            "charset": "utf8",
            "cachesize": "2000",
            "max_connections": 8,
            "statement_timeout_secs": 10,
        }))
        .unwrap();
        assert_eq!(config.dbport, Some(5433));
        assert_eq!(config.cachesize.entries(), 2000);
        assert_eq!(config.max_connections, 8);
    }
}
