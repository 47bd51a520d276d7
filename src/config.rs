//! Configuration Module
//!
//! Loads the Redis connection settings and per-table options from an optional
//! JSON file and environment variables.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::error::{CacheError, Result};
use crate::record::timespan;

/// Options for one logical hash table.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashTableConfig {
    /// Physical name of the hash table in the store
    #[serde(default)]
    pub table_name: String,
    /// Key-level TTL applied to the whole table on every write
    #[serde(
        default,
        alias = "keyLifeTime",
        deserialize_with = "deserialize_optional_duration"
    )]
    pub key_lifetime: Option<Duration>,
    /// Whether the background task should sweep expired records
    #[serde(default, alias = "needDeleteExpiredRecords")]
    pub sweep_expired: bool,
}

/// Cache configuration.
///
/// All values can be set in a JSON file and overridden by environment
/// variables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Redis connection string; `memory://` selects the in-memory store
    #[serde(default)]
    pub connection_string: String,
    /// Table options by logical table id
    #[serde(default, alias = "hashTablesOptions")]
    pub hash_tables: HashMap<String, HashTableConfig>,
    /// HTTP server port of the demo host
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    /// Interval in seconds between background sweeps
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_server_port() -> u16 {
    3000
}

fn default_sweep_interval() -> u64 {
    60
}

impl Config {
    /// Creates a new Config from the environment.
    ///
    /// # Environment Variables
    /// - `CACHE_CONFIG_FILE` - Path to a JSON config file (optional)
    /// - `REDIS_CONNECTION_STRING` - Overrides `connectionString`
    /// - `SERVER_PORT` - Overrides `serverPort` (default: 3000)
    /// - `SWEEP_INTERVAL` - Overrides `sweepIntervalSecs` (default: 60)
    ///
    /// A `.env` file in the working directory is loaded first if present.
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file loaded: {}", e);
        }

        let mut config = match env::var("CACHE_CONFIG_FILE") {
            Ok(path) => {
                let text = fs::read_to_string(&path).map_err(|e| {
                    CacheError::Configuration(format!("Cannot read '{}': {}", path, e))
                })?;
                Self::parse(&text)?
            }
            Err(_) => Self::default(),
        };

        if let Ok(connection_string) = env::var("REDIS_CONNECTION_STRING") {
            config.connection_string = connection_string;
        }
        if let Some(port) = env::var("SERVER_PORT").ok().and_then(|v| v.parse().ok()) {
            config.server_port = port;
        }
        if let Some(interval) = env::var("SWEEP_INTERVAL").ok().and_then(|v| v.parse().ok()) {
            config.sweep_interval_secs = interval;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a JSON configuration document.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config = Self::parse(text)?;
        config.validate()?;
        Ok(config)
    }

    fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| CacheError::Configuration(format!("Invalid configuration: {}", e)))
    }

    // == Validate ==
    /// Checks that every required property is filled in.
    pub fn validate(&self) -> Result<()> {
        if self.connection_string.trim().is_empty() {
            return Err(CacheError::Configuration(
                "Required property 'connectionString' is empty".to_string(),
            ));
        }

        let mut missing: Vec<&str> = self
            .hash_tables
            .iter()
            .filter(|(_, table)| table.table_name.trim().is_empty())
            .map(|(id, _)| id.as_str())
            .collect();
        if !missing.is_empty() {
            missing.sort_unstable();
            return Err(CacheError::Configuration(format!(
                "Required property 'tableName' is empty for table id(s): '{}'",
                missing.join("','")
            )));
        }

        let mut zero_ttl: Vec<&str> = self
            .hash_tables
            .iter()
            .filter(|(_, table)| table.key_lifetime.is_some_and(|ttl| ttl.is_zero()))
            .map(|(id, _)| id.as_str())
            .collect();
        if !zero_ttl.is_empty() {
            zero_ttl.sort_unstable();
            return Err(CacheError::Configuration(format!(
                "Property 'keyLifeTime' must be greater than zero for table id(s): '{}'",
                zero_ttl.join("','")
            )));
        }

        if self.sweep_interval_secs == 0 {
            return Err(CacheError::Configuration(
                "Property 'sweepIntervalSecs' must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connection_string: String::new(),
            hash_tables: HashMap::new(),
            server_port: default_server_port(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn deserialize_optional_duration<'de, D>(deserializer: D) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|text| timespan::parse_human(&text).map_err(serde::de::Error::custom))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.connection_string.is_empty());
        assert!(config.hash_tables.is_empty());
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.sweep_interval_secs, 60);
    }

    #[test]
    fn test_from_json_full() {
        let config = Config::from_json_str(
            r#"{
                "connectionString": "redis://localhost:6379",
                "hashTables": {
                    "sessions": { "tableName": "sess_v2", "keyLifeTime": "2h", "sweepExpired": true },
                    "profiles": { "tableName": "profiles_v1", "keyLifetime": "1.00:00:00" }
                },
                "serverPort": 8080
            }"#,
        )
        .unwrap();

        assert_eq!(config.server_port, 8080);
        let sessions = &config.hash_tables["sessions"];
        assert_eq!(sessions.table_name, "sess_v2");
        assert_eq!(sessions.key_lifetime, Some(Duration::from_secs(7200)));
        assert!(sessions.sweep_expired);
        assert_eq!(
            config.hash_tables["profiles"].key_lifetime,
            Some(Duration::from_secs(86_400))
        );
    }

    #[test]
    fn test_legacy_option_names_accepted() {
        let config = Config::from_json_str(
            r#"{
                "connectionString": "redis://localhost",
                "hashTablesOptions": {
                    "t": { "tableName": "t1", "needDeleteExpiredRecords": true }
                }
            }"#,
        )
        .unwrap();

        assert!(config.hash_tables["t"].sweep_expired);
        assert!(config.hash_tables["t"].key_lifetime.is_none());
    }

    #[test]
    fn test_missing_connection_string_rejected() {
        let result = Config::from_json_str(r#"{ "hashTables": {} }"#);
        assert!(matches!(result, Err(CacheError::Configuration(_))));
    }

    #[test]
    fn test_missing_table_name_rejected() {
        let result = Config::from_json_str(
            r#"{
                "connectionString": "redis://localhost",
                "hashTables": { "b": {}, "a": { "tableName": " " } }
            }"#,
        );

        match result {
            Err(CacheError::Configuration(msg)) => assert!(msg.contains("'a','b'")),
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_key_lifetime_rejected() {
        for lifetime in ["0s", "00:00:00"] {
            let result = Config::from_json_str(&format!(
                r#"{{
                    "connectionString": "redis://localhost",
                    "hashTables": {{ "a": {{ "tableName": "a", "keyLifeTime": "{}" }} }}
                }}"#,
                lifetime
            ));

            match result {
                Err(CacheError::Configuration(msg)) => {
                    assert!(msg.contains("keyLifeTime"));
                    assert!(msg.contains("'a'"));
                }
                other => panic!("expected configuration error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_bad_duration_rejected() {
        let result = Config::from_json_str(
            r#"{
                "connectionString": "redis://localhost",
                "hashTables": { "a": { "tableName": "a", "keyLifeTime": "soon" } }
            }"#,
        );
        assert!(matches!(result, Err(CacheError::Configuration(_))));
    }
}
