//! Response DTOs for the cache API
//!
//! Defines the structure of outgoing HTTP response bodies.

use chrono::SecondsFormat;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::record::{timespan, Record};

/// A record as returned by GET and pop.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResponse {
    pub key: String,
    /// `null` when the stored type tag is unknown to this process
    pub value: Option<JsonValue>,
    pub type_name: String,
    pub set_date: String,
    pub expiry_date: Option<String>,
    /// Lifetime in `[d.]hh:mm:ss[.fffffff]` form
    pub lifetime: Option<String>,
}

impl From<&Record> for RecordResponse {
    fn from(record: &Record) -> Self {
        Self {
            key: record.key().to_string(),
            value: record.value().and_then(|value| value.to_json().ok()),
            type_name: record.type_name().to_string(),
            set_date: record.set_date().to_rfc3339_opts(SecondsFormat::AutoSi, true),
            expiry_date: record
                .expiry_date()
                .map(|date| date.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            lifetime: record.lifetime().map(timespan::format),
        }
    }
}

/// Response body for the set operation
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    pub key: String,
    /// Whether the write condition allowed the write
    pub written: bool,
}

impl SetResponse {
    pub fn new(key: impl Into<String>, written: bool) -> Self {
        Self {
            key: key.into(),
            written,
        }
    }
}

/// Response body for the batch set operation
#[derive(Debug, Clone, Serialize)]
pub struct SetManyResponse {
    /// Success message
    pub message: String,
    pub count: usize,
}

impl SetManyResponse {
    pub fn new(count: usize) -> Self {
        Self {
            message: format!("{} record(s) processed", count),
            count,
        }
    }
}

/// Response body for the DELETE operation
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// The key that was deleted
    pub key: String,
}

impl DeleteResponse {
    /// Creates a new DeleteResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }
}

/// Response body for the sweep operation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResponse {
    pub table_id: String,
    /// Number of expired records removed
    pub deleted: usize,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
