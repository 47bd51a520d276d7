//! Request DTOs for the cache API
//!
//! Defines the structure of incoming HTTP request bodies.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::record::Record;
use crate::store::WriteCondition;

/// One record as supplied by an HTTP client.
///
/// # Fields
/// - `key`: Field key inside the hash table
/// - `value`: Any JSON payload, stored with the `serde_json::Value` tag
/// - `lifetimeSecs`: Optional per-record lifetime in seconds
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordInput {
    pub key: String,
    pub value: JsonValue,
    #[serde(default)]
    pub lifetime_secs: Option<u64>,
}

impl RecordInput {
    /// Builds a record stamped with the current time.
    pub fn into_record(self) -> Result<Record> {
        Record::new(
            self.key,
            self.value,
            self.lifetime_secs.map(Duration::from_secs),
        )
    }
}

/// Request body for PUT /tables/:table_id/records
#[derive(Debug, Clone, Deserialize)]
pub struct SetRecordRequest {
    #[serde(flatten)]
    pub record: RecordInput,
    /// Write precondition, `always` when omitted
    #[serde(default)]
    pub condition: WriteCondition,
}

impl SetRecordRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.record.key.trim().is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        None
    }
}

/// Request body for PUT /tables/:table_id/batch
#[derive(Debug, Clone, Deserialize)]
pub struct SetManyRequest {
    pub records: Vec<RecordInput>,
    #[serde(default)]
    pub condition: WriteCondition,
}

impl SetManyRequest {
    /// Validates the request data
    ///
    /// Returns an error message naming the first blank key, None if valid.
    pub fn validate(&self) -> Option<String> {
        self.records
            .iter()
            .position(|record| record.key.trim().is_empty())
            .map(|index| format!("Key of record #{} cannot be empty", index))
    }
}
