//! Table Resolver Module
//!
//! Maps logical table ids onto physical hash table names and key-level TTLs.

use std::collections::HashMap;
use std::time::Duration;

use crate::config::{Config, HashTableConfig};
use crate::error::{CacheError, Result};

/// Key-level TTL of tables without a configured lifetime (24 hours)
pub const DEFAULT_KEY_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Physical coordinates of a logical table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTable {
    pub name: String,
    pub key_ttl: Duration,
}

// == Table Resolver ==
/// Resolves table ids using configured overrides, falling back to the id
/// itself as the table name.
#[derive(Debug, Clone, Default)]
pub struct TableResolver {
    tables: HashMap<String, HashTableConfig>,
}

impl TableResolver {
    pub fn new(tables: HashMap<String, HashTableConfig>) -> Self {
        Self { tables }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.hash_tables.clone())
    }

    /// Resolves `table_id` to its physical name and key TTL.
    ///
    /// # Errors
    /// `CacheError::Validation` if the id is blank.
    pub fn resolve(&self, table_id: &str) -> Result<ResolvedTable> {
        if table_id.trim().is_empty() {
            return Err(CacheError::Validation(
                "Table id cannot be empty".to_string(),
            ));
        }

        let resolved = match self.tables.get(table_id) {
            Some(table) => ResolvedTable {
                name: if table.table_name.trim().is_empty() {
                    table_id.to_string()
                } else {
                    table.table_name.clone()
                },
                key_ttl: table.key_lifetime.unwrap_or(DEFAULT_KEY_TTL),
            },
            None => ResolvedTable {
                name: table_id.to_string(),
                key_ttl: DEFAULT_KEY_TTL,
            },
        };
        Ok(resolved)
    }

    /// Ids of the configured tables that ask for expired-record sweeping.
    pub fn sweep_table_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .tables
            .iter()
            .filter(|(_, table)| table.sweep_expired)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }
}
