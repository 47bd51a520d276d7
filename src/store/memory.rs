//! Memory Hash Store Module
//!
//! In-process [`HashStore`] used by tests and by the demo host when no Redis
//! server is configured. Mirrors Redis semantics where the cache relies on
//! them: key expiry applies to the whole table, expiring a missing key is a
//! no-op, and a table disappears once its last field is deleted.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{CacheError, Result};
use crate::store::{HashEntry, HashStore, ScanPage, WriteCondition};

// == Store Operation ==
/// Primitive operations of the store, used to inject failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    RefreshKeyExpiry,
    HashSet,
    HashDelete,
    HashGet,
    HashScan,
}

#[derive(Debug, Default)]
struct MemoryTable {
    /// Ordered so scan cursors can resume after the last returned field
    fields: BTreeMap<String, Vec<u8>>,
    expires_at: Option<Instant>,
}

impl MemoryTable {
    fn is_expired(&self) -> bool {
        matches!(self.expires_at, Some(expires) if Instant::now() >= expires)
    }
}

// == Memory Hash Store ==
/// In-memory hash tables with call counting and failure injection.
#[derive(Debug, Default)]
pub struct MemoryHashStore {
    tables: RwLock<HashMap<String, MemoryTable>>,
    calls: AtomicUsize,
    failing: Mutex<HashSet<StoreOperation>>,
}

impl MemoryHashStore {
    pub fn new() -> Self {
        Self::default()
    }

    // == Test Controls ==
    /// Makes every subsequent call of `operation` fail with a
    /// [`CacheError::RemoteStore`].
    pub fn fail_on(&self, operation: StoreOperation) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(operation);
    }

    /// Clears all injected failures.
    pub fn heal(&self) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of store operations issued so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Writes raw bytes without counting a call or touching expiry.
    pub async fn insert_raw(&self, table: &str, field: &str, value: Vec<u8>) {
        let mut tables = self.tables.write().await;
        tables
            .entry(table.to_string())
            .or_default()
            .fields
            .insert(field.to_string(), value);
    }

    /// Remaining key-level TTL of a table, `None` if it has none or is absent.
    pub async fn ttl(&self, table: &str) -> Option<Duration> {
        let tables = self.tables.read().await;
        tables
            .get(table)
            .filter(|t| !t.is_expired())
            .and_then(|t| t.expires_at)
            .map(|expires| expires.saturating_duration_since(Instant::now()))
    }

    /// Number of live fields in a table.
    pub async fn len(&self, table: &str) -> usize {
        let tables = self.tables.read().await;
        tables
            .get(table)
            .filter(|t| !t.is_expired())
            .map_or(0, |t| t.fields.len())
    }

    fn begin(&self, operation: StoreOperation) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if failing.contains(&operation) {
            return Err(CacheError::RemoteStore(format!(
                "injected failure for {:?}",
                operation
            )));
        }
        Ok(())
    }

    /// Drops `table` if its key has expired.
    fn purge_if_expired(tables: &mut HashMap<String, MemoryTable>, table: &str) {
        if tables.get(table).is_some_and(MemoryTable::is_expired) {
            tables.remove(table);
            debug!(table, "Memory store expired table key");
        }
    }
}

#[async_trait]
impl HashStore for MemoryHashStore {
    async fn refresh_key_expiry(&self, table: &str, ttl: Duration) -> Result<()> {
        self.begin(StoreOperation::RefreshKeyExpiry)?;
        let mut tables = self.tables.write().await;
        Self::purge_if_expired(&mut tables, table);

        if let Some(entry) = tables.get_mut(table) {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }

    async fn hash_set(
        &self,
        table: &str,
        field: &str,
        value: &[u8],
        condition: WriteCondition,
    ) -> Result<bool> {
        self.begin(StoreOperation::HashSet)?;
        let mut tables = self.tables.write().await;
        Self::purge_if_expired(&mut tables, table);

        let exists = tables
            .get(table)
            .is_some_and(|t| t.fields.contains_key(field));
        let allowed = match condition {
            WriteCondition::Always => true,
            WriteCondition::IfNotExists => !exists,
            WriteCondition::IfExists => exists,
        };

        if allowed {
            tables
                .entry(table.to_string())
                .or_default()
                .fields
                .insert(field.to_string(), value.to_vec());
        }
        Ok(allowed)
    }

    async fn hash_delete(&self, table: &str, field: &str) -> Result<bool> {
        self.begin(StoreOperation::HashDelete)?;
        let mut tables = self.tables.write().await;
        Self::purge_if_expired(&mut tables, table);

        let Some(entry) = tables.get_mut(table) else {
            return Ok(false);
        };
        let removed = entry.fields.remove(field).is_some();
        if entry.fields.is_empty() {
            tables.remove(table);
        }
        Ok(removed)
    }

    async fn hash_get(&self, table: &str, field: &str) -> Result<Option<Vec<u8>>> {
        self.begin(StoreOperation::HashGet)?;
        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .filter(|t| !t.is_expired())
            .and_then(|t| t.fields.get(field).cloned()))
    }

    async fn hash_scan_page(
        &self,
        table: &str,
        cursor: Option<&str>,
        count: usize,
    ) -> Result<ScanPage> {
        self.begin(StoreOperation::HashScan)?;
        let tables = self.tables.read().await;
        let Some(entry) = tables.get(table).filter(|t| !t.is_expired()) else {
            return Ok(ScanPage::default());
        };

        let lower = match cursor {
            Some(last) => Bound::Excluded(last.to_string()),
            None => Bound::Unbounded,
        };
        let mut remaining = entry.fields.range((lower, Bound::Unbounded));

        let entries: Vec<HashEntry> = remaining
            .by_ref()
            .take(count.max(1))
            .map(|(field, value)| HashEntry {
                field: field.clone(),
                value: value.clone(),
            })
            .collect();

        let next_cursor = match (remaining.next(), entries.last()) {
            (Some(_), Some(last)) => Some(last.field.clone()),
            _ => None,
        };

        Ok(ScanPage {
            entries,
            next_cursor,
        })
    }
}
