//! Cache Service Module
//!
//! Orchestrates the record lifecycle on top of a [`HashStore`]: writes refresh
//! the table TTL, reads drop records whose own lifetime has elapsed, and
//! sweeps reap expired records table-wide while isolating per-entry failures.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::cache::resolver::{ResolvedTable, TableResolver};
use crate::error::{CacheError, Result};
use crate::record::{Record, RecordCodec};
use crate::store::{scan_entries, HashEntry, HashStore, WriteCondition, SCAN_PAGE_SIZE};

// == Cache Service ==
/// Typed record cache over hash tables.
///
/// Holds no per-call state; the store is the only source of truth, so one
/// service can be shared freely across tasks.
#[derive(Clone)]
pub struct CacheService {
    store: Arc<dyn HashStore>,
    codec: RecordCodec,
    resolver: TableResolver,
}

impl CacheService {
    pub fn new(store: Arc<dyn HashStore>, codec: RecordCodec, resolver: TableResolver) -> Self {
        Self {
            store,
            codec,
            resolver,
        }
    }

    pub fn codec(&self) -> &RecordCodec {
        &self.codec
    }

    pub fn resolver(&self) -> &TableResolver {
        &self.resolver
    }

    // == Set ==
    /// Writes `record` under its key if `condition` allows it.
    ///
    /// The table TTL is refreshed before the write, even when the condition
    /// ends up skipping it.
    ///
    /// # Returns
    /// Whether the field was written.
    pub async fn set(
        &self,
        table_id: &str,
        record: &Record,
        condition: WriteCondition,
    ) -> Result<bool> {
        let table = self.resolver.resolve(table_id)?;
        let bytes = self.codec.encode(record)?;

        self.store
            .refresh_key_expiry(&table.name, table.key_ttl)
            .await?;
        let written = self
            .store
            .hash_set(&table.name, record.key(), &bytes, condition)
            .await?;

        debug!(table = %table.name, key = record.key(), ?condition, written, "Set record");
        Ok(written)
    }

    // == Set Many ==
    /// Writes `records` in order, refreshing the table TTL once.
    ///
    /// Stops at the first failure; earlier writes are not rolled back.
    pub async fn set_many(
        &self,
        table_id: &str,
        records: &[Record],
        condition: WriteCondition,
    ) -> Result<()> {
        let table = self.resolver.resolve(table_id)?;
        let encoded = records
            .iter()
            .map(|record| self.codec.encode(record).map(|bytes| (record.key(), bytes)))
            .collect::<Result<Vec<_>>>()?;

        self.store
            .refresh_key_expiry(&table.name, table.key_ttl)
            .await?;
        for (key, bytes) in &encoded {
            self.store
                .hash_set(&table.name, key, bytes, condition)
                .await?;
        }

        debug!(table = %table.name, count = encoded.len(), "Set records");
        Ok(())
    }

    // == Delete ==
    /// Removes `key` from the table. A missing key is not an error.
    pub async fn delete(&self, table_id: &str, key: &str) -> Result<()> {
        let table = self.resolve_with_key(table_id, key)?;
        let removed = self.store.hash_delete(&table.name, key).await?;
        debug!(table = %table.name, key, removed, "Deleted record");
        Ok(())
    }

    // == Get ==
    /// Reads the record stored under `key`.
    ///
    /// An expired record is deleted on the spot and reported as absent.
    /// A failure of that lazy delete is logged and otherwise ignored.
    ///
    /// # Errors
    /// `CacheError::MalformedRecord` if the stored bytes are not a valid
    /// record; store failures propagate as `CacheError::RemoteStore`.
    pub async fn get(&self, table_id: &str, key: &str) -> Result<Option<Record>> {
        let table = self.resolve_with_key(table_id, key)?;
        self.fetch_live(&table, key).await
    }

    // == Pop ==
    /// Reads and removes the record stored under `key`.
    ///
    /// Whenever a record is returned it is guaranteed to be gone from the
    /// store; a failed delete fails the whole call.
    pub async fn pop(&self, table_id: &str, key: &str) -> Result<Option<Record>> {
        let table = self.resolve_with_key(table_id, key)?;
        let Some(record) = self.fetch_live(&table, key).await? else {
            return Ok(None);
        };

        self.store.hash_delete(&table.name, key).await?;
        debug!(table = %table.name, key, "Popped record");
        Ok(Some(record))
    }

    // == Sweep ==
    /// Deletes every record of the table whose own lifetime has elapsed.
    ///
    /// Each entry is handled independently so one bad entry does not stop
    /// the scan.
    ///
    /// # Returns
    /// The number of deleted records when nothing failed.
    ///
    /// # Errors
    /// `CacheError::SweepFailed` carrying every failure once any entry (or
    /// a scan page) failed. The deletion count is not reported in that case.
    pub async fn delete_expired(&self, table_id: &str) -> Result<usize> {
        let table = self.resolver.resolve(table_id)?;
        let mut deleted = 0usize;
        let mut errors = Vec::new();

        {
            let mut entries =
                std::pin::pin!(scan_entries(self.store.as_ref(), &table.name, SCAN_PAGE_SIZE));
            while let Some(entry) = entries.next().await {
                let outcome = match entry {
                    Ok(entry) => self.sweep_entry(&table.name, entry).await,
                    Err(err) => Err(err),
                };

                match outcome {
                    Ok(true) => deleted += 1,
                    Ok(false) => {}
                    Err(err) => {
                        warn!(table = %table.name, error = %err, "Sweep entry failed");
                        errors.push(err);
                    }
                }
            }
        }

        if !errors.is_empty() {
            warn!(table = %table.name, errors = errors.len(), "Sweep finished with failures");
            return Err(CacheError::SweepFailed {
                table: table.name,
                errors,
            });
        }

        info!(table = %table.name, deleted, "Swept expired records");
        Ok(deleted)
    }

    // == Internal Helpers ==
    fn resolve_with_key(&self, table_id: &str, key: &str) -> Result<ResolvedTable> {
        let table = self.resolver.resolve(table_id)?;
        if key.trim().is_empty() {
            return Err(CacheError::Validation(
                "Record key cannot be empty".to_string(),
            ));
        }
        Ok(table)
    }

    async fn fetch_live(&self, table: &ResolvedTable, key: &str) -> Result<Option<Record>> {
        let Some(bytes) = self.store.hash_get(&table.name, key).await? else {
            debug!(table = %table.name, key, "Cache miss");
            return Ok(None);
        };

        let record = self.codec.decode(&bytes)?;
        if !record.is_expired() {
            debug!(table = %table.name, key, "Cache hit");
            return Ok(Some(record));
        }

        match self.store.hash_delete(&table.name, key).await {
            Ok(_) => debug!(table = %table.name, key, "Lazily deleted expired record"),
            Err(err) => warn!(
                table = %table.name,
                key,
                error = %err,
                "Failed to delete expired record"
            ),
        }
        Ok(None)
    }

    /// Returns whether the entry was expired and actually deleted.
    async fn sweep_entry(&self, table: &str, entry: HashEntry) -> Result<bool> {
        let HashEntry { field, value } = entry;
        let labelled = |source: CacheError| CacheError::SweepEntry {
            table: table.to_string(),
            field: field.clone(),
            source: Box::new(source),
        };

        let record = self.codec.decode(&value).map_err(labelled)?;
        if !record.is_expired() {
            return Ok(false);
        }
        self.store
            .hash_delete(table, &field)
            .await
            .map_err(labelled)
    }
}

impl std::fmt::Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("codec", &self.codec)
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}
