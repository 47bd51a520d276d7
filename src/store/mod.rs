//! Store Module
//!
//! The hash-table contract the cache consumes from its backing key-value
//! store, plus a Redis implementation and an in-memory one.

mod memory;
mod redis_hash;

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};

use crate::error::Result;

// Re-export public types
pub use self::memory::{MemoryHashStore, StoreOperation};
pub use self::redis_hash::RedisHashStore;

/// Number of fields requested per scan round trip
pub const SCAN_PAGE_SIZE: usize = 100;

// == Write Condition ==
/// Precondition gating a hash field write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WriteCondition {
    /// Write unconditionally
    #[default]
    Always,
    /// Write only if the field does not exist yet
    IfNotExists,
    /// Write only if the field already exists
    IfExists,
}

// == Hash Entry ==
/// A raw field/value pair read from a hash table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashEntry {
    pub field: String,
    pub value: Vec<u8>,
}

/// One page of a cursor-driven hash scan.
#[derive(Debug, Clone, Default)]
pub struct ScanPage {
    pub entries: Vec<HashEntry>,
    /// Cursor to resume from, `None` once the scan is complete
    pub next_cursor: Option<String>,
}

// == Hash Store Trait ==
/// Primitive hash-table operations of the backing store.
///
/// Implementations are shared across concurrent calls; retries and
/// connection management are their own concern.
#[async_trait]
pub trait HashStore: Send + Sync {
    /// Sets the key-level TTL of the whole hash table.
    async fn refresh_key_expiry(&self, table: &str, ttl: Duration) -> Result<()>;

    /// Writes `value` under `field` if `condition` allows it.
    ///
    /// Returns whether the write happened.
    async fn hash_set(
        &self,
        table: &str,
        field: &str,
        value: &[u8],
        condition: WriteCondition,
    ) -> Result<bool>;

    /// Removes `field`. Returns whether it existed.
    async fn hash_delete(&self, table: &str, field: &str) -> Result<bool>;

    async fn hash_get(&self, table: &str, field: &str) -> Result<Option<Vec<u8>>>;

    /// Fetches the next page of fields, starting a new scan when `cursor` is
    /// `None`.
    async fn hash_scan_page(
        &self,
        table: &str,
        cursor: Option<&str>,
        count: usize,
    ) -> Result<ScanPage>;
}

// == Scan Stream ==
struct ScanState {
    cursor: Option<String>,
    buffered: VecDeque<HashEntry>,
    exhausted: bool,
}

/// Lazily iterates every field of `table`, fetching one page at a time.
///
/// A page fetch failure is yielded once and ends the stream. Dropping the
/// stream early releases nothing server-side since cursors are stateless.
pub fn scan_entries<'a>(
    store: &'a dyn HashStore,
    table: &'a str,
    page_size: usize,
) -> impl Stream<Item = Result<HashEntry>> + Send + 'a {
    let state = ScanState {
        cursor: None,
        buffered: VecDeque::new(),
        exhausted: false,
    };

    stream::unfold(state, move |mut state| async move {
        loop {
            if let Some(entry) = state.buffered.pop_front() {
                return Some((Ok(entry), state));
            }
            if state.exhausted {
                return None;
            }

            match store
                .hash_scan_page(table, state.cursor.as_deref(), page_size)
                .await
            {
                Ok(page) => {
                    state.exhausted = page.next_cursor.is_none();
                    state.cursor = page.next_cursor;
                    state.buffered.extend(page.entries);
                }
                Err(err) => {
                    state.exhausted = true;
                    return Some((Err(err), state));
                }
            }
        }
    })
}
