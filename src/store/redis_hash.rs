//! Redis Hash Store Module
//!
//! [`HashStore`] over a Redis server. Uses a [`ConnectionManager`], which
//! multiplexes one connection across callers and reconnects on failure.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use tracing::{debug, info};

use crate::error::Result;
use crate::store::{HashEntry, HashStore, ScanPage, WriteCondition};

/// HSET that only applies when the field already exists. Returns 1 if written.
const SET_IF_EXISTS_LUA: &str = r#"
if redis.call('HEXISTS', KEYS[1], ARGV[1]) == 1 then
    redis.call('HSET', KEYS[1], ARGV[1], ARGV[2])
    return 1
end
return 0
"#;

/// Cursor value Redis uses for both the start and the end of a scan
const SCAN_DONE: &str = "0";

// == Redis Hash Store ==
/// Redis-backed hash tables.
#[derive(Clone)]
pub struct RedisHashStore {
    connection: ConnectionManager,
    set_if_exists: Script,
}

impl RedisHashStore {
    /// Connects to the server named by `connection_string`
    /// (e.g. `redis://127.0.0.1:6379/0`).
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let client = redis::Client::open(connection_string)?;
        let connection = ConnectionManager::new(client).await?;
        info!("Connected to Redis");
        Ok(Self::from_manager(connection))
    }

    /// Wraps an existing connection manager.
    pub fn from_manager(connection: ConnectionManager) -> Self {
        Self {
            connection,
            set_if_exists: Script::new(SET_IF_EXISTS_LUA),
        }
    }

    fn conn(&self) -> ConnectionManager {
        self.connection.clone()
    }
}

#[async_trait]
impl HashStore for RedisHashStore {
    async fn refresh_key_expiry(&self, table: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn();
        let millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX).max(1);
        let applied: bool = conn.pexpire(table, millis).await?;
        debug!(table, ttl_ms = millis, applied, "Refreshed table key expiry");
        Ok(())
    }

    async fn hash_set(
        &self,
        table: &str,
        field: &str,
        value: &[u8],
        condition: WriteCondition,
    ) -> Result<bool> {
        let mut conn = self.conn();
        match condition {
            WriteCondition::Always => {
                let _: i64 = conn.hset(table, field, value).await?;
                Ok(true)
            }
            WriteCondition::IfNotExists => {
                let written: bool = conn.hset_nx(table, field, value).await?;
                Ok(written)
            }
            WriteCondition::IfExists => {
                let written: i64 = self
                    .set_if_exists
                    .key(table)
                    .arg(field)
                    .arg(value)
                    .invoke_async(&mut conn)
                    .await?;
                Ok(written == 1)
            }
        }
    }

    async fn hash_delete(&self, table: &str, field: &str) -> Result<bool> {
        let mut conn = self.conn();
        let removed: i64 = conn.hdel(table, field).await?;
        Ok(removed > 0)
    }

    async fn hash_get(&self, table: &str, field: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn();
        let value: Option<Vec<u8>> = conn.hget(table, field).await?;
        Ok(value)
    }

    async fn hash_scan_page(
        &self,
        table: &str,
        cursor: Option<&str>,
        count: usize,
    ) -> Result<ScanPage> {
        let mut conn = self.conn();
        let (next, pairs): (String, Vec<(String, Vec<u8>)>) = redis::cmd("HSCAN")
            .arg(table)
            .arg(cursor.unwrap_or(SCAN_DONE))
            .arg("COUNT")
            .arg(count.max(1))
            .query_async(&mut conn)
            .await?;

        Ok(ScanPage {
            entries: pairs
                .into_iter()
                .map(|(field, value)| HashEntry { field, value })
                .collect(),
            next_cursor: (next != SCAN_DONE).then_some(next),
        })
    }
}

impl std::fmt::Debug for RedisHashStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisHashStore").finish_non_exhaustive()
    }
}
