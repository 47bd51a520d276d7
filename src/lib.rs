//! Redis Hash Cache - typed record caching in remote hash tables
//!
//! Stores self-describing records inside named hash tables, expires them per
//! record on top of the table-wide key TTL, and sweeps expired records out.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod record;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheService, TableResolver};
pub use config::Config;
pub use error::{CacheError, Result};
pub use record::{BoxedValue, Record, RecordCodec, RecordValue, TypeRegistry};
pub use store::{HashStore, MemoryHashStore, RedisHashStore, WriteCondition};
pub use tasks::spawn_sweep_task;
