//! Cache Module
//!
//! Typed record cache over remote hash tables: table resolution and the
//! set/get/pop/delete/sweep operations.

mod resolver;
mod service;


// Re-export public types
pub use resolver::{ResolvedTable, TableResolver, DEFAULT_KEY_TTL};
pub use service::CacheService;
