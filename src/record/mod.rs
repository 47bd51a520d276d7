//! Record Module
//!
//! The self-describing envelope stored in hash table fields: the record
//! itself, its polymorphic payload, the type registry and the wire codec.

mod codec;
mod entry;
mod finite;
pub mod timespan;
mod value;


// Re-export public types
pub use codec::RecordCodec;
pub use entry::Record;
pub use value::{BoxedValue, RecordValue, TypeRegistry};
