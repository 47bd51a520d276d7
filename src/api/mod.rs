//! API Module
//!
//! HTTP handlers and routing for the demo cache host.
//!
//! # Endpoints
//! - `PUT /tables/:table_id/records` - Store one record
//! - `PUT /tables/:table_id/batch` - Store several records
//! - `GET /tables/:table_id/records/:key` - Read a record
//! - `DELETE /tables/:table_id/records/:key` - Delete a record
//! - `POST /tables/:table_id/records/:key/pop` - Read and delete a record
//! - `POST /tables/:table_id/sweep` - Sweep expired records
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
