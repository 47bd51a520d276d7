//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Expired record sweep: reaps records whose own lifetime has elapsed from
//!   every table configured for it

mod sweep;

pub use sweep::spawn_sweep_task;
