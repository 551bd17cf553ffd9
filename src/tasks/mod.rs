//! Background Tasks Module
//!
//! Periodic maintenance tasks that run independently of foreground cache
//! operations.

mod sweep;

pub use sweep::spawn_sweep_task;
