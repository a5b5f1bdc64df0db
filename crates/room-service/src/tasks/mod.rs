//! Background tasks for the room service.
//!
//! # Tasks
//!
//! - `server_health_checker` - Polls conferencing servers and updates their
//!   status, load and meeting usage

pub mod server_health_checker;

pub use server_health_checker::{start_server_health_checker, ServerHealthChecker};
