//! Observability module for the room service.
//!
//! Provides metrics definitions and the HTTP metrics middleware.

pub mod http_metrics;
pub mod metrics;
