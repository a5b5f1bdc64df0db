//! HTTP request handlers for the room service.

pub mod callbacks;
pub mod health;
pub mod metrics;

pub use callbacks::meeting_ended;
pub use health::health_check;
pub use metrics::metrics_handler;
