//! Room Service Library
//!
//! Room access, settings resolution and meeting lifecycle for video
//! conferencing rooms hosted on a fleet of BigBlueButton-compatible servers:
//!
//! - Who may enter, start or moderate a room
//! - Which settings a meeting runs with (room type defaults, enforcement,
//!   room overrides)
//! - The idle -> running transition under concurrent requests against
//!   servers that occasionally fail
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/*.rs -> repositories/*.rs
//!                                        |
//!                                        +-> locks/*.rs, conferencing_client
//! ```
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `locks` - Per-room start lock (in-process or Redis)
//! - `models` - Data models
//! - `observability` - Metrics and HTTP metrics middleware
//! - `repositories` - Persistence traits and Postgres implementations
//! - `routes` - Axum router setup
//! - `services` - Access, settings, consent and the meeting lifecycle
//! - `tasks` - Background server health checks

pub mod config;
pub mod errors;
pub mod handlers;
pub mod locks;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod tasks;
