//! Common types shared across the room service crates.

#![warn(clippy::pedantic)]

/// Identifier newtypes for rooms, meetings, servers and users
pub mod types;

/// Module for secret types that prevent accidental logging
pub mod secret;
