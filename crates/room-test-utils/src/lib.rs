//! # Room Test Utilities
//!
//! Shared test utilities for the room service.
//!
//! This crate provides:
//! - In-memory repositories (`InMemoryStore`)
//! - A scripted conferencing client (`MockConferencingClient`)
//! - Fixtures for rooms, servers, users and configuration
//! - `TestEnv`, the lifecycle engine wired to the fakes above
//! - Server test harness (`TestRoomServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use room_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<()> {
//!     let env = TestEnv::new();
//!     env.seed_room("abc-def-123");
//!
//!     let owner = fixtures::user(OWNER_ID, "Owner");
//!     let url = env
//!         .lifecycle
//!         .start(&RoomId::new("abc-def-123"), &fixtures::user_request(&owner))
//!         .await?;
//!
//!     assert_eq!(env.conferencing.create_calls(), 1);
//!     Ok(())
//! }
//! ```

pub mod conferencing;
pub mod fixtures;
pub mod server_harness;
pub mod store;
pub mod test_env;

// Re-export commonly used items
pub use conferencing::{InfoResponse, MockConferencingClient};
pub use server_harness::TestRoomServer;
pub use store::InMemoryStore;
pub use test_env::{TestEnv, OWNER_ID};
