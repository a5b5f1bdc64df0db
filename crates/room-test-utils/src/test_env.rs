//! Lifecycle engine wired to in-memory fakes.

use crate::conferencing::MockConferencingClient;
use crate::fixtures;
use crate::store::InMemoryStore;
use room_service::locks::LocalLockProvider;
use room_service::services::{CallbackSigner, LifecycleConfig, MeetingLifecycle};
use room_service::tasks::ServerHealthChecker;
use std::sync::Arc;

/// A [`MeetingLifecycle`] over an [`InMemoryStore`], a
/// [`MockConferencingClient`] and an in-process lock.
///
/// The fakes are shared with the engine, so they can be seeded and
/// inspected before or after a call.
///
/// # Example
/// ```rust,ignore
/// let env = TestEnv::new();
/// env.seed_room("abc-def-123");
/// let url = env.lifecycle.start(&room_id, &request).await?;
/// assert_eq!(env.conferencing.create_calls(), 1);
/// ```
pub struct TestEnv {
    pub store: Arc<InMemoryStore>,
    pub conferencing: Arc<MockConferencingClient>,
    pub locks: Arc<LocalLockProvider>,
    pub signer: CallbackSigner,
    pub config: LifecycleConfig,
    pub lifecycle: Arc<MeetingLifecycle>,
}

/// Owner of the rooms created by [`TestEnv::seed_room`].
pub const OWNER_ID: i64 = 1;

impl TestEnv {
    pub fn new() -> Self {
        Self::with_config(fixtures::lifecycle_config())
    }

    pub fn with_config(config: LifecycleConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let conferencing = Arc::new(MockConferencingClient::accepting());
        let locks = Arc::new(LocalLockProvider::new());
        let signer = CallbackSigner::new(
            fixtures::TEST_APP_KEY.as_bytes(),
            config.public_url.clone(),
        );

        let lifecycle = Arc::new(MeetingLifecycle::new(
            store.clone(),
            store.clone(),
            store.clone(),
            conferencing.clone(),
            locks.clone(),
            signer.clone(),
            config.clone(),
        ));

        Self {
            store,
            conferencing,
            locks,
            signer,
            config,
            lifecycle,
        }
    }

    /// Room type 1 on pool 1, one online server, and a room owned by
    /// [`OWNER_ID`].
    pub fn seed_room(&self, code: &str) {
        self.store.insert_room_type(fixtures::room_type(1, 1));
        if self.store.server(common::types::ServerId(1)).is_none() {
            self.store.insert_server(fixtures::server(1, 1));
        }
        self.store.insert_room(fixtures::room(code, OWNER_ID, 1));
    }

    /// Health checker over the same fakes.
    pub fn health_checker(&self, offline_after_failures: u32) -> ServerHealthChecker {
        ServerHealthChecker::new(
            self.store.clone(),
            self.store.clone(),
            self.conferencing.clone(),
            offline_after_failures,
            self.config.request_timeout,
        )
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
