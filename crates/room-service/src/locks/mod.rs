//! Per-room mutual exclusion.
//!
//! A lock is a key with an owner token and a TTL. Release only succeeds for
//! the owner, so a holder whose lease expired cannot free a lock someone else
//! has since taken.
//!
//! - [`LocalLockProvider`] - in-process, for single-instance deployments
//! - [`RedisLockProvider`] - shared across instances

pub mod local;
pub mod lua_scripts;
pub mod redis;

pub use local::LocalLockProvider;
pub use self::redis::RedisLockProvider;

use crate::errors::RoomError;
use async_trait::async_trait;
use ring::rand::{SecureRandom, SystemRandom};
use std::time::Duration;
use tokio::time::Instant;

/// Delay between acquisition attempts while a lock is held elsewhere.
pub const RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// A held lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockLease {
    pub key: String,
    /// Random owner token, compared on release.
    pub token: String,
}

#[async_trait]
pub trait LockProvider: Send + Sync {
    /// Take the lock if it is free. `Ok(None)` means someone holds it.
    async fn try_acquire(&self, key: &str, ttl: Duration) -> Result<Option<LockLease>, RoomError>;

    /// Release a lease. Releasing an expired or foreign lease is a no-op.
    async fn release(&self, lease: &LockLease) -> Result<(), RoomError>;
}

/// Key of a room's start lock.
pub fn room_start_key(room_id: &str) -> String {
    format!("room:{room_id}:start")
}

/// Generate an owner token.
pub(crate) fn new_token() -> Result<String, RoomError> {
    let mut bytes = [0u8; 16];
    SystemRandom::new().fill(&mut bytes).map_err(|_| {
        tracing::error!(target: "rooms.locks", "Failed to generate lock token");
        RoomError::Internal
    })?;
    Ok(hex::encode(bytes))
}

/// Retry acquisition until `wait` has elapsed. `Ok(None)` on timeout.
pub async fn acquire_with_timeout(
    provider: &dyn LockProvider,
    key: &str,
    ttl: Duration,
    wait: Duration,
) -> Result<Option<LockLease>, RoomError> {
    let deadline = Instant::now() + wait;
    loop {
        if let Some(lease) = provider.try_acquire(key, ttl).await? {
            return Ok(Some(lease));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        tokio::time::sleep(RETRY_INTERVAL.min(deadline - now)).await;
    }
}
