//! In-process lock provider.

use super::{new_token, LockLease, LockProvider};
use crate::errors::RoomError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug)]
struct Held {
    token: String,
    expires_at: Instant,
}

/// Locks held in a TTL map. Only excludes tasks within this process.
#[derive(Debug, Default)]
pub struct LocalLockProvider {
    held: Mutex<HashMap<String, Held>>,
}

impl LocalLockProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockProvider for LocalLockProvider {
    async fn try_acquire(&self, key: &str, ttl: Duration) -> Result<Option<LockLease>, RoomError> {
        let mut held = self.held.lock().await;
        let now = Instant::now();

        if held.get(key).is_some_and(|h| h.expires_at > now) {
            return Ok(None);
        }

        let token = new_token()?;
        held.insert(
            key.to_string(),
            Held {
                token: token.clone(),
                expires_at: now + ttl,
            },
        );
        Ok(Some(LockLease {
            key: key.to_string(),
            token,
        }))
    }

    async fn release(&self, lease: &LockLease) -> Result<(), RoomError> {
        let mut held = self.held.lock().await;
        if held.get(&lease.key).is_some_and(|h| h.token == lease.token) {
            held.remove(&lease.key);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(10);

    #[tokio::test]
    async fn test_second_acquire_blocked_until_release() {
        let locks = LocalLockProvider::new();
        let lease = locks.try_acquire("room:a:start", TTL).await.unwrap().unwrap();

        assert!(locks.try_acquire("room:a:start", TTL).await.unwrap().is_none());
        assert!(locks.try_acquire("room:b:start", TTL).await.unwrap().is_some());

        locks.release(&lease).await.unwrap();
        assert!(locks.try_acquire("room:a:start", TTL).await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_lock_can_be_taken() {
        let locks = LocalLockProvider::new();
        let stale = locks
            .try_acquire("k", Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        let fresh = locks.try_acquire("k", TTL).await.unwrap().unwrap();
        assert_ne!(stale.token, fresh.token);

        // The stale holder must not free the new lease.
        locks.release(&stale).await.unwrap();
        assert!(locks.try_acquire("k", TTL).await.unwrap().is_none());
    }
}
