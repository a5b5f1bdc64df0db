//! Redis lock provider.
//!
//! Acquire is `SET key token NX PX ttl`; release runs a compare-and-delete
//! script so only the owner can free the key.
//!
//! The `MultiplexedConnection` is cloned per operation; it is built for
//! concurrent use.

use super::{lua_scripts, new_token, LockLease, LockProvider};
use crate::errors::RoomError;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Client, Script};
use std::time::Duration;
use tracing::{error, instrument, warn};

#[derive(Clone)]
pub struct RedisLockProvider {
    connection: MultiplexedConnection,
    release_script: Script,
}

impl RedisLockProvider {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns `RoomError::ServiceUnavailable` if the connection fails.
    pub async fn connect(redis_url: &str) -> Result<Self, RoomError> {
        // The URL may carry a password; it is never logged.
        let client = Client::open(redis_url).map_err(|e| {
            error!(target: "rooms.locks.redis", error = %e, "Failed to open Redis client");
            RoomError::ServiceUnavailable(format!("Failed to open Redis client: {e}"))
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                error!(target: "rooms.locks.redis", error = %e, "Failed to connect to Redis");
                RoomError::ServiceUnavailable(format!("Failed to connect to Redis: {e}"))
            })?;

        Ok(Self {
            connection,
            release_script: Script::new(lua_scripts::COMPARE_AND_DELETE),
        })
    }
}

/// TTL in whole milliseconds, at least 1.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl LockProvider for RedisLockProvider {
    #[instrument(skip_all, fields(key = %key))]
    async fn try_acquire(&self, key: &str, ttl: Duration) -> Result<Option<LockLease>, RoomError> {
        let mut conn = self.connection.clone();
        let token = new_token()?;

        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(&token)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                warn!(target: "rooms.locks.redis", error = %e, key = %key, "Lock acquire failed");
                RoomError::from(e)
            })?;

        Ok(reply.map(|_| LockLease {
            key: key.to_string(),
            token,
        }))
    }

    #[instrument(skip_all, fields(key = %lease.key))]
    async fn release(&self, lease: &LockLease) -> Result<(), RoomError> {
        let mut conn = self.connection.clone();

        let released: i64 = self
            .release_script
            .key(&lease.key)
            .arg(&lease.token)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                warn!(target: "rooms.locks.redis", error = %e, key = %lease.key, "Lock release failed");
                RoomError::from(e)
            })?;

        if released == 0 {
            warn!(
                target: "rooms.locks.redis",
                key = %lease.key,
                "Lock expired before release"
            );
        }
        Ok(())
    }
}
