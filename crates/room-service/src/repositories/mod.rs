//! Repository layer for the room service.
//!
//! The engine depends on the traits below; `Pg*Repository` types implement
//! them over Postgres (schema in `migrations/`), and `room-test-utils`
//! provides an in-memory implementation for tests.
//!
//! Writes that must not race are conditional in the store itself:
//! ending a meeting only touches rows with no `end`, and health updates never
//! touch a disabled server.

pub mod meetings;
pub mod rooms;
pub mod servers;

pub use meetings::PgMeetingRepository;
pub use rooms::PgRoomRepository;
pub use servers::PgServerRepository;

use crate::errors::RoomError;
use crate::models::{
    Meeting, MeetingUsage, MemberRole, Room, RoomToken, RoomType, Server, ServerLoad, ServerStatus,
};
use crate::observability::metrics;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::types::{MeetingId, RoomId, RoomTypeId, ServerId, ServerPoolId, UserId};
use std::time::Instant;

/// Record the duration and outcome of a query and convert its error.
pub(crate) fn observe<T>(
    operation: &'static str,
    start: Instant,
    result: Result<T, sqlx::Error>,
) -> Result<T, RoomError> {
    let status = if result.is_ok() { "success" } else { "error" };
    metrics::record_db_query(operation, status, start.elapsed());
    result.map_err(RoomError::from)
}

/// Rooms, room types, memberships and tokens.
#[async_trait]
pub trait RoomRepository: Send + Sync {
    async fn get_room(&self, room_id: &RoomId) -> Result<Option<Room>, RoomError>;

    async fn get_room_type(&self, room_type_id: RoomTypeId) -> Result<Option<RoomType>, RoomError>;

    async fn get_membership(
        &self,
        room_id: &RoomId,
        user_id: UserId,
    ) -> Result<Option<MemberRole>, RoomError>;

    async fn find_token(&self, room_id: &RoomId, token: &str)
        -> Result<Option<RoomToken>, RoomError>;

    /// Record a successful use of a token, which extends its lifetime.
    async fn touch_token(
        &self,
        room_id: &RoomId,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<(), RoomError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), RoomError>;
}

/// Meeting rows and the room's latest-meeting pointer.
#[async_trait]
pub trait MeetingRepository: Send + Sync {
    async fn get_meeting(&self, meeting_id: MeetingId) -> Result<Option<Meeting>, RoomError>;

    /// Insert a pending meeting and make it the room's latest.
    async fn insert_pending(&self, meeting: &Meeting) -> Result<(), RoomError>;

    /// Confirm a pending meeting as running and clear the room's
    /// inactivity deletion mark.
    async fn confirm_start(&self, meeting_id: MeetingId, now: DateTime<Utc>)
        -> Result<(), RoomError>;

    /// Delete a pending meeting whose create failed and point the room back
    /// at `previous_latest`.
    async fn discard_pending(
        &self,
        meeting: &Meeting,
        previous_latest: Option<MeetingId>,
    ) -> Result<(), RoomError>;

    /// Set `end` if it is unset. Returns whether this call ended it.
    async fn mark_ended(&self, meeting_id: MeetingId, now: DateTime<Utc>)
        -> Result<bool, RoomError>;

    /// Meetings with `start` set and no `end` on a server.
    async fn list_running_on_server(&self, server_id: ServerId)
        -> Result<Vec<Meeting>, RoomError>;

    async fn update_usage(&self, meeting_id: MeetingId, usage: &MeetingUsage)
        -> Result<(), RoomError>;

    /// Mark a running meeting the server no longer reports.
    async fn mark_detached(&self, meeting_id: MeetingId, now: DateTime<Utc>)
        -> Result<(), RoomError>;
}

/// Result of one health check, applied atomically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthUpdate {
    pub status: ServerStatus,
    pub error_count: i32,
    /// Fresh load counters; `None` keeps the stored ones.
    pub load: Option<ServerLoad>,
}

/// Conferencing servers and their pools.
#[async_trait]
pub trait ServerRepository: Send + Sync {
    async fn get_server(&self, server_id: ServerId) -> Result<Option<Server>, RoomError>;

    /// `Online` members of a pool.
    async fn list_online_in_pool(&self, pool_id: ServerPoolId) -> Result<Vec<Server>, RoomError>;

    /// Every server that is not `Disabled`.
    async fn list_monitored(&self) -> Result<Vec<Server>, RoomError>;

    /// `Online -> Unhealthy`. Any other status is left alone. Returns
    /// whether the status changed.
    async fn mark_unhealthy(&self, server_id: ServerId) -> Result<bool, RoomError>;

    /// Set `Disabled`. Returns `false` if the server does not exist.
    async fn disable(&self, server_id: ServerId) -> Result<bool, RoomError>;

    async fn increment_meeting_count(&self, server_id: ServerId) -> Result<(), RoomError>;

    /// Apply a health check result unless the server is `Disabled`.
    /// Returns whether the update was applied.
    async fn apply_health(&self, server_id: ServerId, update: HealthUpdate)
        -> Result<bool, RoomError>;
}
