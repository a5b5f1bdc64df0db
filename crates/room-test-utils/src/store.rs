//! In-memory implementation of the room service repositories.
//!
//! Mirrors the conditional writes of the Postgres repositories (one open
//! meeting per room, `end` set at most once, health results ignored for
//! disabled servers) so lifecycle tests exercise the same races.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::types::{MeetingId, RoomId, RoomTypeId, ServerId, ServerPoolId, UserId};
use room_service::errors::RoomError;
use room_service::models::{
    Meeting, MeetingUsage, MemberRole, Room, RoomToken, RoomType, Server, ServerStatus,
};
use room_service::repositories::{
    HealthUpdate, MeetingRepository, RoomRepository, ServerRepository,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct State {
    rooms: HashMap<RoomId, Room>,
    room_types: HashMap<RoomTypeId, RoomType>,
    memberships: HashMap<(RoomId, UserId), MemberRole>,
    tokens: Vec<RoomToken>,
    meetings: HashMap<MeetingId, Meeting>,
    servers: BTreeMap<ServerId, Server>,
    unavailable: bool,
    failing_end_writes: HashSet<MeetingId>,
}

/// Rooms, meetings and servers held in memory.
///
/// # Example
/// ```rust,ignore
/// let store = InMemoryStore::new();
/// store.insert_room_type(fixtures::room_type(1, 1));
/// store.insert_room(fixtures::room("abc-def-123", 1, 1));
/// store.insert_server(fixtures::server(1, 1));
/// ```
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("store mutex poisoned")
    }

    fn available(&self) -> Result<MutexGuard<'_, State>, RoomError> {
        let state = self.state();
        if state.unavailable {
            return Err(RoomError::Database("store unavailable".to_string()));
        }
        Ok(state)
    }

    // ------------------------------------------------------------------------
    // Seeding
    // ------------------------------------------------------------------------

    pub fn insert_room(&self, room: Room) {
        self.state().rooms.insert(room.id.clone(), room);
    }

    pub fn insert_room_type(&self, room_type: RoomType) {
        self.state().room_types.insert(room_type.id, room_type);
    }

    pub fn add_membership(&self, room_id: &RoomId, user_id: UserId, role: MemberRole) {
        self.state()
            .memberships
            .insert((room_id.clone(), user_id), role);
    }

    pub fn insert_token(&self, token: RoomToken) {
        self.state().tokens.push(token);
    }

    pub fn insert_server(&self, server: Server) {
        self.state().servers.insert(server.id, server);
    }

    /// Store a meeting as-is and make it the room's latest.
    pub fn insert_meeting(&self, meeting: Meeting) {
        let mut state = self.state();
        if let Some(room) = state.rooms.get_mut(&meeting.room_id) {
            room.latest_meeting_id = Some(meeting.id);
        }
        state.meetings.insert(meeting.id, meeting);
    }

    /// Change a stored room in place.
    pub fn update_room(&self, room_id: &RoomId, update: impl FnOnce(&mut Room)) {
        if let Some(room) = self.state().rooms.get_mut(room_id) {
            update(room);
        }
    }

    /// Change a stored room type in place.
    pub fn update_room_type(&self, room_type_id: RoomTypeId, update: impl FnOnce(&mut RoomType)) {
        if let Some(room_type) = self.state().room_types.get_mut(&room_type_id) {
            update(room_type);
        }
    }

    /// Make `mark_ended` fail with a database error for one meeting.
    pub fn fail_end_write(&self, meeting_id: MeetingId) {
        self.state().failing_end_writes.insert(meeting_id);
    }

    /// Make every call fail with a database error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    pub fn room(&self, room_id: &RoomId) -> Option<Room> {
        self.state().rooms.get(room_id).cloned()
    }

    pub fn meeting(&self, meeting_id: MeetingId) -> Option<Meeting> {
        self.state().meetings.get(&meeting_id).cloned()
    }

    pub fn server(&self, server_id: ServerId) -> Option<Server> {
        self.state().servers.get(&server_id).cloned()
    }

    pub fn token(&self, token: &str) -> Option<RoomToken> {
        self.state()
            .tokens
            .iter()
            .find(|t| t.token == token)
            .cloned()
    }

    /// Every meeting of a room, oldest start first; pending last.
    pub fn meetings_of_room(&self, room_id: &RoomId) -> Vec<Meeting> {
        let mut meetings: Vec<Meeting> = self
            .state()
            .meetings
            .values()
            .filter(|m| &m.room_id == room_id)
            .cloned()
            .collect();
        meetings.sort_by_key(|m| (m.start.is_none(), m.start));
        meetings
    }

    /// The meeting the room currently points at.
    pub fn latest_meeting(&self, room_id: &RoomId) -> Option<Meeting> {
        let state = self.state();
        let id = state.rooms.get(room_id)?.latest_meeting_id?;
        state.meetings.get(&id).cloned()
    }
}

#[async_trait]
impl RoomRepository for InMemoryStore {
    async fn get_room(&self, room_id: &RoomId) -> Result<Option<Room>, RoomError> {
        Ok(self.available()?.rooms.get(room_id).cloned())
    }

    async fn get_room_type(&self, room_type_id: RoomTypeId) -> Result<Option<RoomType>, RoomError> {
        Ok(self.available()?.room_types.get(&room_type_id).cloned())
    }

    async fn get_membership(
        &self,
        room_id: &RoomId,
        user_id: UserId,
    ) -> Result<Option<MemberRole>, RoomError> {
        Ok(self
            .available()?
            .memberships
            .get(&(room_id.clone(), user_id))
            .copied())
    }

    async fn find_token(
        &self,
        room_id: &RoomId,
        token: &str,
    ) -> Result<Option<RoomToken>, RoomError> {
        Ok(self
            .available()?
            .tokens
            .iter()
            .find(|t| &t.room_id == room_id && t.token == token)
            .cloned())
    }

    async fn touch_token(
        &self,
        room_id: &RoomId,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<(), RoomError> {
        let mut state = self.available()?;
        if let Some(t) = state
            .tokens
            .iter_mut()
            .find(|t| &t.room_id == room_id && t.token == token)
        {
            t.last_usage = Some(now);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), RoomError> {
        self.available().map(|_| ())
    }
}

#[async_trait]
impl MeetingRepository for InMemoryStore {
    async fn get_meeting(&self, meeting_id: MeetingId) -> Result<Option<Meeting>, RoomError> {
        Ok(self.available()?.meetings.get(&meeting_id).cloned())
    }

    async fn insert_pending(&self, meeting: &Meeting) -> Result<(), RoomError> {
        let mut state = self.available()?;
        let open = state
            .meetings
            .values()
            .any(|m| m.room_id == meeting.room_id && m.end.is_none());
        if open {
            return Err(RoomError::Database(
                "duplicate key value violates unique constraint \"idx_meetings_one_open_per_room\""
                    .to_string(),
            ));
        }
        let Some(room) = state.rooms.get_mut(&meeting.room_id) else {
            return Err(RoomError::Database("room does not exist".to_string()));
        };
        room.latest_meeting_id = Some(meeting.id);
        state.meetings.insert(meeting.id, meeting.clone());
        Ok(())
    }

    async fn confirm_start(
        &self,
        meeting_id: MeetingId,
        now: DateTime<Utc>,
    ) -> Result<(), RoomError> {
        let mut state = self.available()?;
        let Some(meeting) = state.meetings.get_mut(&meeting_id) else {
            return Ok(());
        };
        if !meeting.is_pending() {
            return Ok(());
        }
        meeting.start = Some(now);
        let room_id = meeting.room_id.clone();
        if let Some(room) = state.rooms.get_mut(&room_id) {
            room.delete_inactive = None;
        }
        Ok(())
    }

    async fn discard_pending(
        &self,
        meeting: &Meeting,
        previous_latest: Option<MeetingId>,
    ) -> Result<(), RoomError> {
        let mut state = self.available()?;
        if state
            .meetings
            .get(&meeting.id)
            .is_some_and(Meeting::is_pending)
        {
            state.meetings.remove(&meeting.id);
        }
        if let Some(room) = state.rooms.get_mut(&meeting.room_id) {
            if room.latest_meeting_id == Some(meeting.id) {
                room.latest_meeting_id = previous_latest;
            }
        }
        Ok(())
    }

    async fn mark_ended(
        &self,
        meeting_id: MeetingId,
        now: DateTime<Utc>,
    ) -> Result<bool, RoomError> {
        let mut state = self.available()?;
        if state.failing_end_writes.contains(&meeting_id) {
            return Err(RoomError::Database("end write failed".to_string()));
        }
        match state.meetings.get_mut(&meeting_id) {
            Some(meeting) if meeting.end.is_none() => {
                meeting.end = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_running_on_server(
        &self,
        server_id: ServerId,
    ) -> Result<Vec<Meeting>, RoomError> {
        Ok(self
            .available()?
            .meetings
            .values()
            .filter(|m| m.server_id == server_id && m.is_running())
            .cloned()
            .collect())
    }

    async fn update_usage(
        &self,
        meeting_id: MeetingId,
        usage: &MeetingUsage,
    ) -> Result<(), RoomError> {
        if let Some(meeting) = self.available()?.meetings.get_mut(&meeting_id) {
            if meeting.end.is_none() {
                meeting.usage = *usage;
                meeting.detached = None;
            }
        }
        Ok(())
    }

    async fn mark_detached(
        &self,
        meeting_id: MeetingId,
        now: DateTime<Utc>,
    ) -> Result<(), RoomError> {
        if let Some(meeting) = self.available()?.meetings.get_mut(&meeting_id) {
            if meeting.is_running() && meeting.detached.is_none() {
                meeting.detached = Some(now);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ServerRepository for InMemoryStore {
    async fn get_server(&self, server_id: ServerId) -> Result<Option<Server>, RoomError> {
        Ok(self.available()?.servers.get(&server_id).cloned())
    }

    async fn list_online_in_pool(&self, pool_id: ServerPoolId) -> Result<Vec<Server>, RoomError> {
        Ok(self
            .available()?
            .servers
            .values()
            .filter(|s| s.status == ServerStatus::Online && s.pool_ids.contains(&pool_id))
            .cloned()
            .collect())
    }

    async fn list_monitored(&self) -> Result<Vec<Server>, RoomError> {
        Ok(self
            .available()?
            .servers
            .values()
            .filter(|s| s.status != ServerStatus::Disabled)
            .cloned()
            .collect())
    }

    async fn mark_unhealthy(&self, server_id: ServerId) -> Result<bool, RoomError> {
        let mut state = self.available()?;
        match state.servers.get_mut(&server_id) {
            Some(server) if server.status == ServerStatus::Online => {
                server.status = ServerStatus::Unhealthy;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn disable(&self, server_id: ServerId) -> Result<bool, RoomError> {
        let mut state = self.available()?;
        match state.servers.get_mut(&server_id) {
            Some(server) => {
                server.status = ServerStatus::Disabled;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn increment_meeting_count(&self, server_id: ServerId) -> Result<(), RoomError> {
        if let Some(server) = self.available()?.servers.get_mut(&server_id) {
            server.load.meeting_count += 1;
        }
        Ok(())
    }

    async fn apply_health(
        &self,
        server_id: ServerId,
        update: HealthUpdate,
    ) -> Result<bool, RoomError> {
        let mut state = self.available()?;
        match state.servers.get_mut(&server_id) {
            Some(server) if server.status != ServerStatus::Disabled => {
                server.status = update.status;
                server.error_count = update.error_count;
                if let Some(load) = update.load {
                    server.load = load;
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[tokio::test]
    async fn test_one_open_meeting_per_room() {
        let store = InMemoryStore::new();
        store.insert_room(fixtures::room("abc-def-123", 1, 1));
        let room_id = RoomId::new("abc-def-123");

        let first = Meeting::pending(room_id.clone(), ServerId(1), false, false);
        store.insert_pending(&first).await.unwrap();
        let second = Meeting::pending(room_id.clone(), ServerId(1), false, false);
        assert!(store.insert_pending(&second).await.is_err());

        assert!(store.mark_ended(first.id, Utc::now()).await.unwrap());
        assert!(!store.mark_ended(first.id, Utc::now()).await.unwrap());
        store.insert_pending(&second).await.unwrap();
        assert_eq!(store.room(&room_id).unwrap().latest_meeting_id, Some(second.id));
    }

    #[tokio::test]
    async fn test_health_update_ignored_for_disabled_server() {
        let store = InMemoryStore::new();
        store.insert_server(fixtures::server(1, 1));
        assert!(store.disable(ServerId(1)).await.unwrap());

        let applied = store
            .apply_health(
                ServerId(1),
                HealthUpdate {
                    status: ServerStatus::Online,
                    error_count: 0,
                    load: None,
                },
            )
            .await
            .unwrap();
        assert!(!applied);
        assert_eq!(store.server(ServerId(1)).unwrap().status, ServerStatus::Disabled);
    }
}
