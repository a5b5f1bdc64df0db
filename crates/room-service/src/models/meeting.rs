//! Meeting records.

use chrono::{DateTime, Utc};
use common::types::{MeetingId, RoomId, ServerId};
use serde::{Deserialize, Serialize};

/// Usage counters last reported by the conferencing server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingUsage {
    pub participant_count: i32,
    pub listener_count: i32,
    pub voice_participant_count: i32,
    pub video_count: i32,
    pub moderator_count: i32,
}

/// One run of a room on a conferencing server.
///
/// A meeting is *pending* while `start` is `None` (create not yet confirmed),
/// *running* once `start` is set, and ended once `end` is set. `record` and
/// `record_attendance` are fixed when the meeting is created; later room
/// setting changes do not touch them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: MeetingId,
    pub room_id: RoomId,
    pub server_id: ServerId,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub record: bool,
    pub record_attendance: bool,
    /// Set when the server stopped reporting the meeting while it was still
    /// considered running locally.
    pub detached: Option<DateTime<Utc>>,
    pub usage: MeetingUsage,
}

impl Meeting {
    pub fn pending(
        room_id: RoomId,
        server_id: ServerId,
        record: bool,
        record_attendance: bool,
    ) -> Self {
        Self {
            id: MeetingId::new(),
            room_id,
            server_id,
            start: None,
            end: None,
            record,
            record_attendance,
            detached: None,
            usage: MeetingUsage::default(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.start.is_some() && self.end.is_none()
    }

    pub fn is_pending(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn has_ended(&self) -> bool {
        self.end.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meeting_state_predicates() {
        let mut meeting = Meeting::pending(RoomId::new("r"), ServerId(1), false, true);
        assert!(meeting.is_pending());
        assert!(!meeting.is_running());

        meeting.start = Some(Utc::now());
        assert!(meeting.is_running());
        assert!(!meeting.is_pending());

        meeting.end = Some(Utc::now());
        assert!(meeting.has_ended());
        assert!(!meeting.is_running());
    }
}
