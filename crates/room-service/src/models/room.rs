//! Rooms, room types, memberships and room tokens.

use super::settings::{RoomSettings, RoomTypeSettings};
use chrono::{DateTime, Utc};
use common::types::{MeetingId, RoleId, RoomId, RoomTypeId, ServerPoolId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Governance template a room is created from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomType {
    pub id: RoomTypeId,
    pub name: String,
    /// Pool new meetings of this type are placed on.
    pub server_pool_id: ServerPoolId,
    /// When set, only users holding one of `allowed_role_ids` may start or
    /// take ownership of rooms of this type.
    pub restrict: bool,
    pub allowed_role_ids: Vec<RoleId>,
    pub settings: RoomTypeSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub short_description: Option<String>,
    pub owner_id: UserId,
    pub room_type_id: RoomTypeId,
    /// Unless set, stored values of non-enforced settings are ignored.
    pub expert_mode: bool,
    /// Stored per-attribute values. Not authoritative on their own, see
    /// `services::settings::resolve_settings`.
    pub settings: RoomSettings,
    pub access_code: Option<String>,
    pub latest_meeting_id: Option<MeetingId>,
    /// Scheduled deletion of an inactive room. Cleared on every start.
    pub delete_inactive: Option<DateTime<Utc>>,
}

/// Role a member holds in one room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    User,
    Moderator,
    CoOwner,
}

impl MemberRole {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            MemberRole::User => "user",
            MemberRole::Moderator => "moderator",
            MemberRole::CoOwner => "co_owner",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(MemberRole::User),
            "moderator" => Some(MemberRole::Moderator),
            "co_owner" => Some(MemberRole::CoOwner),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomMembership {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub role: MemberRole,
}

/// Role carried by a personalized room token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenRole {
    User,
    Moderator,
}

impl TokenRole {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            TokenRole::User => "user",
            TokenRole::Moderator => "moderator",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(TokenRole::User),
            "moderator" => Some(TokenRole::Moderator),
            _ => None,
        }
    }
}

/// Personalized bearer credential granting room access without an account.
#[derive(Clone, PartialEq, Eq)]
pub struct RoomToken {
    pub token: String,
    pub room_id: RoomId,
    pub firstname: String,
    pub lastname: String,
    pub role: TokenRole,
    pub created_at: DateTime<Utc>,
    pub last_usage: Option<DateTime<Utc>>,
}

impl RoomToken {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
    }

    /// Whether the token has outlived `lifetime` since its last use (or its
    /// creation if it was never used).
    pub fn is_expired(&self, lifetime: Option<chrono::Duration>, now: DateTime<Utc>) -> bool {
        match lifetime {
            Some(lifetime) => {
                let reference = self.last_usage.unwrap_or(self.created_at);
                reference + lifetime < now
            }
            None => false,
        }
    }
}

impl fmt::Debug for RoomToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoomToken")
            .field("token", &"[REDACTED]")
            .field("room_id", &self.room_id)
            .field("firstname", &self.firstname)
            .field("lastname", &self.lastname)
            .field("role", &self.role)
            .field("created_at", &self.created_at)
            .field("last_usage", &self.last_usage)
            .finish()
    }
}

/// Partial room update. `None` leaves the field untouched.
///
/// For the optional text fields the inner `Option` is the new value, so
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RoomUpdate {
    pub name: Option<String>,
    pub short_description: Option<Option<String>>,
    pub room_type_id: Option<RoomTypeId>,
    pub expert_mode: Option<bool>,
    pub settings: Option<RoomSettings>,
    pub access_code: Option<Option<String>>,
}

impl RoomUpdate {
    /// Apply the named changes to `room`.
    ///
    /// Switching room type never clears the access code: a code made inert
    /// by the new type becomes live again if the type is switched back.
    pub fn apply(&self, room: &mut Room) {
        if let Some(name) = &self.name {
            room.name.clone_from(name);
        }
        if let Some(short_description) = &self.short_description {
            room.short_description.clone_from(short_description);
        }
        if let Some(room_type_id) = self.room_type_id {
            room.room_type_id = room_type_id;
        }
        if let Some(expert_mode) = self.expert_mode {
            room.expert_mode = expert_mode;
        }
        if let Some(settings) = self.settings {
            room.settings = settings;
        }
        if let Some(access_code) = &self.access_code {
            room.access_code.clone_from(access_code);
        }
    }

    /// Access code the room will carry once this update is applied.
    pub fn resulting_access_code<'a>(&'a self, room: &'a Room) -> Option<&'a str> {
        match &self.access_code {
            Some(code) => code.as_deref(),
            None => room.access_code.as_deref(),
        }
    }
}

/// Room view handed to presentation layers.
///
/// `access_code` is only populated for viewers allowed to see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomDetails {
    pub id: RoomId,
    pub name: String,
    pub short_description: Option<String>,
    pub owner_id: UserId,
    pub room_type_id: RoomTypeId,
    pub has_access_code: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_code: Option<String>,
    pub running: bool,
}
