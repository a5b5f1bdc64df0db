//! Room service models.
//!
//! Contains data types shared by the services, repositories and handlers.

pub mod meeting;
pub mod room;
pub mod server;
pub mod settings;

pub use meeting::{Meeting, MeetingUsage};
pub use room::{
    MemberRole, Room, RoomDetails, RoomMembership, RoomToken, RoomType, RoomUpdate, TokenRole,
};
pub use server::{Server, ServerLoad, ServerStatus};
pub use settings::{
    DefaultRole, LobbyMode, RoomSettings, RoomTypeSettings, SettingKey, SettingValue,
    TypeSetting, Visibility,
};

use common::types::{RoleId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Installation-wide capabilities of an authenticated user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    /// Full control over every room.
    pub manage_all: bool,
    /// Read access to every room, without the access code.
    pub view_all: bool,
}

/// Identity resolved by the caller's authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: UserId,
    pub display_name: String,
    pub permissions: Permissions,
    pub role_ids: Vec<RoleId>,
}

/// Per-request room credentials.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub access_code: Option<String>,
    pub token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_code", &self.access_code.as_ref().map(|_| "[REDACTED]"))
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Health check response.
///
/// Returned by the `/health` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service health status ("healthy" or "unhealthy").
    pub status: String,

    /// Database connectivity status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}
