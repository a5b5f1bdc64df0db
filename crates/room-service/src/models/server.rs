//! Conferencing servers.

use common::secret::SecretString;
use common::types::{ServerId, ServerPoolId};
use serde::{Deserialize, Serialize};

/// Server availability.
///
/// Only `Online` servers receive new meetings. `Disabled` is an operator
/// decision and is never left automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerStatus {
    Online,
    Unhealthy,
    Offline,
    Disabled,
}

impl ServerStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            ServerStatus::Online => "online",
            ServerStatus::Unhealthy => "unhealthy",
            ServerStatus::Offline => "offline",
            ServerStatus::Disabled => "disabled",
        }
    }

    /// Unknown values read as `Disabled` so a bad row never receives load.
    pub fn from_db_str(s: &str) -> Self {
        match s {
            "online" => ServerStatus::Online,
            "unhealthy" => ServerStatus::Unhealthy,
            "offline" => ServerStatus::Offline,
            _ => ServerStatus::Disabled,
        }
    }
}

/// Load counters last reported for a server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerLoad {
    pub meeting_count: i32,
    pub participant_count: i32,
    pub video_count: i32,
}

#[derive(Debug, Clone)]
pub struct Server {
    pub id: ServerId,
    pub name: String,
    /// API root, e.g. `https://bbb.example.com/bigbluebutton/`.
    pub base_url: String,
    /// Shared API secret used for request checksums.
    pub secret: SecretString,
    /// Capacity weight, 1 to 10.
    pub strength: i32,
    pub pool_ids: Vec<ServerPoolId>,
    pub status: ServerStatus,
    /// Consecutive failed health checks.
    pub error_count: i32,
    pub load: ServerLoad,
}
