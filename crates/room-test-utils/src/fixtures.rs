//! Builders for rooms, servers, users and configuration.

use chrono::{DateTime, Utc};
use common::secret::SecretString;
use common::types::{RoleId, RoomId, RoomTypeId, ServerId, ServerPoolId, UserId};
use room_service::config::Config;
use room_service::models::{
    AuthenticatedUser, Permissions, Room, RoomSettings, RoomToken, RoomType, RoomTypeSettings,
    Server, ServerLoad, ServerStatus, TokenRole,
};
use room_service::services::consent::ConsentRequest;
use room_service::services::{LifecycleConfig, RoomRequest};
use std::collections::HashMap;
use std::time::Duration;

/// Application key used by every test configuration.
pub const TEST_APP_KEY: &str = "test-app-key-with-at-least-32-bytes!!";

pub const TEST_PUBLIC_URL: &str = "https://rooms.example.test";

/// Unrestricted room type with suggested defaults.
pub fn room_type(id: i64, pool_id: i64) -> RoomType {
    RoomType {
        id: RoomTypeId(id),
        name: format!("Type {id}"),
        server_pool_id: ServerPoolId(pool_id),
        restrict: false,
        allowed_role_ids: Vec::new(),
        settings: RoomTypeSettings::default(),
    }
}

/// Room with default settings and no access code.
pub fn room(code: &str, owner_id: i64, room_type_id: i64) -> Room {
    Room {
        id: RoomId::new(code),
        name: format!("Room {code}"),
        short_description: None,
        owner_id: UserId(owner_id),
        room_type_id: RoomTypeId(room_type_id),
        expert_mode: false,
        settings: RoomSettings::default(),
        access_code: None,
        latest_meeting_id: None,
        delete_inactive: None,
    }
}

/// Online server of strength 1 without load.
pub fn server(id: i64, pool_id: i64) -> Server {
    Server {
        id: ServerId(id),
        name: format!("bbb-{id}"),
        base_url: format!("https://bbb-{id}.example.test/bigbluebutton"),
        secret: SecretString::from(format!("server-secret-{id}")),
        strength: 1,
        pool_ids: vec![ServerPoolId(pool_id)],
        status: ServerStatus::Online,
        error_count: 0,
        load: ServerLoad::default(),
    }
}

/// Signed-in user without permissions or roles.
pub fn user(id: i64, display_name: &str) -> AuthenticatedUser {
    AuthenticatedUser {
        id: UserId(id),
        display_name: display_name.to_string(),
        permissions: Permissions::default(),
        role_ids: Vec::new(),
    }
}

/// Signed-in user holding the given installation roles.
pub fn user_with_roles(id: i64, display_name: &str, roles: &[i64]) -> AuthenticatedUser {
    AuthenticatedUser {
        role_ids: roles.iter().copied().map(RoleId).collect(),
        ..user(id, display_name)
    }
}

/// Administrator with `manage_all`.
pub fn admin(id: i64) -> AuthenticatedUser {
    AuthenticatedUser {
        permissions: Permissions {
            manage_all: true,
            view_all: true,
        },
        ..user(id, "Admin User")
    }
}

pub fn token(room_id: &str, token: &str, role: TokenRole, created_at: DateTime<Utc>) -> RoomToken {
    RoomToken {
        token: token.to_string(),
        room_id: RoomId::new(room_id),
        firstname: "Token".to_string(),
        lastname: "Holder".to_string(),
        role,
        created_at,
        last_usage: None,
    }
}

/// Request from a signed-in user that consents to everything.
pub fn user_request(user: &AuthenticatedUser) -> RoomRequest {
    RoomRequest {
        user: Some(user.clone()),
        consent: ConsentRequest::granted(true, true, true),
        ..RoomRequest::default()
    }
}

/// Request from a guest that consents to everything.
pub fn guest_request(name: &str) -> RoomRequest {
    RoomRequest {
        name: Some(name.to_string()),
        consent: ConsentRequest::granted(true, true, true),
        ..RoomRequest::default()
    }
}

/// Minimal environment for `Config::from_vars`.
pub fn config_vars() -> HashMap<String, String> {
    HashMap::from([
        (
            "DATABASE_URL".to_string(),
            "postgresql://test/rooms".to_string(),
        ),
        ("APP_KEY".to_string(), TEST_APP_KEY.to_string()),
        ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        ("PUBLIC_URL".to_string(), TEST_PUBLIC_URL.to_string()),
        ("DRAIN_SECONDS".to_string(), "0".to_string()),
    ])
}

pub fn config() -> Config {
    Config::from_vars(&config_vars()).expect("test configuration is valid")
}

/// Lifecycle timing for tests: short lock wait, generous request timeout.
pub fn lifecycle_config() -> LifecycleConfig {
    LifecycleConfig {
        start_lock_wait: Duration::from_millis(500),
        start_lock_ttl: Duration::from_secs(5),
        request_timeout: Duration::from_secs(2),
        token_lifetime: Some(chrono::Duration::days(30)),
        public_url: TEST_PUBLIC_URL.to_string(),
        custom_style_url: None,
    }
}
