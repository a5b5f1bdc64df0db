//! Room access evaluation.
//!
//! Determines the caller's effective role in a room from, in order: a room
//! token, the `manage_all` capability, ownership, membership, the `view_all`
//! capability, being authenticated at all. The ladder role and the
//! capability floor are combined with `max`. Guests and plain authenticated
//! users then pass through the guest gate and the access-code gate.

use crate::errors::RoomError;
use crate::models::{
    AuthenticatedUser, Credentials, DefaultRole, LobbyMode, MemberRole, Room, RoomDetails,
    RoomToken, RoomType, TokenRole,
};
use crate::services::settings::{effective_access_code, EffectiveSettings};
use chrono::{DateTime, Utc};
use common::types::UserId;

/// Caller's role in a room. Ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EffectiveRole {
    Guest,
    Authenticated,
    MemberUser,
    MemberModerator,
    MemberCoOwner,
    Owner,
}

impl EffectiveRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectiveRole::Guest => "guest",
            EffectiveRole::Authenticated => "authenticated",
            EffectiveRole::MemberUser => "member_user",
            EffectiveRole::MemberModerator => "member_moderator",
            EffectiveRole::MemberCoOwner => "member_co_owner",
            EffectiveRole::Owner => "owner",
        }
    }
}

impl From<MemberRole> for EffectiveRole {
    fn from(role: MemberRole) -> Self {
        match role {
            MemberRole::User => EffectiveRole::MemberUser,
            MemberRole::Moderator => EffectiveRole::MemberModerator,
            MemberRole::CoOwner => EffectiveRole::MemberCoOwner,
        }
    }
}

impl From<TokenRole> for EffectiveRole {
    fn from(role: TokenRole) -> Self {
        match role {
            TokenRole::User => EffectiveRole::MemberUser,
            TokenRole::Moderator => EffectiveRole::MemberModerator,
        }
    }
}

/// Role passed to the conferencing server on join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConferenceRole {
    Moderator,
    Viewer,
}

impl ConferenceRole {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            ConferenceRole::Moderator => "MODERATOR",
            ConferenceRole::Viewer => "VIEWER",
        }
    }
}

/// Everything the evaluator needs about a request.
///
/// Repository lookups are done by the caller: `membership` is the user's
/// membership in this room and `token` is the room token matching
/// `credentials.token`, if one was found.
#[derive(Debug, Clone, Copy)]
pub struct AccessRequest<'a> {
    pub room: &'a Room,
    pub room_type: &'a RoomType,
    pub settings: &'a EffectiveSettings,
    pub user: Option<&'a AuthenticatedUser>,
    pub membership: Option<MemberRole>,
    pub credentials: &'a Credentials,
    pub token: Option<&'a RoomToken>,
    pub token_lifetime: Option<chrono::Duration>,
    pub now: DateTime<Utc>,
}

/// Granted access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Access {
    pub role: EffectiveRole,
    /// Set when access was granted through a room token.
    pub token_role: Option<TokenRole>,
    pub manage_all: bool,
    pub user_id: Option<UserId>,
    /// Name known from the identity or the token, if any.
    pub display_name: Option<String>,
}

impl Access {
    pub fn is_guest(&self) -> bool {
        self.role == EffectiveRole::Guest
    }

    /// May see and change moderator-only room data, like the access code.
    pub fn is_moderator(&self) -> bool {
        self.manage_all || self.role >= EffectiveRole::MemberModerator
    }
}

fn check_access_code(room_type: &RoomType, room: &Room, given: Option<&str>) -> Result<(), RoomError> {
    let Some(expected) = effective_access_code(room_type, room) else {
        return Ok(());
    };
    match given {
        None => Err(RoomError::AccessCodeRequired),
        Some(code) if code.is_empty() || code != expected => Err(RoomError::AccessCodeInvalid),
        Some(_) => Ok(()),
    }
}

/// Evaluate a request's access to a room.
pub fn evaluate_access(req: &AccessRequest<'_>) -> Result<Access, RoomError> {
    let manage_all = req.user.is_some_and(|u| u.permissions.manage_all);
    let view_all = req.user.is_some_and(|u| u.permissions.view_all);
    let floor = if manage_all {
        EffectiveRole::MemberCoOwner
    } else if req.user.is_some() {
        EffectiveRole::Authenticated
    } else {
        EffectiveRole::Guest
    };

    let user_id = req.user.map(|u| u.id);
    let user_name = req.user.map(|u| u.display_name.clone());

    if req.credentials.token.is_some() {
        let token = req
            .token
            .filter(|t| t.room_id == req.room.id)
            .filter(|t| !t.is_expired(req.token_lifetime, req.now))
            .ok_or(RoomError::TokenInvalid)?;

        return Ok(Access {
            role: EffectiveRole::from(token.role).max(floor),
            token_role: Some(token.role),
            manage_all,
            user_id,
            display_name: Some(token.display_name()),
        });
    }

    let ladder = match req.user {
        Some(user) if user.id == req.room.owner_id => EffectiveRole::Owner,
        Some(_) => req
            .membership
            .map_or(EffectiveRole::Authenticated, EffectiveRole::from),
        None => EffectiveRole::Guest,
    };
    let role = ladder.max(floor);

    let access = Access {
        role,
        token_role: None,
        manage_all,
        user_id,
        display_name: user_name,
    };

    // Members, owners and manage_all are past both gates.
    if role >= EffectiveRole::MemberUser {
        return Ok(access);
    }

    if role == EffectiveRole::Guest && !req.settings.allow_guests {
        return Err(RoomError::GuestsForbidden);
    }

    if !view_all {
        check_access_code(
            req.room_type,
            req.room,
            req.credentials.access_code.as_deref(),
        )?;
    }

    Ok(access)
}

/// Resolve the identity or fail with `Unauthenticated`.
pub fn require_authenticated(
    user: Option<&AuthenticatedUser>,
) -> Result<&AuthenticatedUser, RoomError> {
    user.ok_or(RoomError::Unauthenticated)
}

/// Whether the caller may start a new meeting.
pub fn can_start(access: &Access, settings: &EffectiveSettings) -> bool {
    access.is_moderator() || settings.everyone_can_start
}

/// Enforce a restricted room type's role allow-list for starting a meeting
/// or taking ownership of a room.
///
/// Token holders and guests never hold installation roles, so they cannot
/// pass a restriction.
pub fn ensure_room_type_permits(
    room_type: &RoomType,
    user: Option<&AuthenticatedUser>,
) -> Result<(), RoomError> {
    if !room_type.restrict {
        return Ok(());
    }
    let permitted = user.is_some_and(|u| {
        u.permissions.manage_all
            || u
                .role_ids
                .iter()
                .any(|role| room_type.allowed_role_ids.contains(role))
    });
    if permitted {
        Ok(())
    } else {
        Err(RoomError::RoomTypeRestricted)
    }
}

/// Conferencing role for a join URL.
pub fn conference_role(access: &Access, settings: &EffectiveSettings) -> ConferenceRole {
    if access.is_moderator() || access.token_role == Some(TokenRole::Moderator) {
        return ConferenceRole::Moderator;
    }
    match access.role {
        EffectiveRole::Authenticated if access.token_role.is_none() => match settings.default_role
        {
            DefaultRole::Moderator => ConferenceRole::Moderator,
            DefaultRole::User => ConferenceRole::Viewer,
        },
        _ => ConferenceRole::Viewer,
    }
}

/// Whether the participant is sent to the waiting room.
pub fn joins_via_lobby(access: &Access, role: ConferenceRole, settings: &EffectiveSettings) -> bool {
    match settings.lobby {
        LobbyMode::Disabled => false,
        LobbyMode::Enabled => role != ConferenceRole::Moderator,
        LobbyMode::OnlyForGuests => {
            access.token_role.is_none()
                && matches!(
                    access.role,
                    EffectiveRole::Guest | EffectiveRole::Authenticated
                )
        }
    }
}

/// Room view for the caller. The access code literal is moderator-only.
pub fn room_details(
    access: &Access,
    room_type: &RoomType,
    room: &Room,
    running: bool,
) -> RoomDetails {
    let code = effective_access_code(room_type, room);
    RoomDetails {
        id: room.id.clone(),
        name: room.name.clone(),
        short_description: room.short_description.clone(),
        owner_id: room.owner_id,
        room_type_id: room.room_type_id,
        has_access_code: code.is_some(),
        access_code: code
            .filter(|_| access.is_moderator())
            .map(str::to_string),
        running,
    }
}
