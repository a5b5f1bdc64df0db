//! Setting resolution.
//!
//! The effective value of a governed attribute is the room-type default when
//! the type enforces it or when the room is not in expert mode, and the
//! room's stored value otherwise. Effective values are computed on demand and
//! never persisted.

use crate::errors::{FieldErrors, RoomError};
use crate::models::{
    Room, RoomSettings, RoomType, RoomTypeSettings, RoomUpdate, SettingKey, SettingValue,
    TypeSetting,
};
use serde::Serialize;

/// Resolved settings for one room.
pub type EffectiveSettings = RoomSettings;

/// Length of a room access code.
pub const ACCESS_CODE_LENGTH: usize = 9;

/// One resolved attribute with its enforcement flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedSetting {
    pub key: SettingKey,
    pub value: SettingValue,
    /// Enforced attributes must not be offered for editing.
    pub enforced: bool,
}

fn pick<T: Copy>(setting: TypeSetting<T>, expert_mode: bool, stored: T) -> T {
    if setting.enforced || !expert_mode {
        setting.default
    } else {
        stored
    }
}

/// Resolve a single attribute.
pub fn resolve_setting(key: SettingKey, room_type: &RoomType, room: &Room) -> SettingValue {
    resolve_settings(room_type, room).get(key)
}

/// Resolve every governed attribute.
pub fn resolve_settings(room_type: &RoomType, room: &Room) -> EffectiveSettings {
    let t: &RoomTypeSettings = &room_type.settings;
    let s: &RoomSettings = &room.settings;
    let x = room.expert_mode;

    RoomSettings {
        allow_guests: pick(t.allow_guests, x, s.allow_guests),
        allow_membership: pick(t.allow_membership, x, s.allow_membership),
        everyone_can_start: pick(t.everyone_can_start, x, s.everyone_can_start),
        record: pick(t.record, x, s.record),
        record_attendance: pick(t.record_attendance, x, s.record_attendance),
        auto_start_recording: pick(t.auto_start_recording, x, s.auto_start_recording),
        mute_on_start: pick(t.mute_on_start, x, s.mute_on_start),
        webcams_only_for_moderator: pick(
            t.webcams_only_for_moderator,
            x,
            s.webcams_only_for_moderator,
        ),
        lock_settings_disable_cam: pick(
            t.lock_settings_disable_cam,
            x,
            s.lock_settings_disable_cam,
        ),
        lock_settings_disable_mic: pick(
            t.lock_settings_disable_mic,
            x,
            s.lock_settings_disable_mic,
        ),
        lock_settings_disable_private_chat: pick(
            t.lock_settings_disable_private_chat,
            x,
            s.lock_settings_disable_private_chat,
        ),
        lock_settings_disable_public_chat: pick(
            t.lock_settings_disable_public_chat,
            x,
            s.lock_settings_disable_public_chat,
        ),
        lock_settings_disable_note: pick(
            t.lock_settings_disable_note,
            x,
            s.lock_settings_disable_note,
        ),
        lock_settings_hide_user_list: pick(
            t.lock_settings_hide_user_list,
            x,
            s.lock_settings_hide_user_list,
        ),
        default_role: pick(t.default_role, x, s.default_role),
        lobby: pick(t.lobby, x, s.lobby),
        visibility: pick(t.visibility, x, s.visibility),
    }
}

/// Resolved values with enforcement flags, in a stable order.
pub fn describe_settings(room_type: &RoomType, room: &Room) -> Vec<ResolvedSetting> {
    let effective = resolve_settings(room_type, room);
    SettingKey::ALL
        .iter()
        .map(|&key| ResolvedSetting {
            key,
            value: effective.get(key),
            enforced: room_type.settings.is_enforced(key),
        })
        .collect()
}

/// The access code that gates the room, if any.
///
/// A code stored on a room whose type enforces "no access code" is inert.
pub fn effective_access_code<'a>(room_type: &RoomType, room: &'a Room) -> Option<&'a str> {
    let has_access_code = room_type.settings.has_access_code;
    if has_access_code.enforced && !has_access_code.default {
        return None;
    }
    room.access_code.as_deref()
}

/// Validate a room update against the target room type.
///
/// `room_type` must be the type the room will have after the update.
pub fn validate_room_update(
    room_type: &RoomType,
    room: &Room,
    update: &RoomUpdate,
) -> Result<(), RoomError> {
    let mut errors = FieldErrors::new();

    if let Some(name) = &update.name {
        let len = name.trim().chars().count();
        if len == 0 || len > 255 {
            errors.add("name", "must be between 1 and 255 characters");
        }
    }

    let has_access_code = room_type.settings.has_access_code;
    let resulting = update.resulting_access_code(room);

    if has_access_code.enforced {
        match (has_access_code.default, resulting) {
            (true, None) => errors.add("access_code", "is required for this room type"),
            (false, Some(_)) if update.access_code.is_some() => {
                errors.add("access_code", "is not allowed for this room type");
            }
            _ => {}
        }
    }

    if let Some(Some(code)) = &update.access_code {
        if code.len() != ACCESS_CODE_LENGTH || !code.bytes().all(|b| b.is_ascii_digit()) {
            errors.add("access_code", "must be a 9-digit number");
        }
    }

    errors.into_result()
}
