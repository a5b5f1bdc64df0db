//! Governed room settings.
//!
//! Every governed attribute exists three times: as a [`TypeSetting`] on the
//! room type (suggested default + enforcement flag), as a stored value on the
//! room, and as a resolved value in
//! [`EffectiveSettings`](crate::services::settings::EffectiveSettings).

use serde::{Deserialize, Serialize};

/// Room-type governance for one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSetting<T> {
    /// Value used when the room does not (or may not) override it.
    pub default: T,
    /// When true the default always wins, expert mode or not.
    pub enforced: bool,
}

impl<T> TypeSetting<T> {
    pub const fn suggested(default: T) -> Self {
        Self {
            default,
            enforced: false,
        }
    }

    pub const fn enforced(default: T) -> Self {
        Self {
            default,
            enforced: true,
        }
    }
}

/// Role given to authenticated non-members when they join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultRole {
    User,
    Moderator,
}

impl DefaultRole {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            DefaultRole::User => "user",
            DefaultRole::Moderator => "moderator",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "moderator" => DefaultRole::Moderator,
            _ => DefaultRole::User,
        }
    }
}

/// Waiting-room policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LobbyMode {
    Disabled,
    Enabled,
    OnlyForGuests,
}

impl LobbyMode {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            LobbyMode::Disabled => "disabled",
            LobbyMode::Enabled => "enabled",
            LobbyMode::OnlyForGuests => "only_for_guests",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "enabled" => LobbyMode::Enabled,
            "only_for_guests" => LobbyMode::OnlyForGuests,
            _ => LobbyMode::Disabled,
        }
    }
}

/// Room listing visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Private,
    Public,
}

impl Visibility {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Public => "public",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "public" => Visibility::Public,
            _ => Visibility::Private,
        }
    }
}

/// Names of the governed attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKey {
    AllowGuests,
    AllowMembership,
    EveryoneCanStart,
    Record,
    RecordAttendance,
    AutoStartRecording,
    MuteOnStart,
    WebcamsOnlyForModerator,
    LockSettingsDisableCam,
    LockSettingsDisableMic,
    LockSettingsDisablePrivateChat,
    LockSettingsDisablePublicChat,
    LockSettingsDisableNote,
    LockSettingsHideUserList,
    DefaultRole,
    Lobby,
    Visibility,
}

impl SettingKey {
    pub const ALL: [SettingKey; 17] = [
        SettingKey::AllowGuests,
        SettingKey::AllowMembership,
        SettingKey::EveryoneCanStart,
        SettingKey::Record,
        SettingKey::RecordAttendance,
        SettingKey::AutoStartRecording,
        SettingKey::MuteOnStart,
        SettingKey::WebcamsOnlyForModerator,
        SettingKey::LockSettingsDisableCam,
        SettingKey::LockSettingsDisableMic,
        SettingKey::LockSettingsDisablePrivateChat,
        SettingKey::LockSettingsDisablePublicChat,
        SettingKey::LockSettingsDisableNote,
        SettingKey::LockSettingsHideUserList,
        SettingKey::DefaultRole,
        SettingKey::Lobby,
        SettingKey::Visibility,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::AllowGuests => "allow_guests",
            SettingKey::AllowMembership => "allow_membership",
            SettingKey::EveryoneCanStart => "everyone_can_start",
            SettingKey::Record => "record",
            SettingKey::RecordAttendance => "record_attendance",
            SettingKey::AutoStartRecording => "auto_start_recording",
            SettingKey::MuteOnStart => "mute_on_start",
            SettingKey::WebcamsOnlyForModerator => "webcams_only_for_moderator",
            SettingKey::LockSettingsDisableCam => "lock_settings_disable_cam",
            SettingKey::LockSettingsDisableMic => "lock_settings_disable_mic",
            SettingKey::LockSettingsDisablePrivateChat => "lock_settings_disable_private_chat",
            SettingKey::LockSettingsDisablePublicChat => "lock_settings_disable_public_chat",
            SettingKey::LockSettingsDisableNote => "lock_settings_disable_note",
            SettingKey::LockSettingsHideUserList => "lock_settings_hide_user_list",
            SettingKey::DefaultRole => "default_role",
            SettingKey::Lobby => "lobby",
            SettingKey::Visibility => "visibility",
        }
    }
}

/// A resolved value of any governed attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    DefaultRole(DefaultRole),
    Lobby(LobbyMode),
    Visibility(Visibility),
}

/// Values for every governed attribute.
///
/// Used for the room's stored values and for resolved settings alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSettings {
    pub allow_guests: bool,
    pub allow_membership: bool,
    pub everyone_can_start: bool,
    pub record: bool,
    pub record_attendance: bool,
    pub auto_start_recording: bool,
    pub mute_on_start: bool,
    pub webcams_only_for_moderator: bool,
    pub lock_settings_disable_cam: bool,
    pub lock_settings_disable_mic: bool,
    pub lock_settings_disable_private_chat: bool,
    pub lock_settings_disable_public_chat: bool,
    pub lock_settings_disable_note: bool,
    pub lock_settings_hide_user_list: bool,
    pub default_role: DefaultRole,
    pub lobby: LobbyMode,
    pub visibility: Visibility,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            allow_guests: false,
            allow_membership: false,
            everyone_can_start: false,
            record: false,
            record_attendance: false,
            auto_start_recording: false,
            mute_on_start: false,
            webcams_only_for_moderator: false,
            lock_settings_disable_cam: false,
            lock_settings_disable_mic: false,
            lock_settings_disable_private_chat: false,
            lock_settings_disable_public_chat: false,
            lock_settings_disable_note: false,
            lock_settings_hide_user_list: false,
            default_role: DefaultRole::User,
            lobby: LobbyMode::Disabled,
            visibility: Visibility::Private,
        }
    }
}

impl RoomSettings {
    pub fn get(&self, key: SettingKey) -> SettingValue {
        match key {
            SettingKey::AllowGuests => SettingValue::Bool(self.allow_guests),
            SettingKey::AllowMembership => SettingValue::Bool(self.allow_membership),
            SettingKey::EveryoneCanStart => SettingValue::Bool(self.everyone_can_start),
            SettingKey::Record => SettingValue::Bool(self.record),
            SettingKey::RecordAttendance => SettingValue::Bool(self.record_attendance),
            SettingKey::AutoStartRecording => SettingValue::Bool(self.auto_start_recording),
            SettingKey::MuteOnStart => SettingValue::Bool(self.mute_on_start),
            SettingKey::WebcamsOnlyForModerator => {
                SettingValue::Bool(self.webcams_only_for_moderator)
            }
            SettingKey::LockSettingsDisableCam => SettingValue::Bool(self.lock_settings_disable_cam),
            SettingKey::LockSettingsDisableMic => SettingValue::Bool(self.lock_settings_disable_mic),
            SettingKey::LockSettingsDisablePrivateChat => {
                SettingValue::Bool(self.lock_settings_disable_private_chat)
            }
            SettingKey::LockSettingsDisablePublicChat => {
                SettingValue::Bool(self.lock_settings_disable_public_chat)
            }
            SettingKey::LockSettingsDisableNote => {
                SettingValue::Bool(self.lock_settings_disable_note)
            }
            SettingKey::LockSettingsHideUserList => {
                SettingValue::Bool(self.lock_settings_hide_user_list)
            }
            SettingKey::DefaultRole => SettingValue::DefaultRole(self.default_role),
            SettingKey::Lobby => SettingValue::Lobby(self.lobby),
            SettingKey::Visibility => SettingValue::Visibility(self.visibility),
        }
    }
}

/// Room-type governance for every governed attribute plus access codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomTypeSettings {
    pub allow_guests: TypeSetting<bool>,
    pub allow_membership: TypeSetting<bool>,
    pub everyone_can_start: TypeSetting<bool>,
    pub record: TypeSetting<bool>,
    pub record_attendance: TypeSetting<bool>,
    pub auto_start_recording: TypeSetting<bool>,
    pub mute_on_start: TypeSetting<bool>,
    pub webcams_only_for_moderator: TypeSetting<bool>,
    pub lock_settings_disable_cam: TypeSetting<bool>,
    pub lock_settings_disable_mic: TypeSetting<bool>,
    pub lock_settings_disable_private_chat: TypeSetting<bool>,
    pub lock_settings_disable_public_chat: TypeSetting<bool>,
    pub lock_settings_disable_note: TypeSetting<bool>,
    pub lock_settings_hide_user_list: TypeSetting<bool>,
    pub default_role: TypeSetting<DefaultRole>,
    pub lobby: TypeSetting<LobbyMode>,
    pub visibility: TypeSetting<Visibility>,
    /// Whether rooms of this type must (enforced true) or must not
    /// (enforced false) carry an access code.
    pub has_access_code: TypeSetting<bool>,
}

impl Default for RoomTypeSettings {
    fn default() -> Self {
        let d = RoomSettings::default();
        Self {
            allow_guests: TypeSetting::suggested(d.allow_guests),
            allow_membership: TypeSetting::suggested(d.allow_membership),
            everyone_can_start: TypeSetting::suggested(d.everyone_can_start),
            record: TypeSetting::suggested(d.record),
            record_attendance: TypeSetting::suggested(d.record_attendance),
            auto_start_recording: TypeSetting::suggested(d.auto_start_recording),
            mute_on_start: TypeSetting::suggested(d.mute_on_start),
            webcams_only_for_moderator: TypeSetting::suggested(d.webcams_only_for_moderator),
            lock_settings_disable_cam: TypeSetting::suggested(d.lock_settings_disable_cam),
            lock_settings_disable_mic: TypeSetting::suggested(d.lock_settings_disable_mic),
            lock_settings_disable_private_chat: TypeSetting::suggested(
                d.lock_settings_disable_private_chat,
            ),
            lock_settings_disable_public_chat: TypeSetting::suggested(
                d.lock_settings_disable_public_chat,
            ),
            lock_settings_disable_note: TypeSetting::suggested(d.lock_settings_disable_note),
            lock_settings_hide_user_list: TypeSetting::suggested(d.lock_settings_hide_user_list),
            default_role: TypeSetting::suggested(d.default_role),
            lobby: TypeSetting::suggested(d.lobby),
            visibility: TypeSetting::suggested(d.visibility),
            has_access_code: TypeSetting::suggested(false),
        }
    }
}

impl RoomTypeSettings {
    /// Enforcement flag for a governed attribute.
    pub fn is_enforced(&self, key: SettingKey) -> bool {
        match key {
            SettingKey::AllowGuests => self.allow_guests.enforced,
            SettingKey::AllowMembership => self.allow_membership.enforced,
            SettingKey::EveryoneCanStart => self.everyone_can_start.enforced,
            SettingKey::Record => self.record.enforced,
            SettingKey::RecordAttendance => self.record_attendance.enforced,
            SettingKey::AutoStartRecording => self.auto_start_recording.enforced,
            SettingKey::MuteOnStart => self.mute_on_start.enforced,
            SettingKey::WebcamsOnlyForModerator => self.webcams_only_for_moderator.enforced,
            SettingKey::LockSettingsDisableCam => self.lock_settings_disable_cam.enforced,
            SettingKey::LockSettingsDisableMic => self.lock_settings_disable_mic.enforced,
            SettingKey::LockSettingsDisablePrivateChat => {
                self.lock_settings_disable_private_chat.enforced
            }
            SettingKey::LockSettingsDisablePublicChat => {
                self.lock_settings_disable_public_chat.enforced
            }
            SettingKey::LockSettingsDisableNote => self.lock_settings_disable_note.enforced,
            SettingKey::LockSettingsHideUserList => self.lock_settings_hide_user_list.enforced,
            SettingKey::DefaultRole => self.default_role.enforced,
            SettingKey::Lobby => self.lobby.enforced,
            SettingKey::Visibility => self.visibility.enforced,
        }
    }
}
