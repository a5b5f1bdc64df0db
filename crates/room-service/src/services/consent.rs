//! Recording consent.
//!
//! Consent is checked against what the meeting will actually do: the stored
//! snapshot of a running meeting, or the resolved room settings for a
//! meeting about to be created.

use crate::errors::{FieldErrors, RoomError};
use crate::models::Meeting;
use crate::services::settings::EffectiveSettings;
use serde::Deserialize;

pub const CONSENT_RECORD_ATTENDANCE: &str = "consent_record_attendance";
pub const CONSENT_RECORD: &str = "consent_record";
pub const CONSENT_RECORD_VIDEO: &str = "consent_record_video";

/// Raw consent fields as submitted. Kept untyped so that a missing field
/// and a field of the wrong type can both be reported by name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConsentRequest {
    #[serde(default)]
    pub consent_record_attendance: Option<serde_json::Value>,
    #[serde(default)]
    pub consent_record: Option<serde_json::Value>,
    #[serde(default)]
    pub consent_record_video: Option<serde_json::Value>,
}

impl ConsentRequest {
    /// All three flags given as booleans.
    pub fn granted(record_attendance: bool, record: bool, record_video: bool) -> Self {
        Self {
            consent_record_attendance: Some(serde_json::Value::Bool(record_attendance)),
            consent_record: Some(serde_json::Value::Bool(record)),
            consent_record_video: Some(serde_json::Value::Bool(record_video)),
        }
    }
}

/// Validated consent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsentFlags {
    pub record_attendance: bool,
    pub record: bool,
    pub record_video: bool,
}

/// What a meeting records, and therefore what must be consented to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsentRequirements {
    pub record: bool,
    pub record_attendance: bool,
}

impl ConsentRequirements {
    pub fn from_meeting(meeting: &Meeting) -> Self {
        Self {
            record: meeting.record,
            record_attendance: meeting.record_attendance,
        }
    }

    pub fn from_settings(settings: &EffectiveSettings) -> Self {
        Self {
            record: settings.record,
            record_attendance: settings.record_attendance,
        }
    }
}

fn read_flag(
    value: Option<&serde_json::Value>,
    field: &str,
    errors: &mut FieldErrors,
) -> Option<bool> {
    match value {
        Some(serde_json::Value::Bool(flag)) => Some(*flag),
        Some(_) => {
            errors.add(field, "must be true or false");
            None
        }
        None => {
            errors.add(field, "is required");
            None
        }
    }
}

/// Check consent against the given requirements.
///
/// `consent_record_video` must always be present as a boolean. The other two
/// must be present, and must be `true` when the corresponding recording is
/// active.
pub fn check_consent(
    requirements: ConsentRequirements,
    request: &ConsentRequest,
) -> Result<ConsentFlags, RoomError> {
    let mut errors = FieldErrors::new();

    let record_attendance = read_flag(
        request.consent_record_attendance.as_ref(),
        CONSENT_RECORD_ATTENDANCE,
        &mut errors,
    );
    let record = read_flag(request.consent_record.as_ref(), CONSENT_RECORD, &mut errors);
    let record_video = read_flag(
        request.consent_record_video.as_ref(),
        CONSENT_RECORD_VIDEO,
        &mut errors,
    );

    if requirements.record_attendance && record_attendance == Some(false) {
        errors.add(CONSENT_RECORD_ATTENDANCE, "must be accepted");
    }
    if requirements.record && record == Some(false) {
        errors.add(CONSENT_RECORD, "must be accepted");
    }

    match (record_attendance, record, record_video) {
        (Some(record_attendance), Some(record), Some(record_video)) if errors.is_empty() => {
            Ok(ConsentFlags {
                record_attendance,
                record,
                record_video,
            })
        }
        _ => Err(RoomError::ValidationFailed(errors)),
    }
}
