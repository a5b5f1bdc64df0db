//! Meeting-end callback signatures.
//!
//! The callback URL handed to the conferencing server on create carries a
//! `salt`: HMAC-SHA256 over the meeting id, keyed by the application key,
//! hex encoded. The server calls it back verbatim when the meeting ends.

use common::types::MeetingId;
use ring::hmac;

/// Signs and verifies meeting-end callbacks.
#[derive(Clone)]
pub struct CallbackSigner {
    key: hmac::Key,
    public_url: String,
}

impl std::fmt::Debug for CallbackSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackSigner")
            .field("key", &"[REDACTED]")
            .field("public_url", &self.public_url)
            .finish()
    }
}

impl CallbackSigner {
    /// `public_url` must not end with `/`; config trims it.
    pub fn new(app_key: &[u8], public_url: impl Into<String>) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, app_key),
            public_url: public_url.into(),
        }
    }

    pub fn salt(&self, meeting_id: &MeetingId) -> String {
        let tag = hmac::sign(&self.key, meeting_id.to_string().as_bytes());
        hex::encode(tag.as_ref())
    }

    /// Constant-time check of a presented salt.
    pub fn verify(&self, meeting_id: &MeetingId, salt: &str) -> bool {
        let Ok(tag) = hex::decode(salt) else {
            return false;
        };
        hmac::verify(&self.key, meeting_id.to_string().as_bytes(), &tag).is_ok()
    }

    pub fn end_callback_url(&self, meeting_id: &MeetingId) -> String {
        format!(
            "{}/callbacks/meetings/{}/end?salt={}",
            self.public_url,
            meeting_id,
            self.salt(meeting_id)
        )
    }
}
