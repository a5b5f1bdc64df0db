//! Display-name validation.
//!
//! Names are forwarded to the conferencing server and rendered to every
//! participant, so only a conservative character set is accepted.

use crate::errors::{FieldErrors, RoomError};

/// Minimum display name length in characters.
pub const MIN_DISPLAY_NAME_LENGTH: usize = 2;

/// Maximum display name length in characters.
pub const MAX_DISPLAY_NAME_LENGTH: usize = 50;

const NAME_FIELD: &str = "name";

fn is_allowed(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.' | '\'')
}

/// Validate a display name.
///
/// On failure the `name` field lists the rejected characters in order of
/// first appearance.
pub fn validate_display_name(name: &str) -> Result<(), RoomError> {
    let mut errors = FieldErrors::new();

    // Lossy decoding upstream leaves the replacement character behind.
    if name.contains(char::REPLACEMENT_CHARACTER) {
        errors.add(NAME_FIELD, "contains malformed characters");
        return errors.into_result();
    }

    let trimmed = name.trim();
    let len = trimmed.chars().count();
    if len < MIN_DISPLAY_NAME_LENGTH {
        errors.add(
            NAME_FIELD,
            format!("must be at least {MIN_DISPLAY_NAME_LENGTH} characters"),
        );
    } else if len > MAX_DISPLAY_NAME_LENGTH {
        errors.add(
            NAME_FIELD,
            format!("must be at most {MAX_DISPLAY_NAME_LENGTH} characters"),
        );
    }

    let mut invalid: Vec<char> = Vec::new();
    for c in trimmed.chars().filter(|&c| !is_allowed(c)) {
        if !invalid.contains(&c) {
            invalid.push(c);
        }
    }
    if !invalid.is_empty() {
        let listed: Vec<String> = invalid.iter().map(char::to_string).collect();
        errors.add(
            NAME_FIELD,
            format!("contains invalid characters: {}", listed.join(", ")),
        );
    }

    errors.into_result()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn invalid_characters(err: &RoomError) -> Vec<String> {
        let RoomError::ValidationFailed(errors) = err else {
            return Vec::new();
        };
        errors
            .messages(NAME_FIELD)
            .iter()
            .filter_map(|m| m.strip_prefix("contains invalid characters: "))
            .flat_map(|list| list.split(", ").map(str::to_string))
            .collect()
    }

    #[test]
    fn test_accepts_ordinary_names() {
        for name in ["Ada Lovelace", "O'Brien", "jean-luc.picard", "Zoë Ünal", "李雷"] {
            assert!(validate_display_name(name).is_ok(), "{name:?} rejected");
        }
    }

    #[test]
    fn test_rejects_markup_listing_characters_in_order() {
        let err = validate_display_name("<script>alert(1)</script>").unwrap_err();

        assert_eq!(invalid_characters(&err), ["<", ">", "(", ")", "/"]);
    }

    #[test]
    fn test_rejects_malformed_encoding() {
        let err = validate_display_name("Ad\u{FFFD}a").unwrap_err();

        let RoomError::ValidationFailed(errors) = err else {
            unreachable!("expected validation failure");
        };
        assert_eq!(errors.messages("name"), ["contains malformed characters"]);
    }

    #[test]
    fn test_length_bounds() {
        assert!(validate_display_name("A").is_err());
        assert!(validate_display_name("  A  ").is_err());
        assert!(validate_display_name("Al").is_ok());
        assert!(validate_display_name(&"a".repeat(50)).is_ok());
        assert!(validate_display_name(&"a".repeat(51)).is_err());
    }

    #[test]
    fn test_guest_name_with_emoji_is_rejected() {
        let err = validate_display_name("Party 🎉").unwrap_err();
        assert_eq!(invalid_characters(&err), ["🎉"]);
    }
}
