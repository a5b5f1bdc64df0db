//! Secret types for values that must never reach a log line.
//!
//! Re-exports [`secrecy`] types. Use them for conferencing-server shared
//! secrets, the application signing key, room access codes held in config,
//! and any bearer token that is kept around longer than a single request.
//!
//! `SecretString` implements `Debug` with redaction, so a struct deriving
//! `Debug` stays safe to log as long as its sensitive fields use it.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct ServerCredentials {
//!     base_url: String,
//!     secret: SecretString,
//! }
//!
//! let creds = ServerCredentials {
//!     base_url: "https://bbb.example.com/bigbluebutton".to_string(),
//!     secret: SecretString::from("shared-secret"),
//! };
//!
//! assert!(!format!("{creds:?}").contains("shared-secret"));
//! assert_eq!(creds.secret.expose_secret(), "shared-secret");
//! ```

pub use secrecy::{ExposeSecret, SecretString};
