//! Service layer for the room service.
//!
//! # Components
//!
//! - `settings` - Effective room settings from room and room type
//! - `access` - Who may do what in a room
//! - `consent` - Recording consent
//! - `validation` - Display name checks
//! - `server_selection` - Least loaded server in a pool
//! - `callback` - Meeting-end callback signatures
//! - `conferencing_client` - HTTP client for the conferencing servers
//! - `meeting_lifecycle` - Start, join and end meetings

pub mod access;
pub mod callback;
pub mod conferencing_client;
pub mod consent;
pub mod meeting_lifecycle;
pub mod server_selection;
pub mod settings;
pub mod validation;

pub use callback::CallbackSigner;
pub use conferencing_client::{BbbClient, ConferencingClient, ConferencingError};
pub use meeting_lifecycle::{LifecycleConfig, MeetingLifecycle, PanicReport, RoomRequest};
