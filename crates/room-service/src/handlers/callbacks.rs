//! Conferencing server callbacks.

use crate::errors::RoomError;
use crate::routes::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::types::MeetingId;
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Query of the meeting-end callback. The server may append parameters of
/// its own; they are ignored.
#[derive(Debug, Deserialize)]
pub struct EndCallbackQuery {
    pub salt: Option<String>,
}

/// Handler for GET /callbacks/meetings/{meeting_id}/end
///
/// Marks the meeting ended once its signature checks out.
///
/// # Response
///
/// - 204: ended (or already ended)
/// - 401: missing or invalid `salt`
/// - 404: unknown meeting
#[instrument(skip_all, name = "rooms.callbacks.meeting_ended")]
pub async fn meeting_ended(
    State(state): State<Arc<AppState>>,
    Path(meeting_id): Path<String>,
    Query(query): Query<EndCallbackQuery>,
) -> Result<StatusCode, RoomError> {
    let meeting_id = Uuid::parse_str(&meeting_id)
        .map(MeetingId)
        .map_err(|_| RoomError::NotFound("Meeting not found".to_string()))?;

    state
        .lifecycle
        .end_callback(meeting_id, query.salt.as_deref())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
