//! Server selection for new meetings.
//!
//! Candidates are the `Online` members of the room type's pool. The least
//! loaded one wins, where load is `meeting_count / strength`. Ratios are
//! compared by cross-multiplication so two servers at the same load always
//! tie exactly; ties go to the lowest id.

use crate::errors::RoomError;
use crate::models::{Server, ServerStatus};
use crate::repositories::ServerRepository;
use common::types::ServerPoolId;
use std::cmp::Ordering;
use tracing::instrument;

/// Order two servers by weighted load, then by id.
fn compare_load(a: &Server, b: &Server) -> Ordering {
    let strength = |s: &Server| i64::from(s.strength.max(1));
    let lhs = i64::from(a.load.meeting_count) * strength(b);
    let rhs = i64::from(b.load.meeting_count) * strength(a);
    lhs.cmp(&rhs).then_with(|| a.id.cmp(&b.id))
}

/// Pick the least loaded online server from `candidates`.
pub fn pick_server(candidates: &[Server]) -> Option<&Server> {
    candidates
        .iter()
        .filter(|s| s.status == ServerStatus::Online)
        .min_by(|a, b| compare_load(a, b))
}

/// Choose a server for a new meeting in `pool_id`.
///
/// # Errors
///
/// - `RoomError::NoServerAvailable` - the pool is empty or nothing is online
/// - `RoomError::Database` - the server list could not be read
#[instrument(skip_all, fields(pool_id = %pool_id))]
pub async fn select_server(
    servers: &dyn ServerRepository,
    pool_id: ServerPoolId,
) -> Result<Server, RoomError> {
    let candidates = servers.list_online_in_pool(pool_id).await?;

    let Some(server) = pick_server(&candidates) else {
        tracing::warn!(
            target: "rooms.service.server_selection",
            pool_id = %pool_id,
            "No online server in pool"
        );
        return Err(RoomError::NoServerAvailable);
    };

    tracing::debug!(
        target: "rooms.service.server_selection",
        server_id = %server.id,
        meeting_count = server.load.meeting_count,
        strength = server.strength,
        candidate_count = candidates.len(),
        "Selected server"
    );

    Ok(server.clone())
}
