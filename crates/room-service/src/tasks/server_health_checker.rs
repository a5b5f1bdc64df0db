//! Server health checker background task.
//!
//! Polls every server that is not `Disabled` with `getMeetings`.
//!
//! - Success: `Online`, error count reset, load counters and per-meeting
//!   usage refreshed. Running meetings the server no longer lists are marked
//!   detached.
//! - Failure: error count incremented, `Unhealthy`, or `Offline` once the
//!   count reaches the configured threshold.
//!
//! This is the only path that promotes a server back to `Online`. A server
//! disabled while a check is in flight stays disabled; the store ignores
//! health results for it.
//!
//! # Graceful Shutdown
//!
//! The task exits when the cancellation token is triggered, after finishing
//! the current round.

use crate::errors::RoomError;
use crate::models::{Server, ServerLoad, ServerStatus};
use crate::observability::metrics;
use crate::repositories::{HealthUpdate, MeetingRepository, ServerRepository};
use crate::services::conferencing_client::{ConferencingClient, ConferencingError, MeetingInfo};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Status after one more failed check.
pub fn status_after_failure(error_count: i32, offline_after_failures: u32) -> ServerStatus {
    if i64::from(error_count) >= i64::from(offline_after_failures) {
        ServerStatus::Offline
    } else {
        ServerStatus::Unhealthy
    }
}

/// Load counters from a server's meeting list. Ended meetings do not count.
pub fn load_from_meetings(meetings: &[MeetingInfo]) -> ServerLoad {
    meetings
        .iter()
        .filter(|m| !m.ended)
        .fold(ServerLoad::default(), |load, m| ServerLoad {
            meeting_count: load.meeting_count.saturating_add(1),
            participant_count: load
                .participant_count
                .saturating_add(m.usage.participant_count),
            video_count: load.video_count.saturating_add(m.usage.video_count),
        })
}

/// Runs health checks against the server fleet.
pub struct ServerHealthChecker {
    servers: Arc<dyn ServerRepository>,
    meetings: Arc<dyn MeetingRepository>,
    conferencing: Arc<dyn ConferencingClient>,
    offline_after_failures: u32,
    request_timeout: Duration,
}

impl ServerHealthChecker {
    pub fn new(
        servers: Arc<dyn ServerRepository>,
        meetings: Arc<dyn MeetingRepository>,
        conferencing: Arc<dyn ConferencingClient>,
        offline_after_failures: u32,
        request_timeout: Duration,
    ) -> Self {
        Self {
            servers,
            meetings,
            conferencing,
            offline_after_failures,
            request_timeout,
        }
    }

    /// Check every monitored server once. A failing server does not stop
    /// the round.
    #[instrument(skip_all, name = "rooms.task.server_health_round")]
    pub async fn check_all(&self) -> Result<(), RoomError> {
        for server in self.servers.list_monitored().await? {
            if let Err(e) = self.check_server(&server).await {
                tracing::error!(
                    target: "rooms.task.server_health_checker",
                    server_id = %server.id,
                    error = %e,
                    "Failed to record health check result"
                );
            }
        }
        Ok(())
    }

    /// Check one server and store the result. Returns the status written,
    /// or `None` if the server was disabled in the meantime.
    #[instrument(skip_all, fields(server_id = %server.id))]
    pub async fn check_server(&self, server: &Server) -> Result<Option<ServerStatus>, RoomError> {
        let reported = tokio::time::timeout(self.request_timeout, self.conferencing.get_meetings(server))
            .await
            .unwrap_or(Err(ConferencingError::Timeout));

        let update = match &reported {
            Ok(meetings) => HealthUpdate {
                status: ServerStatus::Online,
                error_count: 0,
                load: Some(load_from_meetings(meetings)),
            },
            Err(err) => {
                let error_count = server.error_count.saturating_add(1);
                let status = status_after_failure(error_count, self.offline_after_failures);
                warn!(
                    target: "rooms.task.server_health_checker",
                    server_id = %server.id,
                    error = %err,
                    error_count,
                    status = status.as_db_str(),
                    "Server health check failed"
                );
                HealthUpdate {
                    status,
                    error_count,
                    load: None,
                }
            }
        };

        if !self.servers.apply_health(server.id, update).await? {
            return Ok(None);
        }
        if update.status != server.status {
            info!(
                target: "rooms.task.server_health_checker",
                server_id = %server.id,
                from = server.status.as_db_str(),
                to = update.status.as_db_str(),
                "Server status changed"
            );
            metrics::record_server_status_change(update.status.as_db_str());
        }

        if let Ok(meetings) = reported {
            self.reconcile_meetings(server, meetings).await?;
        }

        Ok(Some(update.status))
    }

    /// Refresh usage of running meetings and detach the ones the server no
    /// longer lists.
    async fn reconcile_meetings(
        &self,
        server: &Server,
        reported: Vec<MeetingInfo>,
    ) -> Result<(), RoomError> {
        let reported: HashMap<String, MeetingInfo> = reported
            .into_iter()
            .filter(|m| !m.ended)
            .map(|m| (m.meeting_id.clone(), m))
            .collect();

        for meeting in self.meetings.list_running_on_server(server.id).await? {
            match reported.get(&meeting.id.to_string()) {
                Some(info) => self.meetings.update_usage(meeting.id, &info.usage).await?,
                None if meeting.detached.is_none() => {
                    info!(
                        target: "rooms.task.server_health_checker",
                        server_id = %server.id,
                        meeting_id = %meeting.id,
                        "Meeting no longer reported by server"
                    );
                    self.meetings.mark_detached(meeting.id, Utc::now()).await?;
                }
                None => {}
            }
        }
        Ok(())
    }
}

/// Start the server health checker background task.
///
/// Runs a round every `interval` until the cancellation token is triggered.
#[instrument(skip_all, name = "rooms.task.server_health_checker")]
pub async fn start_server_health_checker(
    checker: ServerHealthChecker,
    interval: Duration,
    cancel_token: CancellationToken,
) {
    info!(
        target: "rooms.task.server_health_checker",
        interval_seconds = interval.as_secs(),
        offline_after_failures = checker.offline_after_failures,
        "Starting server health checker task"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = checker.check_all().await {
                    // Keep polling; the database may recover.
                    tracing::error!(
                        target: "rooms.task.server_health_checker",
                        error = %e,
                        "Failed to list servers for health check"
                    );
                }
            }
            _ = cancel_token.cancelled() => {
                info!(
                    target: "rooms.task.server_health_checker",
                    "Server health checker received shutdown signal, exiting"
                );
                break;
            }
        }
    }

    info!(
        target: "rooms.task.server_health_checker",
        "Server health checker stopped"
    );
}
