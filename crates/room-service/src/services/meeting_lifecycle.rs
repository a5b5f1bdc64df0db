//! Meeting lifecycle.
//!
//! Drives a room from idle to running and back: start, join, the server's
//! end callback, explicit end, and panic (end everything on a server).
//!
//! # Concurrency
//!
//! - Starts of one room are serialized by the `room:{id}:start` lock with a
//!   bounded wait; a caller that cannot get it fails with `AlreadyStarting`
//! - The lock is released on every path out of the critical section
//! - A meeting row exists with `start == None` only while its create is in
//!   flight under the lock; a failed create removes it again
//! - Ending is idempotent in the store, so callbacks, join self-heal and
//!   panic may race freely
//!
//! Local validation (display name, consent) happens before the lock is
//! taken or any server is contacted.

use crate::config::Config;
use crate::errors::{FieldErrors, RoomError, StartFailureReason};
use crate::locks::{self, LockProvider};
use crate::models::{
    AuthenticatedUser, Credentials, Meeting, Room, RoomDetails, RoomType, Server,
};
use crate::observability::metrics;
use crate::repositories::{MeetingRepository, RoomRepository, ServerRepository};
use crate::services::access::{
    self, conference_role, ensure_room_type_permits, evaluate_access, joins_via_lobby, Access,
    AccessRequest,
};
use crate::services::callback::CallbackSigner;
use crate::services::conferencing_client::{
    ConferencingClient, ConferencingError, CreateMeetingParams, JoinParams,
};
use crate::services::consent::{check_consent, ConsentFlags, ConsentRequest, ConsentRequirements};
use crate::services::server_selection::select_server;
use crate::services::settings::{resolve_settings, EffectiveSettings};
use crate::services::validation::validate_display_name;
use chrono::Utc;
use common::types::{MeetingId, RoomId, ServerId};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

/// Timing and URL settings of the lifecycle.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// How long a start waits for a concurrent start of the same room.
    pub start_lock_wait: Duration,
    /// How long the start lock survives a holder that never releases it.
    pub start_lock_ttl: Duration,
    /// Bound on each conferencing call made by the lifecycle.
    pub request_timeout: Duration,
    pub token_lifetime: Option<chrono::Duration>,
    pub public_url: String,
    pub custom_style_url: Option<String>,
}

impl LifecycleConfig {
    pub fn from_config(config: &Config) -> Self {
        let wait = config.start_lock_wait();
        Self {
            start_lock_wait: wait,
            start_lock_ttl: wait * 2,
            request_timeout: config.server_request_timeout,
            token_lifetime: config.room_token_expiration,
            public_url: config.public_url.clone(),
            custom_style_url: config.custom_style_url.clone(),
        }
    }
}

/// A request to start or join a room.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomRequest {
    /// Identity from the authentication layer; never deserialized.
    #[serde(skip)]
    pub user: Option<AuthenticatedUser>,
    #[serde(flatten)]
    pub credentials: Credentials,
    /// Name chosen by a guest. Ignored for signed-in users and tokens.
    pub name: Option<String>,
    #[serde(flatten)]
    pub consent: ConsentRequest,
}

/// Outcome of a panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanicReport {
    /// Meetings that were running on the server.
    pub total: usize,
    /// Meetings the server confirmed ended (or no longer knew).
    pub succeeded: usize,
    /// Meetings whose end could not be stored. They stay open until the
    /// health checker or a callback catches up.
    pub unrecorded: usize,
}

/// Room, type and effective settings, loaded together.
struct RoomContext {
    room: Room,
    room_type: RoomType,
    settings: EffectiveSettings,
}

/// Coordinates meeting state, a server fleet and the start lock.
pub struct MeetingLifecycle {
    rooms: Arc<dyn RoomRepository>,
    meetings: Arc<dyn MeetingRepository>,
    servers: Arc<dyn ServerRepository>,
    conferencing: Arc<dyn ConferencingClient>,
    locks: Arc<dyn LockProvider>,
    signer: CallbackSigner,
    config: LifecycleConfig,
}

impl MeetingLifecycle {
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        meetings: Arc<dyn MeetingRepository>,
        servers: Arc<dyn ServerRepository>,
        conferencing: Arc<dyn ConferencingClient>,
        locks: Arc<dyn LockProvider>,
        signer: CallbackSigner,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            rooms,
            meetings,
            servers,
            conferencing,
            locks,
            signer,
            config,
        }
    }

    // ------------------------------------------------------------------------
    // Exposed operations
    // ------------------------------------------------------------------------

    /// Start the room's meeting, or join it if it is already running.
    /// Returns a join URL for the caller.
    #[instrument(skip_all, name = "rooms.service.start", fields(room_id = %room_id))]
    pub async fn start(&self, room_id: &RoomId, request: &RoomRequest) -> Result<String, RoomError> {
        let result = self.start_inner(room_id, request).await;
        if let Err(err) = &result {
            metrics::record_start(err.code());
        }
        result
    }

    /// Join the room's running meeting.
    #[instrument(skip_all, name = "rooms.service.join", fields(room_id = %room_id))]
    pub async fn join(&self, room_id: &RoomId, request: &RoomRequest) -> Result<String, RoomError> {
        let result = self.join_inner(room_id, request).await;
        metrics::record_join(match &result {
            Ok(_) => "joined",
            Err(err) => err.code(),
        });
        result
    }

    /// Meeting-end callback from a conferencing server.
    #[instrument(skip_all, name = "rooms.service.end_callback", fields(meeting_id = %meeting_id))]
    pub async fn end_callback(
        &self,
        meeting_id: MeetingId,
        salt: Option<&str>,
    ) -> Result<(), RoomError> {
        if !salt.is_some_and(|salt| self.signer.verify(&meeting_id, salt)) {
            tracing::warn!(
                target: "rooms.service.lifecycle",
                meeting_id = %meeting_id,
                "Rejected end callback with invalid signature"
            );
            return Err(RoomError::InvalidCallbackSignature);
        }

        if self.meetings.get_meeting(meeting_id).await?.is_none() {
            return Err(RoomError::NotFound("Meeting not found".to_string()));
        }

        let ended = self.meetings.mark_ended(meeting_id, Utc::now()).await?;
        tracing::info!(
            target: "rooms.service.lifecycle",
            meeting_id = %meeting_id,
            ended,
            "End callback processed"
        );
        Ok(())
    }

    /// End the room's running meeting on request of a moderator.
    ///
    /// Needs a session: room tokens and guests cannot end meetings.
    #[instrument(skip_all, name = "rooms.service.end_meeting", fields(room_id = %room_id))]
    pub async fn end_meeting(
        &self,
        room_id: &RoomId,
        user: Option<&AuthenticatedUser>,
        credentials: &Credentials,
    ) -> Result<(), RoomError> {
        let user = access::require_authenticated(user)?;
        let ctx = self.load_room(room_id).await?;
        let access = self.authorize(&ctx, Some(user), credentials).await?;
        if !access.is_moderator() {
            return Err(RoomError::Forbidden(
                "Only moderators may end the meeting".to_string(),
            ));
        }

        let meeting = self
            .latest_meeting(&ctx.room)
            .await?
            .filter(Meeting::is_running)
            .ok_or(RoomError::RoomNotRunning)?;
        let server = self.server_of(&meeting).await?;

        match self
            .bounded(self.conferencing.end(&server, &meeting.id))
            .await
        {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {
                tracing::info!(
                    target: "rooms.service.lifecycle",
                    meeting_id = %meeting.id,
                    "Server no longer knows meeting, ending locally"
                );
            }
            Err(err) => {
                tracing::warn!(
                    target: "rooms.service.lifecycle",
                    meeting_id = %meeting.id,
                    server_id = %server.id,
                    error = %err,
                    "Failed to end meeting on server"
                );
                return Err(RoomError::ServerRequestFailed(err.to_string()));
            }
        }

        self.meetings.mark_ended(meeting.id, Utc::now()).await?;
        Ok(())
    }

    /// Disable a server and end every meeting running on it.
    #[instrument(skip_all, name = "rooms.service.panic", fields(server_id = %server_id))]
    pub async fn panic(&self, server_id: ServerId) -> Result<PanicReport, RoomError> {
        if !self.servers.disable(server_id).await? {
            return Err(RoomError::NotFound("Server not found".to_string()));
        }
        metrics::record_server_status_change("disabled");

        let Some(server) = self.servers.get_server(server_id).await? else {
            return Err(RoomError::NotFound("Server not found".to_string()));
        };

        let running = self.meetings.list_running_on_server(server_id).await?;
        let total = running.len();
        let mut succeeded = 0;
        let mut unrecorded = 0;

        for meeting in &running {
            match self.bounded(self.conferencing.end(&server, &meeting.id)).await {
                Ok(()) => succeeded += 1,
                Err(err) if err.is_not_found() => succeeded += 1,
                Err(err) => {
                    tracing::warn!(
                        target: "rooms.service.lifecycle",
                        meeting_id = %meeting.id,
                        error = %err,
                        "Failed to end meeting during panic"
                    );
                }
            }
            if let Err(err) = self.meetings.mark_ended(meeting.id, Utc::now()).await {
                tracing::error!(
                    target: "rooms.service.lifecycle",
                    meeting_id = %meeting.id,
                    error = %err,
                    "Failed to store meeting end during panic"
                );
                unrecorded += 1;
            }
        }

        metrics::record_panic_meetings(succeeded as u64, (total - succeeded) as u64);
        tracing::warn!(
            target: "rooms.service.lifecycle",
            server_id = %server_id,
            total,
            succeeded,
            unrecorded,
            "Server panic completed"
        );

        Ok(PanicReport {
            total,
            succeeded,
            unrecorded,
        })
    }

    /// The room as the caller may see it.
    #[instrument(skip_all, name = "rooms.service.room_details", fields(room_id = %room_id))]
    pub async fn room_details(
        &self,
        room_id: &RoomId,
        user: Option<&AuthenticatedUser>,
        credentials: &Credentials,
    ) -> Result<RoomDetails, RoomError> {
        let ctx = self.load_room(room_id).await?;
        let access = self.authorize(&ctx, user, credentials).await?;
        let running = self
            .latest_meeting(&ctx.room)
            .await?
            .is_some_and(|m| m.is_running());
        Ok(access::room_details(&access, &ctx.room_type, &ctx.room, running))
    }

    // ------------------------------------------------------------------------
    // Start
    // ------------------------------------------------------------------------

    async fn start_inner(&self, room_id: &RoomId, request: &RoomRequest) -> Result<String, RoomError> {
        let ctx = self.load_room(room_id).await?;
        let access = self
            .authorize(&ctx, request.user.as_ref(), &request.credentials)
            .await?;

        if !access::can_start(&access, &ctx.settings) {
            return Err(RoomError::Forbidden(
                "Not allowed to start this room".to_string(),
            ));
        }
        // Tokens and guests carry no installation roles; a restricted type
        // only admits its role holders.
        ensure_room_type_permits(
            &ctx.room_type,
            request.user.as_ref().filter(|_| access.token_role.is_none()),
        )?;

        let name = participant_name(&access, request)?;
        let visible = self
            .latest_meeting(&ctx.room)
            .await?
            .filter(Meeting::is_running);
        let requirements = match &visible {
            Some(meeting) => ConsentRequirements::from_meeting(meeting),
            None => ConsentRequirements::from_settings(&ctx.settings),
        };
        let consent = check_consent(requirements, &request.consent)?;

        let wait_started = Instant::now();
        let lease = locks::acquire_with_timeout(
            self.locks.as_ref(),
            &locks::room_start_key(room_id.as_str()),
            self.config.start_lock_ttl,
            self.config.start_lock_wait,
        )
        .await?;
        metrics::record_start_lock_wait(lease.is_some(), wait_started.elapsed());

        let Some(lease) = lease else {
            tracing::info!(
                target: "rooms.service.lifecycle",
                room_id = %room_id,
                "Start lock busy"
            );
            return Err(RoomError::AlreadyStarting);
        };

        let result = self
            .start_locked(&ctx, &access, request, &name, consent)
            .await;

        if let Err(err) = self.locks.release(&lease).await {
            tracing::warn!(
                target: "rooms.service.lifecycle",
                room_id = %room_id,
                error = %err,
                "Failed to release start lock"
            );
        }

        result
    }

    /// The part of a start that runs under the room's lock.
    async fn start_locked(
        &self,
        ctx: &RoomContext,
        access: &Access,
        request: &RoomRequest,
        name: &str,
        consent: ConsentFlags,
    ) -> Result<String, RoomError> {
        // Re-read: another start may have finished while we waited.
        let room = self
            .rooms
            .get_room(&ctx.room.id)
            .await?
            .ok_or_else(|| RoomError::NotFound("Room not found".to_string()))?;

        if let Some(latest) = self.latest_meeting(&room).await? {
            if latest.is_running() {
                let consent =
                    check_consent(ConsentRequirements::from_meeting(&latest), &request.consent)?;
                let server = self.server_of(&latest).await?;
                metrics::record_start("already_running");
                return self.join_url(&server, &latest, access, &ctx.settings, name, consent);
            }
            if latest.is_pending() {
                tracing::warn!(
                    target: "rooms.service.lifecycle",
                    meeting_id = %latest.id,
                    "Abandoning unconfirmed meeting"
                );
                self.meetings.mark_ended(latest.id, Utc::now()).await?;
            }
        }

        let server = select_server(self.servers.as_ref(), ctx.room_type.server_pool_id).await?;

        let meeting = Meeting::pending(
            room.id.clone(),
            server.id,
            ctx.settings.record,
            ctx.settings.record_attendance,
        );
        self.meetings.insert_pending(&meeting).await?;

        let params = CreateMeetingParams {
            meeting_id: meeting.id,
            name: room.name.clone(),
            settings: ctx.settings,
            end_callback_url: self.signer.end_callback_url(&meeting.id),
            logout_url: Some(format!("{}/rooms/{}", self.config.public_url, room.id)),
        };

        match self.bounded(self.conferencing.create(&server, &params)).await {
            Ok(()) => {
                self.meetings.confirm_start(meeting.id, Utc::now()).await?;
                self.servers.increment_meeting_count(server.id).await?;
                tracing::info!(
                    target: "rooms.service.lifecycle",
                    room_id = %room.id,
                    meeting_id = %meeting.id,
                    server_id = %server.id,
                    "Meeting started"
                );
                metrics::record_start("started");

                let started = Meeting {
                    start: Some(Utc::now()),
                    ..meeting
                };
                self.join_url(&server, &started, access, &ctx.settings, name, consent)
            }
            Err(err) => {
                let reason = classify_start_failure(&err);
                tracing::warn!(
                    target: "rooms.service.lifecycle",
                    room_id = %room.id,
                    server_id = %server.id,
                    reason = reason.as_str(),
                    error = %err,
                    "Meeting create failed"
                );

                if self.servers.mark_unhealthy(server.id).await? {
                    metrics::record_server_status_change("unhealthy");
                }
                self.meetings
                    .discard_pending(&meeting, room.latest_meeting_id)
                    .await?;

                Err(RoomError::RoomStartFailed(reason))
            }
        }
    }

    // ------------------------------------------------------------------------
    // Join
    // ------------------------------------------------------------------------

    async fn join_inner(&self, room_id: &RoomId, request: &RoomRequest) -> Result<String, RoomError> {
        let ctx = self.load_room(room_id).await?;
        let access = self
            .authorize(&ctx, request.user.as_ref(), &request.credentials)
            .await?;
        let name = participant_name(&access, request)?;

        let meeting = self
            .latest_meeting(&ctx.room)
            .await?
            .filter(Meeting::is_running)
            .ok_or(RoomError::RoomNotRunning)?;

        let consent = check_consent(ConsentRequirements::from_meeting(&meeting), &request.consent)?;
        let server = self.server_of(&meeting).await?;

        let info = self
            .bounded(self.conferencing.get_meeting_info(&server, &meeting.id))
            .await
            .map_err(|err| {
                tracing::warn!(
                    target: "rooms.service.lifecycle",
                    meeting_id = %meeting.id,
                    server_id = %server.id,
                    error = %err,
                    "Meeting info request failed"
                );
                RoomError::JoinFailed(err.to_string())
            })?;

        match info {
            Some(info) if !info.ended => {
                self.join_url(&server, &meeting, &access, &ctx.settings, &name, consent)
            }
            _ => {
                tracing::info!(
                    target: "rooms.service.lifecycle",
                    meeting_id = %meeting.id,
                    "Server no longer hosts meeting, marking ended"
                );
                self.meetings.mark_ended(meeting.id, Utc::now()).await?;
                Err(RoomError::RoomNotRunning)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    async fn load_room(&self, room_id: &RoomId) -> Result<RoomContext, RoomError> {
        let room = self
            .rooms
            .get_room(room_id)
            .await?
            .ok_or_else(|| RoomError::NotFound("Room not found".to_string()))?;
        let room_type = self
            .rooms
            .get_room_type(room.room_type_id)
            .await?
            .ok_or_else(|| RoomError::NotFound("Room type not found".to_string()))?;
        let settings = resolve_settings(&room_type, &room);
        Ok(RoomContext {
            room,
            room_type,
            settings,
        })
    }

    async fn authorize(
        &self,
        ctx: &RoomContext,
        user: Option<&AuthenticatedUser>,
        credentials: &Credentials,
    ) -> Result<Access, RoomError> {
        let membership = match user {
            Some(user) => self.rooms.get_membership(&ctx.room.id, user.id).await?,
            None => None,
        };
        let token = match credentials.token.as_deref() {
            Some(token) => self.rooms.find_token(&ctx.room.id, token).await?,
            None => None,
        };

        let now = Utc::now();
        let access = evaluate_access(&AccessRequest {
            room: &ctx.room,
            room_type: &ctx.room_type,
            settings: &ctx.settings,
            user,
            membership,
            credentials,
            token: token.as_ref(),
            token_lifetime: self.config.token_lifetime,
            now,
        })?;

        if let Some(token) = &token {
            self.rooms.touch_token(&ctx.room.id, &token.token, now).await?;
        }

        tracing::debug!(
            target: "rooms.service.lifecycle",
            room_id = %ctx.room.id,
            role = access.role.as_str(),
            "Access granted"
        );
        Ok(access)
    }

    async fn latest_meeting(&self, room: &Room) -> Result<Option<Meeting>, RoomError> {
        match room.latest_meeting_id {
            Some(id) => self.meetings.get_meeting(id).await,
            None => Ok(None),
        }
    }

    async fn server_of(&self, meeting: &Meeting) -> Result<Server, RoomError> {
        self.servers
            .get_server(meeting.server_id)
            .await?
            .ok_or_else(|| RoomError::NotFound("Server not found".to_string()))
    }

    /// Apply the request timeout to one conferencing call.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, ConferencingError>>,
    ) -> Result<T, ConferencingError> {
        tokio::time::timeout(self.config.request_timeout, call)
            .await
            .unwrap_or(Err(ConferencingError::Timeout))
    }

    fn join_url(
        &self,
        server: &Server,
        meeting: &Meeting,
        access: &Access,
        settings: &EffectiveSettings,
        name: &str,
        consent: ConsentFlags,
    ) -> Result<String, RoomError> {
        let role = conference_role(access, settings);
        let params = JoinParams {
            meeting_id: meeting.id,
            full_name: name.to_string(),
            role,
            user_id: match access.user_id {
                Some(id) => format!("user-{id}"),
                None => format!("guest-{}", uuid::Uuid::new_v4().simple()),
            },
            guest: joins_via_lobby(access, role, settings),
            record_video_consent: consent.record_video,
            custom_style_url: self.config.custom_style_url.clone(),
        };
        self.conferencing.join_url(server, &params).map_err(|err| {
            tracing::error!(
                target: "rooms.service.lifecycle",
                meeting_id = %meeting.id,
                error = %err,
                "Failed to build join URL"
            );
            RoomError::JoinFailed(err.to_string())
        })
    }
}

/// Name shown in the meeting.
///
/// Signed-in users use their identity's name. Token holders use the token's
/// name and guests must supply one; both are checked before use.
fn participant_name(access: &Access, request: &RoomRequest) -> Result<String, RoomError> {
    if access.token_role.is_none() && access.user_id.is_some() {
        return Ok(access.display_name.clone().unwrap_or_default());
    }

    let name = if access.token_role.is_some() {
        access.display_name.clone()
    } else {
        request.name.as_deref().map(|n| n.trim().to_string())
    };
    let name = name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| RoomError::ValidationFailed(FieldErrors::single("name", "is required")))?;

    validate_display_name(&name)?;
    Ok(name)
}

fn classify_start_failure(err: &ConferencingError) -> StartFailureReason {
    match err {
        ConferencingError::Timeout => StartFailureReason::Timeout,
        ConferencingError::Unreachable(_) => StartFailureReason::Unreachable,
        ConferencingError::InvalidChecksum => StartFailureReason::InvalidChecksum,
        ConferencingError::Malformed(_) => StartFailureReason::MalformedResponse,
        ConferencingError::Rejected { key, .. } => StartFailureReason::Rejected(key.clone()),
    }
}
