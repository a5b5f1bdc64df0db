//! Conferencing server API client.
//!
//! Talks to BigBlueButton-compatible servers. Every call is a GET to
//! `{base_url}/api/{call}?{query}&checksum={digest}` where the digest is
//! computed over `call + query + secret`. Responses are XML documents with a
//! `returncode` of `SUCCESS` or `FAILED` and, on failure, a `messageKey`.
//!
//! # Security
//!
//! - Server secrets never leave `Server::secret` except to compute digests
//! - Join URLs carry a checksum and are handed out only after access checks
//! - Connect and request timeouts are configured separately

use crate::config::ChecksumAlgorithm;
use crate::models::{MeetingUsage, Server};
use crate::observability::metrics;
use crate::services::access::ConferenceRole;
use crate::services::settings::EffectiveSettings;
use async_trait::async_trait;
use common::secret::ExposeSecret;
use common::types::MeetingId;
use reqwest::{Client, Url};
use ring::digest;
use serde::Deserialize;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{instrument, warn};

/// Failure talking to a conferencing server.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConferencingError {
    #[error("request timed out")]
    Timeout,

    #[error("server unreachable: {0}")]
    Unreachable(String),

    #[error("checksum rejected by server")]
    InvalidChecksum,

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("request rejected: {key}")]
    Rejected { key: String, message: String },
}

impl ConferencingError {
    /// The server does not know the meeting.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConferencingError::Rejected { key, .. } if key == "notFound")
    }

    fn status_label(&self) -> &'static str {
        match self {
            ConferencingError::Timeout => "timeout",
            _ => "error",
        }
    }
}

/// Parameters of a new meeting.
#[derive(Debug, Clone)]
pub struct CreateMeetingParams {
    pub meeting_id: MeetingId,
    pub name: String,
    pub settings: EffectiveSettings,
    /// Signed URL the server calls when the meeting ends.
    pub end_callback_url: String,
    pub logout_url: Option<String>,
}

/// Parameters of a join URL.
#[derive(Debug, Clone)]
pub struct JoinParams {
    pub meeting_id: MeetingId,
    pub full_name: String,
    pub role: ConferenceRole,
    pub user_id: String,
    /// Send the participant to the waiting room.
    pub guest: bool,
    pub record_video_consent: bool,
    pub custom_style_url: Option<String>,
}

/// State of one meeting as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingInfo {
    pub meeting_id: String,
    /// Media is flowing. A freshly created meeting reports `false` until the
    /// first participant joins.
    pub running: bool,
    /// The server has ended the meeting but still reports it.
    pub ended: bool,
    pub usage: MeetingUsage,
}

/// Conferencing server operations used by the engine.
#[async_trait]
pub trait ConferencingClient: Send + Sync {
    /// Create a meeting.
    async fn create(
        &self,
        server: &Server,
        params: &CreateMeetingParams,
    ) -> Result<(), ConferencingError>;

    /// Look up a meeting. `Ok(None)` means the server does not know it.
    async fn get_meeting_info(
        &self,
        server: &Server,
        meeting_id: &MeetingId,
    ) -> Result<Option<MeetingInfo>, ConferencingError>;

    /// All meetings the server currently hosts.
    async fn get_meetings(&self, server: &Server) -> Result<Vec<MeetingInfo>, ConferencingError>;

    /// End a meeting.
    async fn end(&self, server: &Server, meeting_id: &MeetingId) -> Result<(), ConferencingError>;

    /// Build a signed join URL. Makes no request.
    fn join_url(&self, server: &Server, params: &JoinParams) -> Result<String, ConferencingError>;
}

// ============================================================================
// Wire format
// ============================================================================

/// Fields every response carries.
#[derive(Debug, Deserialize)]
struct Envelope {
    returncode: String,
    #[serde(rename = "messageKey", default)]
    message_key: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MeetingsResponse {
    #[serde(default)]
    meetings: Option<MeetingsElement>,
}

#[derive(Debug, Default, Deserialize)]
struct MeetingsElement {
    #[serde(default)]
    meeting: Vec<MeetingElement>,
}

#[derive(Debug, Default, Deserialize)]
struct MeetingElement {
    #[serde(rename = "meetingID", default)]
    meeting_id: Option<String>,
    #[serde(default)]
    running: Option<bool>,
    #[serde(rename = "hasBeenForciblyEnded", default)]
    has_been_forcibly_ended: Option<bool>,
    #[serde(rename = "endTime", default)]
    end_time: Option<i64>,
    #[serde(rename = "participantCount", default)]
    participant_count: Option<i32>,
    #[serde(rename = "listenerCount", default)]
    listener_count: Option<i32>,
    #[serde(rename = "voiceParticipantCount", default)]
    voice_participant_count: Option<i32>,
    #[serde(rename = "videoCount", default)]
    video_count: Option<i32>,
    #[serde(rename = "moderatorCount", default)]
    moderator_count: Option<i32>,
}

impl MeetingElement {
    fn into_info(self) -> Option<MeetingInfo> {
        let meeting_id = self.meeting_id?;
        Some(MeetingInfo {
            meeting_id,
            running: self.running.unwrap_or(false),
            ended: self.has_been_forcibly_ended.unwrap_or(false)
                || self.end_time.is_some_and(|t| t > 0),
            usage: MeetingUsage {
                participant_count: self.participant_count.unwrap_or(0),
                listener_count: self.listener_count.unwrap_or(0),
                voice_participant_count: self.voice_participant_count.unwrap_or(0),
                video_count: self.video_count.unwrap_or(0),
                moderator_count: self.moderator_count.unwrap_or(0),
            },
        })
    }
}

/// Check the envelope of a response body.
fn parse_envelope(body: &str) -> Result<(), ConferencingError> {
    let envelope: Envelope = quick_xml::de::from_str(body)
        .map_err(|e| ConferencingError::Malformed(e.to_string()))?;

    match envelope.returncode.as_str() {
        "SUCCESS" => Ok(()),
        "FAILED" => {
            let key = envelope.message_key.unwrap_or_default();
            if key == "checksumError" {
                return Err(ConferencingError::InvalidChecksum);
            }
            Err(ConferencingError::Rejected {
                key,
                message: envelope.message.unwrap_or_default(),
            })
        }
        other => Err(ConferencingError::Malformed(format!(
            "unexpected returncode '{other}'"
        ))),
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, ConferencingError> {
    quick_xml::de::from_str(body).map_err(|e| ConferencingError::Malformed(e.to_string()))
}

fn bool_param(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

// ============================================================================
// HTTP client
// ============================================================================

/// HTTP client for BigBlueButton-compatible servers.
#[derive(Clone)]
pub struct BbbClient {
    /// HTTP client with configured timeouts.
    client: Client,
    checksum_algorithm: ChecksumAlgorithm,
}

impl BbbClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns `ConferencingError::Unreachable` if the HTTP client cannot be
    /// built.
    pub fn new(
        connect_timeout: Duration,
        request_timeout: Duration,
        checksum_algorithm: ChecksumAlgorithm,
    ) -> Result<Self, ConferencingError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| {
                tracing::error!(target: "rooms.service.conferencing", error = %e, "Failed to build HTTP client");
                ConferencingError::Unreachable("HTTP client unavailable".to_string())
            })?;

        Ok(Self {
            client,
            checksum_algorithm,
        })
    }

    fn checksum(&self, call: &str, query: &str, secret: &str) -> String {
        let algorithm = match self.checksum_algorithm {
            ChecksumAlgorithm::Sha1 => &digest::SHA1_FOR_LEGACY_USE_ONLY,
            ChecksumAlgorithm::Sha256 => &digest::SHA256,
        };
        let mut ctx = digest::Context::new(algorithm);
        ctx.update(call.as_bytes());
        ctx.update(query.as_bytes());
        ctx.update(secret.as_bytes());
        hex::encode(ctx.finish().as_ref())
    }

    /// Signed API URL for `call` with the given query parameters.
    fn signed_url(
        &self,
        server: &Server,
        call: &str,
        params: &[(&str, &str)],
    ) -> Result<Url, ConferencingError> {
        let base = format!("{}/api/{}", server.base_url.trim_end_matches('/'), call);
        let mut url = Url::parse(&base)
            .map_err(|e| ConferencingError::Unreachable(format!("invalid server URL: {e}")))?;

        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        let query = url.query().unwrap_or("").to_string();
        let checksum = self.checksum(call, &query, server.secret.expose_secret());
        url.query_pairs_mut().append_pair("checksum", &checksum);

        Ok(url)
    }

    async fn call(
        &self,
        server: &Server,
        call: &'static str,
        params: &[(&str, &str)],
    ) -> Result<String, ConferencingError> {
        let url = self.signed_url(server, call, params)?;
        let started = Instant::now();

        let result = self.send(url).await;

        let status = match &result {
            Ok(_) => "success",
            Err(e) => e.status_label(),
        };
        metrics::record_conferencing_request(call, status, started.elapsed());

        if let Err(e) = &result {
            warn!(
                target: "rooms.service.conferencing",
                server_id = %server.id,
                call = call,
                error = %e,
                "Conferencing request failed"
            );
        }

        result
    }

    async fn send(&self, url: Url) -> Result<String, ConferencingError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ConferencingError::Timeout
            } else {
                ConferencingError::Unreachable(e.without_url().to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConferencingError::Unreachable(format!("HTTP {status}")));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ConferencingError::Timeout
            } else {
                ConferencingError::Malformed(e.without_url().to_string())
            }
        })?;

        parse_envelope(&body)?;
        Ok(body)
    }
}

#[async_trait]
impl ConferencingClient for BbbClient {
    #[instrument(skip_all, fields(server_id = %server.id, meeting_id = %params.meeting_id))]
    async fn create(
        &self,
        server: &Server,
        params: &CreateMeetingParams,
    ) -> Result<(), ConferencingError> {
        let s = &params.settings;
        let meeting_id = params.meeting_id.to_string();
        let guest_policy = match s.lobby {
            crate::models::LobbyMode::Disabled => "ALWAYS_ACCEPT",
            _ => "ASK_MODERATOR",
        };

        let mut query: Vec<(&str, &str)> = vec![
            ("name", params.name.as_str()),
            ("meetingID", meeting_id.as_str()),
            ("record", bool_param(s.record)),
            ("autoStartRecording", bool_param(s.auto_start_recording)),
            ("allowStartStopRecording", bool_param(s.record)),
            ("muteOnStart", bool_param(s.mute_on_start)),
            (
                "webcamsOnlyForModerator",
                bool_param(s.webcams_only_for_moderator),
            ),
            ("lockSettingsDisableCam", bool_param(s.lock_settings_disable_cam)),
            ("lockSettingsDisableMic", bool_param(s.lock_settings_disable_mic)),
            (
                "lockSettingsDisablePrivateChat",
                bool_param(s.lock_settings_disable_private_chat),
            ),
            (
                "lockSettingsDisablePublicChat",
                bool_param(s.lock_settings_disable_public_chat),
            ),
            ("lockSettingsDisableNote", bool_param(s.lock_settings_disable_note)),
            (
                "lockSettingsHideUserList",
                bool_param(s.lock_settings_hide_user_list),
            ),
            ("lockSettingsLockOnJoin", "true"),
            ("guestPolicy", guest_policy),
            ("meta_endCallbackUrl", params.end_callback_url.as_str()),
            ("meta_record-attendance", bool_param(s.record_attendance)),
        ];
        if let Some(logout_url) = &params.logout_url {
            query.push(("logoutURL", logout_url.as_str()));
        }

        self.call(server, "create", &query).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(server_id = %server.id, meeting_id = %meeting_id))]
    async fn get_meeting_info(
        &self,
        server: &Server,
        meeting_id: &MeetingId,
    ) -> Result<Option<MeetingInfo>, ConferencingError> {
        let id = meeting_id.to_string();
        match self
            .call(server, "getMeetingInfo", &[("meetingID", id.as_str())])
            .await
        {
            Ok(body) => parse_body::<MeetingElement>(&body)?
                .into_info()
                .map(Some)
                .ok_or_else(|| ConferencingError::Malformed("missing meetingID".to_string())),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip_all, fields(server_id = %server.id))]
    async fn get_meetings(&self, server: &Server) -> Result<Vec<MeetingInfo>, ConferencingError> {
        let body = self.call(server, "getMeetings", &[]).await?;
        let response: MeetingsResponse = parse_body(&body)?;
        Ok(response
            .meetings
            .map(|m| {
                m.meeting
                    .into_iter()
                    .filter_map(MeetingElement::into_info)
                    .collect()
            })
            .unwrap_or_default())
    }

    #[instrument(skip_all, fields(server_id = %server.id, meeting_id = %meeting_id))]
    async fn end(&self, server: &Server, meeting_id: &MeetingId) -> Result<(), ConferencingError> {
        let id = meeting_id.to_string();
        self.call(server, "end", &[("meetingID", id.as_str())])
            .await?;
        Ok(())
    }

    fn join_url(&self, server: &Server, params: &JoinParams) -> Result<String, ConferencingError> {
        let meeting_id = params.meeting_id.to_string();
        let mut query: Vec<(&str, &str)> = vec![
            ("fullName", params.full_name.as_str()),
            ("meetingID", meeting_id.as_str()),
            ("role", params.role.as_api_str()),
            ("userID", params.user_id.as_str()),
            ("guest", bool_param(params.guest)),
            (
                "userdata-bbb_record_video",
                bool_param(params.record_video_consent),
            ),
        ];
        if let Some(style) = &params.custom_style_url {
            query.push(("userdata-bbb_custom_style_url", style.as_str()));
        }

        Ok(self.signed_url(server, "join", &query)?.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::{RoomSettings, ServerLoad, ServerStatus};
    use common::secret::SecretString;
    use common::types::{ServerId, ServerPoolId};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SECRET: &str = "test-shared-secret";

    fn server(base_url: &str) -> Server {
        Server {
            id: ServerId(1),
            name: "bbb-1".to_string(),
            base_url: base_url.to_string(),
            secret: SecretString::from(SECRET),
            strength: 1,
            pool_ids: vec![ServerPoolId(1)],
            status: ServerStatus::Online,
            error_count: 0,
            load: ServerLoad::default(),
        }
    }

    fn client() -> BbbClient {
        BbbClient::new(
            Duration::from_secs(1),
            Duration::from_millis(500),
            ChecksumAlgorithm::Sha256,
        )
        .unwrap()
    }

    fn sha256_hex(input: &str) -> String {
        hex::encode(digest::digest(&digest::SHA256, input.as_bytes()).as_ref())
    }

    fn xml(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .insert_header("content-type", "text/xml")
            .set_body_string(body)
    }

    #[test]
    fn test_join_url_is_signed_over_call_query_and_secret() {
        let client = client();
        let server = server("https://bbb.example.com/bigbluebutton/");
        let meeting_id = MeetingId::new();

        let url = client
            .join_url(
                &server,
                &JoinParams {
                    meeting_id,
                    full_name: "Ada Lovelace".to_string(),
                    role: ConferenceRole::Viewer,
                    user_id: "42".to_string(),
                    guest: false,
                    record_video_consent: true,
                    custom_style_url: None,
                },
            )
            .unwrap();

        let url = Url::parse(&url).unwrap();
        assert_eq!(url.path(), "/bigbluebutton/api/join");

        let full_query = url.query().unwrap();
        let (query, checksum) = full_query.rsplit_once("&checksum=").unwrap();
        assert_eq!(checksum, sha256_hex(&format!("join{query}{SECRET}")));

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("fullName".to_string(), "Ada Lovelace".to_string())));
        assert!(pairs.contains(&("meetingID".to_string(), meeting_id.to_string())));
        assert!(pairs.contains(&("role".to_string(), "VIEWER".to_string())));
        assert!(pairs.contains(&("userdata-bbb_record_video".to_string(), "true".to_string())));
        assert!(!full_query.contains(SECRET));
    }

    #[test]
    fn test_sha1_checksum() {
        let client = BbbClient::new(
            Duration::from_secs(1),
            Duration::from_secs(1),
            ChecksumAlgorithm::Sha1,
        )
        .unwrap();

        let checksum = client.checksum("getMeetings", "", "secret");
        assert_eq!(checksum.len(), 40);
    }

    #[test]
    fn test_parse_failed_checksum() {
        let body = "<response><returncode>FAILED</returncode><messageKey>checksumError</messageKey><message>Checksums do not match</message></response>";
        assert_eq!(
            parse_envelope(body).unwrap_err(),
            ConferencingError::InvalidChecksum
        );
    }

    #[test]
    fn test_parse_garbage_is_malformed() {
        assert!(matches!(
            parse_envelope("<html>502 Bad Gateway</html>"),
            Err(ConferencingError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_create_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bigbluebutton/api/create"))
            .and(query_param("record", "true"))
            .respond_with(xml(
                "<response><returncode>SUCCESS</returncode><meetingID>m</meetingID></response>",
            ))
            .expect(1)
            .mount(&mock_server)
            .await;

        let server = server(&format!("{}/bigbluebutton", mock_server.uri()));
        let params = CreateMeetingParams {
            meeting_id: MeetingId::new(),
            name: "Lecture".to_string(),
            settings: RoomSettings {
                record: true,
                ..RoomSettings::default()
            },
            end_callback_url: "https://rooms.example.com/callbacks/meetings/x/end?salt=y"
                .to_string(),
            logout_url: None,
        };

        client().create(&server, &params).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/create"))
            .respond_with(xml(
                "<response><returncode>FAILED</returncode><messageKey>idNotUnique</messageKey><message>duplicate</message></response>",
            ))
            .mount(&mock_server)
            .await;

        let server = server(&mock_server.uri());
        let params = CreateMeetingParams {
            meeting_id: MeetingId::new(),
            name: "Lecture".to_string(),
            settings: RoomSettings::default(),
            end_callback_url: "https://rooms.example.com/cb".to_string(),
            logout_url: None,
        };

        let err = client().create(&server, &params).await.unwrap_err();
        assert!(matches!(err, ConferencingError::Rejected { key, .. } if key == "idNotUnique"));
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/getMeetings"))
            .respond_with(
                xml("<response><returncode>SUCCESS</returncode></response>")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&mock_server)
            .await;

        let err = client()
            .get_meetings(&server(&mock_server.uri()))
            .await
            .unwrap_err();
        assert_eq!(err, ConferencingError::Timeout);
    }

    #[tokio::test]
    async fn test_http_error_is_unreachable() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let err = client()
            .get_meetings(&server(&mock_server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, ConferencingError::Unreachable(_)));
    }

    #[tokio::test]
    async fn test_get_meeting_info_not_found_is_none() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/getMeetingInfo"))
            .respond_with(xml(
                "<response><returncode>FAILED</returncode><messageKey>notFound</messageKey><message>We could not find a meeting with that meeting ID</message></response>",
            ))
            .mount(&mock_server)
            .await;

        let info = client()
            .get_meeting_info(&server(&mock_server.uri()), &MeetingId::new())
            .await
            .unwrap();
        assert_eq!(info, None);
    }

    #[tokio::test]
    async fn test_get_meeting_info_reports_usage() {
        let mock_server = MockServer::start().await;
        let meeting_id = MeetingId::new();
        Mock::given(method("GET"))
            .and(path("/api/getMeetingInfo"))
            .and(query_param("meetingID", meeting_id.to_string().as_str()))
            .respond_with(xml(&format!(
                "<response><returncode>SUCCESS</returncode><meetingName>Lecture</meetingName>\
                 <meetingID>{meeting_id}</meetingID><running>true</running>\
                 <hasBeenForciblyEnded>false</hasBeenForciblyEnded><endTime>0</endTime>\
                 <participantCount>12</participantCount><listenerCount>3</listenerCount>\
                 <voiceParticipantCount>4</voiceParticipantCount><videoCount>2</videoCount>\
                 <moderatorCount>1</moderatorCount><attendees><attendee><userID>1</userID></attendee></attendees>\
                 </response>"
            )))
            .mount(&mock_server)
            .await;

        let info = client()
            .get_meeting_info(&server(&mock_server.uri()), &meeting_id)
            .await
            .unwrap()
            .unwrap();

        assert!(info.running);
        assert!(!info.ended);
        assert_eq!(info.usage.participant_count, 12);
        assert_eq!(info.usage.video_count, 2);
        assert_eq!(info.usage.moderator_count, 1);
    }

    #[tokio::test]
    async fn test_get_meetings_lists_every_meeting() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/getMeetings"))
            .respond_with(xml(
                "<response><returncode>SUCCESS</returncode><meetings>\
                 <meeting><meetingID>a</meetingID><running>true</running><participantCount>5</participantCount></meeting>\
                 <meeting><meetingID>b</meetingID><running>false</running><endTime>1700000000000</endTime></meeting>\
                 </meetings></response>",
            ))
            .mount(&mock_server)
            .await;

        let meetings = client()
            .get_meetings(&server(&mock_server.uri()))
            .await
            .unwrap();

        assert_eq!(meetings.len(), 2);
        let first = meetings.first().unwrap();
        assert_eq!(first.meeting_id, "a");
        assert_eq!(first.usage.participant_count, 5);
        assert!(meetings.get(1).unwrap().ended);
    }

    #[tokio::test]
    async fn test_get_meetings_empty() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/getMeetings"))
            .respond_with(xml(
                "<response><returncode>SUCCESS</returncode><meetings/><messageKey>noMeetings</messageKey><message>no meetings were found on this server</message></response>",
            ))
            .mount(&mock_server)
            .await;

        let meetings = client()
            .get_meetings(&server(&mock_server.uri()))
            .await
            .unwrap();
        assert!(meetings.is_empty());
    }

    #[tokio::test]
    async fn test_end_not_found() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/end"))
            .respond_with(xml(
                "<response><returncode>FAILED</returncode><messageKey>notFound</messageKey><message>x</message></response>",
            ))
            .mount(&mock_server)
            .await;

        let err = client()
            .end(&server(&mock_server.uri()), &MeetingId::new())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
