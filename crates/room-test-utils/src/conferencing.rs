//! Scripted conferencing client.

use async_trait::async_trait;
use common::types::MeetingId;
use room_service::models::{MeetingUsage, Server};
use room_service::services::conferencing_client::{
    CreateMeetingParams, JoinParams, MeetingInfo,
};
use room_service::services::{ConferencingClient, ConferencingError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// What `getMeetingInfo` answers.
#[derive(Debug, Clone)]
pub enum InfoResponse {
    /// The server hosts the meeting and it has not ended.
    Running,
    /// The server knows the meeting but nobody is in it yet.
    Idle,
    /// The server reports the meeting as ended.
    Ended,
    /// The server does not know the meeting.
    Unknown,
    Fail(ConferencingError),
}

/// Conferencing client with scripted answers and call counters.
///
/// `create` and `end` pop their next result from a queue and succeed once
/// the queue is empty. Every create and join is recorded for inspection.
pub struct MockConferencingClient {
    create_results: Mutex<VecDeque<Result<(), ConferencingError>>>,
    end_results: Mutex<VecDeque<Result<(), ConferencingError>>>,
    info_response: Mutex<InfoResponse>,
    meetings_response: Mutex<Result<Vec<MeetingInfo>, ConferencingError>>,
    create_delay: Mutex<Option<Duration>>,
    created: Mutex<Vec<CreateMeetingParams>>,
    joins: Mutex<Vec<JoinParams>>,
    ended: Mutex<Vec<MeetingId>>,
    create_calls: AtomicUsize,
    info_calls: AtomicUsize,
    meetings_calls: AtomicUsize,
    end_calls: AtomicUsize,
}

impl Default for MockConferencingClient {
    fn default() -> Self {
        Self {
            create_results: Mutex::new(VecDeque::new()),
            end_results: Mutex::new(VecDeque::new()),
            info_response: Mutex::new(InfoResponse::Running),
            meetings_response: Mutex::new(Ok(Vec::new())),
            create_delay: Mutex::new(None),
            created: Mutex::new(Vec::new()),
            joins: Mutex::new(Vec::new()),
            ended: Mutex::new(Vec::new()),
            create_calls: AtomicUsize::new(0),
            info_calls: AtomicUsize::new(0),
            meetings_calls: AtomicUsize::new(0),
            end_calls: AtomicUsize::new(0),
        }
    }
}

impl MockConferencingClient {
    /// A client whose servers accept every call.
    pub fn accepting() -> Self {
        Self::default()
    }

    /// Queue the result of the next `create`.
    pub fn push_create_result(&self, result: Result<(), ConferencingError>) {
        self.create_results.lock().unwrap().push_back(result);
    }

    /// Queue the result of the next `end`.
    pub fn push_end_result(&self, result: Result<(), ConferencingError>) {
        self.end_results.lock().unwrap().push_back(result);
    }

    pub fn set_info_response(&self, response: InfoResponse) {
        *self.info_response.lock().unwrap() = response;
    }

    pub fn set_meetings_response(&self, response: Result<Vec<MeetingInfo>, ConferencingError>) {
        *self.meetings_response.lock().unwrap() = response;
    }

    /// Hold every `create` for `delay` before answering.
    pub fn set_create_delay(&self, delay: Duration) {
        *self.create_delay.lock().unwrap() = Some(delay);
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn info_calls(&self) -> usize {
        self.info_calls.load(Ordering::SeqCst)
    }

    pub fn meetings_calls(&self) -> usize {
        self.meetings_calls.load(Ordering::SeqCst)
    }

    pub fn end_calls(&self) -> usize {
        self.end_calls.load(Ordering::SeqCst)
    }

    /// Parameters of every `create` call, in order.
    pub fn created(&self) -> Vec<CreateMeetingParams> {
        self.created.lock().unwrap().clone()
    }

    /// Parameters of every join URL handed out, in order.
    pub fn joins(&self) -> Vec<JoinParams> {
        self.joins.lock().unwrap().clone()
    }

    pub fn last_join(&self) -> JoinParams {
        self.joins
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no join URL was built")
    }

    /// Meetings `end` was called for, in order.
    pub fn ended(&self) -> Vec<MeetingId> {
        self.ended.lock().unwrap().clone()
    }
}

/// Meeting info as a server would report it.
pub fn meeting_info(meeting_id: &MeetingId, participants: i32) -> MeetingInfo {
    MeetingInfo {
        meeting_id: meeting_id.to_string(),
        running: participants > 0,
        ended: false,
        usage: MeetingUsage {
            participant_count: participants,
            video_count: participants / 2,
            ..MeetingUsage::default()
        },
    }
}

#[async_trait]
impl ConferencingClient for MockConferencingClient {
    async fn create(
        &self,
        _server: &Server,
        params: &CreateMeetingParams,
    ) -> Result<(), ConferencingError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.created.lock().unwrap().push(params.clone());

        let delay = *self.create_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.create_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn get_meeting_info(
        &self,
        _server: &Server,
        meeting_id: &MeetingId,
    ) -> Result<Option<MeetingInfo>, ConferencingError> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        let response = self.info_response.lock().unwrap().clone();
        match response {
            InfoResponse::Running => Ok(Some(meeting_info(meeting_id, 3))),
            InfoResponse::Idle => Ok(Some(meeting_info(meeting_id, 0))),
            InfoResponse::Ended => Ok(Some(MeetingInfo {
                ended: true,
                ..meeting_info(meeting_id, 0)
            })),
            InfoResponse::Unknown => Ok(None),
            InfoResponse::Fail(err) => Err(err),
        }
    }

    async fn get_meetings(&self, _server: &Server) -> Result<Vec<MeetingInfo>, ConferencingError> {
        self.meetings_calls.fetch_add(1, Ordering::SeqCst);
        self.meetings_response.lock().unwrap().clone()
    }

    async fn end(&self, _server: &Server, meeting_id: &MeetingId) -> Result<(), ConferencingError> {
        self.end_calls.fetch_add(1, Ordering::SeqCst);
        self.ended.lock().unwrap().push(*meeting_id);
        self.end_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }

    fn join_url(&self, server: &Server, params: &JoinParams) -> Result<String, ConferencingError> {
        self.joins.lock().unwrap().push(params.clone());
        Ok(format!(
            "{}/api/join?meetingID={}&role={}&guest={}",
            server.base_url,
            params.meeting_id,
            params.role.as_api_str(),
            params.guest
        ))
    }
}
