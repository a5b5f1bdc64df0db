//! Server health checker integration tests.
//!
//! Runs health rounds against the in-memory store with scripted
//! `getMeetings` answers.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use common::types::{RoomId, ServerId};
use room_service::models::{Meeting, ServerLoad, ServerStatus};
use room_service::services::ConferencingError;
use room_service::tasks::start_server_health_checker;
use room_test_utils::conferencing::meeting_info;
use room_test_utils::{fixtures, TestEnv, OWNER_ID};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const THRESHOLD: u32 = 3;

fn running_meeting(env: &TestEnv, code: &str) -> Meeting {
    env.store.insert_room(fixtures::room(code, OWNER_ID, 1));
    let meeting = Meeting {
        start: Some(chrono::Utc::now()),
        ..Meeting::pending(RoomId::new(code), ServerId(1), false, false)
    };
    env.store.insert_meeting(meeting.clone());
    meeting
}

#[tokio::test]
async fn test_successful_check_brings_server_online() -> Result<()> {
    let env = TestEnv::new();
    let mut server = fixtures::server(1, 1);
    server.status = ServerStatus::Unhealthy;
    server.error_count = 2;
    env.store.insert_server(server);

    let reported = running_meeting(&env, "abc-def-123");
    let mut ended = meeting_info(&common::types::MeetingId::new(), 4);
    ended.ended = true;
    env.conferencing
        .set_meetings_response(Ok(vec![meeting_info(&reported.id, 6), ended]));

    env.health_checker(THRESHOLD).check_all().await?;

    let server = env.store.server(ServerId(1)).unwrap();
    assert_eq!(server.status, ServerStatus::Online);
    assert_eq!(server.error_count, 0);
    assert_eq!(
        server.load,
        ServerLoad {
            meeting_count: 1,
            participant_count: 6,
            video_count: 3,
        }
    );

    let meeting = env.store.meeting(reported.id).unwrap();
    assert_eq!(meeting.usage.participant_count, 6);
    assert_eq!(meeting.detached, None);

    Ok(())
}

#[tokio::test]
async fn test_unreported_meeting_is_detached_once() -> Result<()> {
    let env = TestEnv::new();
    env.store.insert_server(fixtures::server(1, 1));
    let lost = running_meeting(&env, "abc-def-123");
    let checker = env.health_checker(THRESHOLD);

    checker.check_all().await?;
    let detached = env.store.meeting(lost.id).unwrap().detached;
    assert!(detached.is_some());

    checker.check_all().await?;
    assert_eq!(env.store.meeting(lost.id).unwrap().detached, detached);
    assert!(env.store.meeting(lost.id).unwrap().is_running());

    Ok(())
}

#[tokio::test]
async fn test_failures_escalate_to_offline() -> Result<()> {
    let env = TestEnv::new();
    env.store.insert_server(fixtures::server(1, 1));
    env.conferencing
        .set_meetings_response(Err(ConferencingError::Unreachable("refused".into())));
    let checker = env.health_checker(THRESHOLD);

    checker.check_all().await?;
    let server = env.store.server(ServerId(1)).unwrap();
    assert_eq!(server.status, ServerStatus::Unhealthy);
    assert_eq!(server.error_count, 1);

    checker.check_all().await?;
    checker.check_all().await?;
    let server = env.store.server(ServerId(1)).unwrap();
    assert_eq!(server.status, ServerStatus::Offline);
    assert_eq!(server.error_count, 3);

    env.conferencing.set_meetings_response(Ok(Vec::new()));
    checker.check_all().await?;
    let server = env.store.server(ServerId(1)).unwrap();
    assert_eq!(server.status, ServerStatus::Online);
    assert_eq!(server.error_count, 0);

    Ok(())
}

#[tokio::test]
async fn test_failure_keeps_previous_load() -> Result<()> {
    let env = TestEnv::new();
    let mut server = fixtures::server(1, 1);
    server.load.meeting_count = 2;
    env.store.insert_server(server);
    env.conferencing
        .set_meetings_response(Err(ConferencingError::Timeout));

    env.health_checker(THRESHOLD).check_all().await?;

    assert_eq!(env.store.server(ServerId(1)).unwrap().load.meeting_count, 2);

    Ok(())
}

#[tokio::test]
async fn test_disabled_server_is_not_polled() -> Result<()> {
    let env = TestEnv::new();
    let mut server = fixtures::server(1, 1);
    server.status = ServerStatus::Disabled;
    env.store.insert_server(server);

    env.health_checker(THRESHOLD).check_all().await?;

    assert_eq!(env.conferencing.meetings_calls(), 0);
    assert_eq!(env.store.server(ServerId(1)).unwrap().status, ServerStatus::Disabled);

    Ok(())
}

#[tokio::test]
async fn test_server_disabled_during_check_stays_disabled() -> Result<()> {
    let env = TestEnv::new();
    let server = fixtures::server(1, 1);
    env.store.insert_server(server.clone());

    // Simulate a panic landing between listing and storing the result.
    env.store.insert_server(room_service::models::Server {
        status: ServerStatus::Disabled,
        ..server.clone()
    });

    let status = env.health_checker(THRESHOLD).check_server(&server).await?;

    assert_eq!(status, None);
    assert_eq!(env.store.server(ServerId(1)).unwrap().status, ServerStatus::Disabled);

    Ok(())
}

#[tokio::test]
async fn test_health_checker_task_stops_on_cancel() -> Result<()> {
    let env = TestEnv::new();
    env.store.insert_server(fixtures::server(1, 1));
    let cancel = CancellationToken::new();

    let task = tokio::spawn(start_server_health_checker(
        env.health_checker(THRESHOLD),
        Duration::from_millis(20),
        cancel.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(70)).await;
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), task).await??;

    assert!(env.conferencing.meetings_calls() >= 2);

    Ok(())
}
