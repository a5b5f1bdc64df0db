//! Meeting lifecycle integration tests.
//!
//! Drives `MeetingLifecycle` over the in-memory store, the scripted
//! conferencing client and the in-process start lock:
//!
//! - start: single create under concurrency, lock timeout, create failure
//!   rollback, server selection
//! - join: self-heal when the server lost the meeting, name and consent
//!   checks
//! - end: signed callback, moderator end, panic

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use chrono::Utc;
use common::types::{MeetingId, RoomId, RoomTypeId, ServerId};
use futures::future::join_all;
use room_service::errors::{RoomError, StartFailureReason};
use room_service::locks::{room_start_key, LockProvider};
use room_service::models::{Credentials, Meeting, ServerStatus, TokenRole, TypeSetting};
use room_service::services::access::ConferenceRole;
use room_service::services::consent::ConsentRequest;
use room_service::services::{ConferencingError, PanicReport};
use room_test_utils::{fixtures, InfoResponse, TestEnv, OWNER_ID};
use std::time::Duration;

// ============================================================================
// Test Helpers
// ============================================================================

const ROOM: &str = "abc-def-123";
const TOKEN: &str = "f0e1d2c3b4a5f0e1d2c3b4a5f0e1d2c3b4a5f0e1d2c3b4a5f0e1d2c3b4a5f0e1";

fn room_id() -> RoomId {
    RoomId::new(ROOM)
}

fn env_with_room() -> TestEnv {
    let env = TestEnv::new();
    env.seed_room(ROOM);
    env
}

fn allow_guests(env: &TestEnv) {
    env.store.update_room_type(RoomTypeId(1), |t| {
        t.settings.allow_guests = TypeSetting::suggested(true);
    });
}

/// Start the room as its owner and return the running meeting.
async fn start_as_owner(env: &TestEnv) -> Meeting {
    let owner = fixtures::user(OWNER_ID, "Room Owner");
    env.lifecycle
        .start(&room_id(), &fixtures::user_request(&owner))
        .await
        .expect("owner start should succeed");
    env.store
        .latest_meeting(&room_id())
        .expect("room should have a meeting")
}

// ============================================================================
// Start
// ============================================================================

#[tokio::test]
async fn test_owner_start_creates_running_meeting() -> Result<()> {
    let env = env_with_room();
    env.store
        .update_room(&room_id(), |room| room.delete_inactive = Some(Utc::now()));
    let owner = fixtures::user(OWNER_ID, "Room Owner");

    let url = env
        .lifecycle
        .start(&room_id(), &fixtures::user_request(&owner))
        .await?;

    assert!(url.contains("role=MODERATOR"));
    assert_eq!(env.conferencing.create_calls(), 1);

    let meeting = env.store.latest_meeting(&room_id()).unwrap();
    assert!(meeting.is_running());
    assert_eq!(meeting.server_id, ServerId(1));

    let room = env.store.room(&room_id()).unwrap();
    assert_eq!(room.delete_inactive, None);
    assert_eq!(env.store.server(ServerId(1)).unwrap().load.meeting_count, 1);

    let created = env.conferencing.created();
    let params = created.first().unwrap();
    assert_eq!(params.meeting_id, meeting.id);
    assert_eq!(
        params.end_callback_url,
        format!(
            "{}/callbacks/meetings/{}/end?salt={}",
            fixtures::TEST_PUBLIC_URL,
            meeting.id,
            env.signer.salt(&meeting.id)
        )
    );

    let join = env.conferencing.last_join();
    assert_eq!(join.role, ConferenceRole::Moderator);
    assert_eq!(join.full_name, "Room Owner");
    assert_eq!(join.user_id, format!("user-{OWNER_ID}"));

    Ok(())
}

#[tokio::test]
async fn test_concurrent_starts_create_exactly_one_meeting() -> Result<()> {
    let env = env_with_room();
    env.conferencing.set_create_delay(Duration::from_millis(150));
    let owner = fixtures::user(OWNER_ID, "Room Owner");
    let request = fixtures::user_request(&owner);

    let room = room_id();
    let results = join_all((0..5).map(|_| env.lifecycle.start(&room, &request))).await;

    for result in &results {
        assert!(result.is_ok(), "start failed: {result:?}");
    }
    assert_eq!(env.conferencing.create_calls(), 1);
    assert_eq!(env.store.meetings_of_room(&room_id()).len(), 1);

    let meeting = env.store.latest_meeting(&room_id()).unwrap();
    let joins = env.conferencing.joins();
    assert_eq!(joins.len(), 5);
    assert!(joins.iter().all(|j| j.meeting_id == meeting.id));

    Ok(())
}

#[tokio::test]
async fn test_start_fails_when_lock_is_held() -> Result<()> {
    let env = env_with_room();
    let _held = env
        .locks
        .try_acquire(&room_start_key(ROOM), Duration::from_secs(30))
        .await?
        .expect("lock should be free");
    let owner = fixtures::user(OWNER_ID, "Room Owner");

    let result = env
        .lifecycle
        .start(&room_id(), &fixtures::user_request(&owner))
        .await;

    assert!(matches!(result, Err(RoomError::AlreadyStarting)));
    assert_eq!(env.conferencing.create_calls(), 0);
    assert!(env.store.meetings_of_room(&room_id()).is_empty());

    Ok(())
}

#[tokio::test]
async fn test_create_failure_rolls_back_and_marks_server_unhealthy() -> Result<()> {
    let env = env_with_room();
    let previous = Meeting {
        start: Some(Utc::now() - chrono::Duration::hours(2)),
        end: Some(Utc::now() - chrono::Duration::hours(1)),
        ..Meeting::pending(room_id(), ServerId(1), false, false)
    };
    env.store.insert_meeting(previous.clone());
    env.conferencing
        .push_create_result(Err(ConferencingError::Unreachable("connection refused".into())));
    let owner = fixtures::user(OWNER_ID, "Room Owner");

    let result = env
        .lifecycle
        .start(&room_id(), &fixtures::user_request(&owner))
        .await;

    assert!(matches!(
        result,
        Err(RoomError::RoomStartFailed(StartFailureReason::Unreachable))
    ));
    assert_eq!(env.store.server(ServerId(1)).unwrap().status, ServerStatus::Unhealthy);

    let meetings = env.store.meetings_of_room(&room_id());
    assert_eq!(meetings.len(), 1);
    assert_eq!(meetings.first().unwrap().id, previous.id);
    assert_eq!(
        env.store.room(&room_id()).unwrap().latest_meeting_id,
        Some(previous.id)
    );

    // The only server is no longer online.
    let retry = env
        .lifecycle
        .start(&room_id(), &fixtures::user_request(&owner))
        .await;
    assert!(matches!(retry, Err(RoomError::NoServerAvailable)));
    assert_eq!(env.conferencing.create_calls(), 1);

    Ok(())
}

#[tokio::test]
async fn test_create_timeout_is_classified() -> Result<()> {
    let env = TestEnv::with_config(room_service::services::LifecycleConfig {
        request_timeout: Duration::from_millis(50),
        ..fixtures::lifecycle_config()
    });
    env.seed_room(ROOM);
    env.conferencing.set_create_delay(Duration::from_millis(300));
    let owner = fixtures::user(OWNER_ID, "Room Owner");

    let result = env
        .lifecycle
        .start(&room_id(), &fixtures::user_request(&owner))
        .await;

    assert!(matches!(
        result,
        Err(RoomError::RoomStartFailed(StartFailureReason::Timeout))
    ));
    assert!(env.store.latest_meeting(&room_id()).is_none());

    Ok(())
}

#[tokio::test]
async fn test_start_without_online_server_leaves_no_meeting() -> Result<()> {
    let env = env_with_room();
    env.store.update_room_type(RoomTypeId(1), |t| {
        t.server_pool_id = common::types::ServerPoolId(2);
    });
    let owner = fixtures::user(OWNER_ID, "Room Owner");

    let result = env
        .lifecycle
        .start(&room_id(), &fixtures::user_request(&owner))
        .await;

    assert!(matches!(result, Err(RoomError::NoServerAvailable)));
    assert_eq!(env.conferencing.create_calls(), 0);
    assert!(env.store.meetings_of_room(&room_id()).is_empty());

    Ok(())
}

#[tokio::test]
async fn test_start_picks_least_loaded_server() -> Result<()> {
    let env = env_with_room();
    let mut busy = fixtures::server(1, 1);
    busy.load.meeting_count = 4;
    env.store.insert_server(busy);
    env.store.insert_server(fixtures::server(2, 1));

    let meeting = start_as_owner(&env).await;

    assert_eq!(meeting.server_id, ServerId(2));

    Ok(())
}

#[tokio::test]
async fn test_start_abandons_unconfirmed_meeting() -> Result<()> {
    let env = env_with_room();
    let stale = Meeting::pending(room_id(), ServerId(1), false, false);
    env.store.insert_meeting(stale.clone());

    let meeting = start_as_owner(&env).await;

    assert_ne!(meeting.id, stale.id);
    assert!(env.store.meeting(stale.id).unwrap().has_ended());

    Ok(())
}

#[tokio::test]
async fn test_start_on_running_room_joins_without_create() -> Result<()> {
    let env = env_with_room();
    let meeting = start_as_owner(&env).await;
    let owner = fixtures::user(OWNER_ID, "Room Owner");

    env.lifecycle
        .start(&room_id(), &fixtures::user_request(&owner))
        .await?;

    assert_eq!(env.conferencing.create_calls(), 1);
    assert_eq!(env.conferencing.last_join().meeting_id, meeting.id);

    Ok(())
}

#[tokio::test]
async fn test_start_requires_permission() -> Result<()> {
    let env = env_with_room();
    let stranger = fixtures::user(7, "Some User");

    let result = env
        .lifecycle
        .start(&room_id(), &fixtures::user_request(&stranger))
        .await;
    assert!(matches!(result, Err(RoomError::Forbidden(_))));

    env.store.update_room_type(RoomTypeId(1), |t| {
        t.settings.everyone_can_start = TypeSetting::enforced(true);
    });
    env.lifecycle
        .start(&room_id(), &fixtures::user_request(&stranger))
        .await?;
    assert_eq!(env.conferencing.create_calls(), 1);

    Ok(())
}

#[tokio::test]
async fn test_restricted_room_type_requires_allowed_role() -> Result<()> {
    let env = env_with_room();
    env.store.update_room_type(RoomTypeId(1), |t| {
        t.restrict = true;
        t.allowed_role_ids = vec![common::types::RoleId(10)];
    });

    let owner = fixtures::user(OWNER_ID, "Room Owner");
    let result = env
        .lifecycle
        .start(&room_id(), &fixtures::user_request(&owner))
        .await;
    assert!(matches!(result, Err(RoomError::RoomTypeRestricted)));

    let owner_with_role = fixtures::user_with_roles(OWNER_ID, "Room Owner", &[10]);
    env.lifecycle
        .start(&room_id(), &fixtures::user_request(&owner_with_role))
        .await?;

    Ok(())
}

#[tokio::test]
async fn test_start_requires_attendance_consent_when_enforced() -> Result<()> {
    let env = env_with_room();
    env.store.update_room_type(RoomTypeId(1), |t| {
        t.settings.record_attendance = TypeSetting::enforced(true);
    });
    // Without expert mode the room cannot opt out of the type's default.
    env.store.update_room(&room_id(), |room| {
        room.expert_mode = false;
        room.settings.record_attendance = false;
    });
    let owner = fixtures::user(OWNER_ID, "Room Owner");

    let declining = room_service::services::RoomRequest {
        consent: ConsentRequest::granted(false, false, false),
        ..fixtures::user_request(&owner)
    };
    let result = env.lifecycle.start(&room_id(), &declining).await;
    assert!(matches!(
        result,
        Err(RoomError::ValidationFailed(ref e)) if e.contains("consent_record_attendance")
    ));
    assert_eq!(env.conferencing.create_calls(), 0);
    assert!(env.store.meetings_of_room(&room_id()).is_empty());

    let accepting = room_service::services::RoomRequest {
        consent: ConsentRequest::granted(true, false, false),
        ..fixtures::user_request(&owner)
    };
    env.lifecycle.start(&room_id(), &accepting).await?;

    let meeting = env.store.latest_meeting(&room_id()).unwrap();
    assert!(meeting.is_running());
    assert!(meeting.record_attendance);

    Ok(())
}

// ============================================================================
// Join
// ============================================================================

#[tokio::test]
async fn test_join_idle_room_is_not_running() -> Result<()> {
    let env = env_with_room();
    allow_guests(&env);

    let result = env
        .lifecycle
        .join(&room_id(), &fixtures::guest_request("Max Mustermann"))
        .await;

    assert!(matches!(result, Err(RoomError::RoomNotRunning)));
    assert_eq!(env.conferencing.info_calls(), 0);

    Ok(())
}

#[tokio::test]
async fn test_join_unconfirmed_meeting_is_not_running() -> Result<()> {
    let env = env_with_room();
    allow_guests(&env);
    let pending = Meeting::pending(room_id(), ServerId(1), false, false);
    env.store.insert_meeting(pending.clone());

    let result = env
        .lifecycle
        .join(&room_id(), &fixtures::guest_request("Max Mustermann"))
        .await;

    assert!(matches!(result, Err(RoomError::RoomNotRunning)));
    assert_eq!(env.conferencing.info_calls(), 0);
    assert_eq!(env.conferencing.create_calls(), 0);
    assert!(env.store.meeting(pending.id).unwrap().is_pending());

    Ok(())
}

#[tokio::test]
async fn test_guest_joins_running_meeting() -> Result<()> {
    let env = env_with_room();
    allow_guests(&env);
    let meeting = start_as_owner(&env).await;

    let url = env
        .lifecycle
        .join(&room_id(), &fixtures::guest_request("  Max Mustermann "))
        .await?;

    assert!(url.contains(&meeting.id.to_string()));
    let join = env.conferencing.last_join();
    assert_eq!(join.role, ConferenceRole::Viewer);
    assert_eq!(join.full_name, "Max Mustermann");
    assert!(join.user_id.starts_with("guest-"));
    assert!(!join.guest);

    Ok(())
}

#[tokio::test]
async fn test_join_accepts_meeting_without_participants() -> Result<()> {
    let env = env_with_room();
    allow_guests(&env);
    start_as_owner(&env).await;
    env.conferencing.set_info_response(InfoResponse::Idle);

    env.lifecycle
        .join(&room_id(), &fixtures::guest_request("Max Mustermann"))
        .await?;

    Ok(())
}

#[tokio::test]
async fn test_join_self_heals_meeting_unknown_to_server() -> Result<()> {
    let env = env_with_room();
    allow_guests(&env);
    let meeting = start_as_owner(&env).await;
    env.conferencing.set_info_response(InfoResponse::Unknown);

    let result = env
        .lifecycle
        .join(&room_id(), &fixtures::guest_request("Max Mustermann"))
        .await;

    assert!(matches!(result, Err(RoomError::RoomNotRunning)));
    assert!(env.store.meeting(meeting.id).unwrap().has_ended());

    Ok(())
}

#[tokio::test]
async fn test_join_self_heals_meeting_ended_on_server() -> Result<()> {
    let env = env_with_room();
    allow_guests(&env);
    let meeting = start_as_owner(&env).await;
    env.conferencing.set_info_response(InfoResponse::Ended);

    let result = env
        .lifecycle
        .join(&room_id(), &fixtures::guest_request("Max Mustermann"))
        .await;

    assert!(matches!(result, Err(RoomError::RoomNotRunning)));
    assert!(env.store.meeting(meeting.id).unwrap().has_ended());

    Ok(())
}

#[tokio::test]
async fn test_join_fails_without_mutation_when_server_errors() -> Result<()> {
    let env = env_with_room();
    allow_guests(&env);
    let meeting = start_as_owner(&env).await;
    env.conferencing
        .set_info_response(InfoResponse::Fail(ConferencingError::Timeout));

    let result = env
        .lifecycle
        .join(&room_id(), &fixtures::guest_request("Max Mustermann"))
        .await;

    assert!(matches!(result, Err(RoomError::JoinFailed(_))));
    assert!(env.store.meeting(meeting.id).unwrap().is_running());

    Ok(())
}

#[tokio::test]
async fn test_join_rejects_markup_in_guest_name_before_contacting_server() -> Result<()> {
    let env = env_with_room();
    allow_guests(&env);
    start_as_owner(&env).await;

    let result = env
        .lifecycle
        .join(&room_id(), &fixtures::guest_request("<script>alert(1)</script>"))
        .await;

    assert!(matches!(result, Err(RoomError::ValidationFailed(ref e)) if e.contains("name")));
    assert_eq!(env.conferencing.info_calls(), 0);

    Ok(())
}

#[tokio::test]
async fn test_join_checks_consent_against_meeting_snapshot() -> Result<()> {
    let env = env_with_room();
    allow_guests(&env);
    env.store.update_room_type(RoomTypeId(1), |t| {
        t.settings.record = TypeSetting::suggested(true);
    });
    start_as_owner(&env).await;

    // Recording is switched off on the room, but the meeting still records.
    env.store.update_room_type(RoomTypeId(1), |t| {
        t.settings.record = TypeSetting::suggested(false);
    });
    let declining = room_service::services::RoomRequest {
        consent: ConsentRequest::granted(true, false, false),
        ..fixtures::guest_request("Max Mustermann")
    };

    let result = env.lifecycle.join(&room_id(), &declining).await;
    assert!(
        matches!(result, Err(RoomError::ValidationFailed(ref e)) if e.contains("consent_record"))
    );

    Ok(())
}

#[tokio::test]
async fn test_join_ignores_recording_enabled_after_start() -> Result<()> {
    let env = env_with_room();
    allow_guests(&env);
    start_as_owner(&env).await;

    env.store.update_room_type(RoomTypeId(1), |t| {
        t.settings.record = TypeSetting::suggested(true);
    });
    let declining = room_service::services::RoomRequest {
        consent: ConsentRequest::granted(true, false, false),
        ..fixtures::guest_request("Max Mustermann")
    };

    env.lifecycle.join(&room_id(), &declining).await?;
    assert!(!env.conferencing.last_join().record_video_consent);

    Ok(())
}

#[tokio::test]
async fn test_join_requires_consent_video_flag() -> Result<()> {
    let env = env_with_room();
    allow_guests(&env);
    start_as_owner(&env).await;
    let mut request = fixtures::guest_request("Max Mustermann");
    request.consent.consent_record_video = None;

    let result = env.lifecycle.join(&room_id(), &request).await;

    assert!(matches!(
        result,
        Err(RoomError::ValidationFailed(ref e)) if e.contains("consent_record_video")
    ));
    assert_eq!(env.conferencing.info_calls(), 0);

    Ok(())
}

// ============================================================================
// End callback
// ============================================================================

#[tokio::test]
async fn test_end_callback_is_idempotent() -> Result<()> {
    let env = env_with_room();
    let meeting = start_as_owner(&env).await;
    let salt = env.signer.salt(&meeting.id);

    env.lifecycle.end_callback(meeting.id, Some(&salt)).await?;
    let ended_at = env.store.meeting(meeting.id).unwrap().end;
    assert!(ended_at.is_some());

    env.lifecycle.end_callback(meeting.id, Some(&salt)).await?;
    assert_eq!(env.store.meeting(meeting.id).unwrap().end, ended_at);

    Ok(())
}

#[tokio::test]
async fn test_end_callback_rejects_bad_signature() -> Result<()> {
    let env = env_with_room();
    let meeting = start_as_owner(&env).await;
    let other = MeetingId::new();

    for salt in [None, Some("deadbeef"), Some(env.signer.salt(&other).as_str())] {
        let result = env.lifecycle.end_callback(meeting.id, salt).await;
        assert!(matches!(result, Err(RoomError::InvalidCallbackSignature)));
    }
    assert!(env.store.meeting(meeting.id).unwrap().is_running());

    Ok(())
}

#[tokio::test]
async fn test_end_callback_for_unknown_meeting() -> Result<()> {
    let env = env_with_room();
    let unknown = MeetingId::new();
    let salt = env.signer.salt(&unknown);

    let result = env.lifecycle.end_callback(unknown, Some(&salt)).await;

    assert!(matches!(result, Err(RoomError::NotFound(_))));

    Ok(())
}

// ============================================================================
// End meeting
// ============================================================================

#[tokio::test]
async fn test_moderator_ends_meeting() -> Result<()> {
    let env = env_with_room();
    let meeting = start_as_owner(&env).await;
    let owner = fixtures::user(OWNER_ID, "Room Owner");

    env.lifecycle
        .end_meeting(&room_id(), Some(&owner), &Default::default())
        .await?;

    assert_eq!(env.conferencing.ended(), vec![meeting.id]);
    assert!(env.store.meeting(meeting.id).unwrap().has_ended());

    Ok(())
}

#[tokio::test]
async fn test_participant_cannot_end_meeting() -> Result<()> {
    let env = env_with_room();
    let meeting = start_as_owner(&env).await;
    let stranger = fixtures::user(7, "Some User");

    let result = env
        .lifecycle
        .end_meeting(&room_id(), Some(&stranger), &Default::default())
        .await;

    assert!(matches!(result, Err(RoomError::Forbidden(_))));
    assert_eq!(env.conferencing.end_calls(), 0);
    assert!(env.store.meeting(meeting.id).unwrap().is_running());

    Ok(())
}

#[tokio::test]
async fn test_end_meeting_requires_session() -> Result<()> {
    let env = env_with_room();
    let meeting = start_as_owner(&env).await;
    env.store
        .insert_token(fixtures::token(ROOM, TOKEN, TokenRole::Moderator, Utc::now()));
    let credentials = Credentials {
        access_code: None,
        token: Some(TOKEN.to_string()),
    };

    let result = env
        .lifecycle
        .end_meeting(&room_id(), None, &credentials)
        .await;

    assert!(matches!(result, Err(RoomError::Unauthenticated)));
    assert_eq!(env.conferencing.end_calls(), 0);
    assert!(env.store.meeting(meeting.id).unwrap().is_running());

    Ok(())
}

#[tokio::test]
async fn test_end_meeting_unknown_to_server_still_ends_locally() -> Result<()> {
    let env = env_with_room();
    let meeting = start_as_owner(&env).await;
    env.conferencing.push_end_result(Err(ConferencingError::Rejected {
        key: "notFound".into(),
        message: "We could not find a meeting with that meeting ID".into(),
    }));
    let owner = fixtures::user(OWNER_ID, "Room Owner");

    env.lifecycle
        .end_meeting(&room_id(), Some(&owner), &Default::default())
        .await?;

    assert!(env.store.meeting(meeting.id).unwrap().has_ended());

    Ok(())
}

#[tokio::test]
async fn test_end_meeting_server_failure_keeps_meeting_running() -> Result<()> {
    let env = env_with_room();
    let meeting = start_as_owner(&env).await;
    env.conferencing
        .push_end_result(Err(ConferencingError::Unreachable("connection reset".into())));
    let owner = fixtures::user(OWNER_ID, "Room Owner");

    let result = env
        .lifecycle
        .end_meeting(&room_id(), Some(&owner), &Default::default())
        .await;

    assert!(matches!(result, Err(RoomError::ServerRequestFailed(_))));
    assert!(env.store.meeting(meeting.id).unwrap().is_running());

    let again = env
        .lifecycle
        .end_meeting(&room_id(), Some(&owner), &Default::default())
        .await;
    assert!(again.is_ok());

    let after = env
        .lifecycle
        .end_meeting(&room_id(), Some(&owner), &Default::default())
        .await;
    assert!(matches!(after, Err(RoomError::RoomNotRunning)));

    Ok(())
}

// ============================================================================
// Panic
// ============================================================================

#[tokio::test]
async fn test_panic_ends_every_meeting_on_server() -> Result<()> {
    let env = TestEnv::new();
    env.seed_room("room-one-111");
    env.seed_room("room-two-222");
    env.store.insert_server(fixtures::server(2, 2));
    env.store.insert_room_type(fixtures::room_type(2, 2));
    env.store.insert_room(fixtures::room("room-three-333", OWNER_ID, 2));

    let owner = fixtures::user(OWNER_ID, "Room Owner");
    for code in ["room-one-111", "room-two-222", "room-three-333"] {
        env.lifecycle
            .start(&RoomId::new(code), &fixtures::user_request(&owner))
            .await?;
    }
    env.conferencing.push_end_result(Ok(()));
    env.conferencing.push_end_result(Err(ConferencingError::Timeout));

    let report = env.lifecycle.panic(ServerId(1)).await?;

    assert_eq!(
        report,
        PanicReport {
            total: 2,
            succeeded: 1,
            unrecorded: 0,
        }
    );
    assert_eq!(env.store.server(ServerId(1)).unwrap().status, ServerStatus::Disabled);
    for code in ["room-one-111", "room-two-222"] {
        let meeting = env.store.latest_meeting(&RoomId::new(code)).unwrap();
        assert!(meeting.has_ended(), "{code} should have ended");
    }
    let untouched = env.store.latest_meeting(&RoomId::new("room-three-333")).unwrap();
    assert!(untouched.is_running());

    Ok(())
}

#[tokio::test]
async fn test_panic_counts_unknown_meetings_as_ended() -> Result<()> {
    let env = env_with_room();
    start_as_owner(&env).await;
    env.conferencing.push_end_result(Err(ConferencingError::Rejected {
        key: "notFound".into(),
        message: String::new(),
    }));

    let report = env.lifecycle.panic(ServerId(1)).await?;

    assert_eq!(report.total, 1);
    assert_eq!(report.succeeded, 1);

    Ok(())
}

#[tokio::test]
async fn test_panic_continues_past_store_failure() -> Result<()> {
    let env = TestEnv::new();
    env.seed_room("room-one-111");
    env.seed_room("room-two-222");
    let owner = fixtures::user(OWNER_ID, "Room Owner");
    for code in ["room-one-111", "room-two-222"] {
        env.lifecycle
            .start(&RoomId::new(code), &fixtures::user_request(&owner))
            .await?;
    }
    let first = env.store.latest_meeting(&RoomId::new("room-one-111")).unwrap();
    let second = env.store.latest_meeting(&RoomId::new("room-two-222")).unwrap();
    env.store.fail_end_write(first.id);

    let report = env.lifecycle.panic(ServerId(1)).await?;

    assert_eq!(
        report,
        PanicReport {
            total: 2,
            succeeded: 2,
            unrecorded: 1,
        }
    );
    assert!(env.store.meeting(first.id).unwrap().is_running());
    assert!(env.store.meeting(second.id).unwrap().has_ended());
    assert_eq!(env.store.server(ServerId(1)).unwrap().status, ServerStatus::Disabled);

    Ok(())
}

#[tokio::test]
async fn test_panic_unknown_server() -> Result<()> {
    let env = TestEnv::new();

    let result = env.lifecycle.panic(ServerId(99)).await;

    assert!(matches!(result, Err(RoomError::NotFound(_))));

    Ok(())
}
