//! Meetings repository.
//!
//! # Concurrency
//!
//! - `end` is only ever written where it is NULL, so the end callback, the
//!   join self-heal and panic can race without double-ending
//! - The pending insert and the room's latest pointer change in one
//!   transaction, as do the discard and the pointer restore

use super::{observe, MeetingRepository};
use crate::errors::RoomError;
use crate::models::{Meeting, MeetingUsage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::types::{MeetingId, RoomId, ServerId};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::time::Instant;
use tracing::instrument;

const MEETING_COLUMNS: &str = r#"
    id, room_id, server_id, start, "end", record, record_attendance, detached,
    participant_count, listener_count, voice_participant_count, video_count,
    moderator_count
"#;

/// Postgres-backed [`MeetingRepository`].
#[derive(Debug, Clone)]
pub struct PgMeetingRepository {
    pool: PgPool,
}

impl PgMeetingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MeetingRepository for PgMeetingRepository {
    #[instrument(skip_all, name = "rooms.repo.get_meeting", fields(meeting_id = %meeting_id))]
    async fn get_meeting(&self, meeting_id: MeetingId) -> Result<Option<Meeting>, RoomError> {
        let start = Instant::now();
        let row = sqlx::query(&format!("SELECT {MEETING_COLUMNS} FROM meetings WHERE id = $1"))
            .bind(meeting_id.0)
            .fetch_optional(&self.pool)
            .await;

        observe("get_meeting", start, row)?
            .map(map_row_to_meeting)
            .transpose()
    }

    #[instrument(skip_all, name = "rooms.repo.insert_pending", fields(meeting_id = %meeting.id))]
    async fn insert_pending(&self, meeting: &Meeting) -> Result<(), RoomError> {
        let start = Instant::now();
        let result = async {
            let mut tx = self.pool.begin().await?;
            sqlx::query(
                r#"
                INSERT INTO meetings (id, room_id, server_id, record, record_attendance)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(meeting.id.0)
            .bind(meeting.room_id.as_str())
            .bind(meeting.server_id.0)
            .bind(meeting.record)
            .bind(meeting.record_attendance)
            .execute(&mut *tx)
            .await?;

            sqlx::query("UPDATE rooms SET latest_meeting_id = $2 WHERE id = $1")
                .bind(meeting.room_id.as_str())
                .bind(meeting.id.0)
                .execute(&mut *tx)
                .await?;

            tx.commit().await
        }
        .await;

        observe("insert_pending", start, result)
    }

    #[instrument(skip_all, name = "rooms.repo.confirm_start", fields(meeting_id = %meeting_id))]
    async fn confirm_start(
        &self,
        meeting_id: MeetingId,
        now: DateTime<Utc>,
    ) -> Result<(), RoomError> {
        let start = Instant::now();
        let result = sqlx::query(
            r#"
            WITH started AS (
                UPDATE meetings SET start = $2
                WHERE id = $1 AND start IS NULL AND "end" IS NULL
                RETURNING room_id
            )
            UPDATE rooms SET delete_inactive = NULL
            WHERE id IN (SELECT room_id FROM started)
            "#,
        )
        .bind(meeting_id.0)
        .bind(now)
        .execute(&self.pool)
        .await;

        observe("confirm_start", start, result).map(|_| ())
    }

    #[instrument(skip_all, name = "rooms.repo.discard_pending", fields(meeting_id = %meeting.id))]
    async fn discard_pending(
        &self,
        meeting: &Meeting,
        previous_latest: Option<MeetingId>,
    ) -> Result<(), RoomError> {
        let start = Instant::now();
        let result = async {
            let mut tx = self.pool.begin().await?;
            sqlx::query("UPDATE rooms SET latest_meeting_id = $2 WHERE id = $1 AND latest_meeting_id = $3")
                .bind(meeting.room_id.as_str())
                .bind(previous_latest.map(|id| id.0))
                .bind(meeting.id.0)
                .execute(&mut *tx)
                .await?;

            sqlx::query("DELETE FROM meetings WHERE id = $1 AND start IS NULL")
                .bind(meeting.id.0)
                .execute(&mut *tx)
                .await?;

            tx.commit().await
        }
        .await;

        observe("discard_pending", start, result)
    }

    #[instrument(skip_all, name = "rooms.repo.mark_ended", fields(meeting_id = %meeting_id))]
    async fn mark_ended(
        &self,
        meeting_id: MeetingId,
        now: DateTime<Utc>,
    ) -> Result<bool, RoomError> {
        let start = Instant::now();
        let result = sqlx::query(r#"UPDATE meetings SET "end" = $2 WHERE id = $1 AND "end" IS NULL"#)
            .bind(meeting_id.0)
            .bind(now)
            .execute(&self.pool)
            .await;

        observe("mark_ended", start, result).map(|done| done.rows_affected() > 0)
    }

    #[instrument(skip_all, name = "rooms.repo.list_running_on_server", fields(server_id = %server_id))]
    async fn list_running_on_server(
        &self,
        server_id: ServerId,
    ) -> Result<Vec<Meeting>, RoomError> {
        let start = Instant::now();
        let rows = sqlx::query(&format!(
            r#"
            SELECT {MEETING_COLUMNS} FROM meetings
            WHERE server_id = $1 AND start IS NOT NULL AND "end" IS NULL
            ORDER BY start
            "#
        ))
        .bind(server_id.0)
        .fetch_all(&self.pool)
        .await;

        observe("list_running_on_server", start, rows)?
            .into_iter()
            .map(map_row_to_meeting)
            .collect()
    }

    #[instrument(skip_all, name = "rooms.repo.update_usage", fields(meeting_id = %meeting_id))]
    async fn update_usage(
        &self,
        meeting_id: MeetingId,
        usage: &MeetingUsage,
    ) -> Result<(), RoomError> {
        let start = Instant::now();
        let result = sqlx::query(
            r#"
            UPDATE meetings
            SET participant_count = $2, listener_count = $3, voice_participant_count = $4,
                video_count = $5, moderator_count = $6, detached = NULL
            WHERE id = $1 AND "end" IS NULL
            "#,
        )
        .bind(meeting_id.0)
        .bind(usage.participant_count)
        .bind(usage.listener_count)
        .bind(usage.voice_participant_count)
        .bind(usage.video_count)
        .bind(usage.moderator_count)
        .execute(&self.pool)
        .await;

        observe("update_usage", start, result).map(|_| ())
    }

    #[instrument(skip_all, name = "rooms.repo.mark_detached", fields(meeting_id = %meeting_id))]
    async fn mark_detached(
        &self,
        meeting_id: MeetingId,
        now: DateTime<Utc>,
    ) -> Result<(), RoomError> {
        let start = Instant::now();
        let result = sqlx::query(
            r#"UPDATE meetings SET detached = $2 WHERE id = $1 AND "end" IS NULL AND detached IS NULL"#,
        )
        .bind(meeting_id.0)
        .bind(now)
        .execute(&self.pool)
        .await;

        observe("mark_detached", start, result).map(|_| ())
    }
}

fn map_row_to_meeting(row: PgRow) -> Result<Meeting, RoomError> {
    Ok(Meeting {
        id: MeetingId(row.try_get("id")?),
        room_id: RoomId::new(row.try_get::<String, _>("room_id")?),
        server_id: ServerId(row.try_get("server_id")?),
        start: row.try_get("start")?,
        end: row.try_get("end")?,
        record: row.try_get("record")?,
        record_attendance: row.try_get("record_attendance")?,
        detached: row.try_get("detached")?,
        usage: MeetingUsage {
            participant_count: row.try_get("participant_count")?,
            listener_count: row.try_get("listener_count")?,
            voice_participant_count: row.try_get("voice_participant_count")?,
            video_count: row.try_get("video_count")?,
            moderator_count: row.try_get("moderator_count")?,
        },
    })
}
