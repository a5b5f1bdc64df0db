//! Rooms repository.
//!
//! Room and room type settings are stored as JSONB documents, one value per
//! governed attribute.

use super::{observe, RoomRepository};
use crate::errors::RoomError;
use crate::models::{MemberRole, Room, RoomSettings, RoomToken, RoomType, RoomTypeSettings, TokenRole};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::types::{MeetingId, RoleId, RoomId, RoomTypeId, ServerPoolId, UserId};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

/// Postgres-backed [`RoomRepository`].
#[derive(Debug, Clone)]
pub struct PgRoomRepository {
    pool: PgPool,
}

impl PgRoomRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomRepository for PgRoomRepository {
    #[instrument(skip_all, name = "rooms.repo.get_room", fields(room_id = %room_id))]
    async fn get_room(&self, room_id: &RoomId) -> Result<Option<Room>, RoomError> {
        let start = Instant::now();
        let row = sqlx::query(
            r#"
            SELECT id, name, short_description, owner_id, room_type_id, expert_mode,
                   settings, access_code, latest_meeting_id, delete_inactive
            FROM rooms
            WHERE id = $1
            "#,
        )
        .bind(room_id.as_str())
        .fetch_optional(&self.pool)
        .await;

        observe("get_room", start, row)?
            .map(map_row_to_room)
            .transpose()
    }

    #[instrument(skip_all, name = "rooms.repo.get_room_type", fields(room_type_id = %room_type_id))]
    async fn get_room_type(&self, room_type_id: RoomTypeId) -> Result<Option<RoomType>, RoomError> {
        let start = Instant::now();
        let row = sqlx::query(
            r#"
            SELECT rt.id, rt.name, rt.server_pool_id, rt.restrict, rt.settings,
                   ARRAY(
                       SELECT role_id FROM room_type_roles WHERE room_type_id = rt.id
                       ORDER BY role_id
                   ) AS allowed_role_ids
            FROM room_types rt
            WHERE rt.id = $1
            "#,
        )
        .bind(room_type_id.0)
        .fetch_optional(&self.pool)
        .await;

        observe("get_room_type", start, row)?
            .map(map_row_to_room_type)
            .transpose()
    }

    #[instrument(skip_all, name = "rooms.repo.get_membership", fields(room_id = %room_id))]
    async fn get_membership(
        &self,
        room_id: &RoomId,
        user_id: UserId,
    ) -> Result<Option<MemberRole>, RoomError> {
        let start = Instant::now();
        let role: Result<Option<String>, sqlx::Error> = sqlx::query_scalar(
            "SELECT role FROM room_memberships WHERE room_id = $1 AND user_id = $2",
        )
        .bind(room_id.as_str())
        .bind(user_id.0)
        .fetch_optional(&self.pool)
        .await;

        Ok(observe("get_membership", start, role)?
            .as_deref()
            .and_then(MemberRole::from_db_str))
    }

    #[instrument(skip_all, name = "rooms.repo.find_token", fields(room_id = %room_id))]
    async fn find_token(
        &self,
        room_id: &RoomId,
        token: &str,
    ) -> Result<Option<RoomToken>, RoomError> {
        let start = Instant::now();
        let row = sqlx::query(
            r#"
            SELECT token, room_id, firstname, lastname, role, created_at, last_usage
            FROM room_tokens
            WHERE room_id = $1 AND token = $2
            "#,
        )
        .bind(room_id.as_str())
        .bind(token)
        .fetch_optional(&self.pool)
        .await;

        match observe("find_token", start, row)? {
            Some(row) => map_row_to_token(row),
            None => Ok(None),
        }
    }

    #[instrument(skip_all, name = "rooms.repo.touch_token", fields(room_id = %room_id))]
    async fn touch_token(
        &self,
        room_id: &RoomId,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<(), RoomError> {
        let start = Instant::now();
        let result = sqlx::query(
            "UPDATE room_tokens SET last_usage = $3 WHERE room_id = $1 AND token = $2",
        )
        .bind(room_id.as_str())
        .bind(token)
        .bind(now)
        .execute(&self.pool)
        .await;

        observe("touch_token", start, result).map(|_| ())
    }

    async fn ping(&self) -> Result<(), RoomError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
            .map_err(RoomError::from)
    }
}

fn map_row_to_room(row: PgRow) -> Result<Room, RoomError> {
    let settings: Json<RoomSettings> = row.try_get("settings")?;
    let latest: Option<Uuid> = row.try_get("latest_meeting_id")?;
    Ok(Room {
        id: RoomId::new(row.try_get::<String, _>("id")?),
        name: row.try_get("name")?,
        short_description: row.try_get("short_description")?,
        owner_id: UserId(row.try_get("owner_id")?),
        room_type_id: RoomTypeId(row.try_get("room_type_id")?),
        expert_mode: row.try_get("expert_mode")?,
        settings: settings.0,
        access_code: row.try_get("access_code")?,
        latest_meeting_id: latest.map(MeetingId),
        delete_inactive: row.try_get("delete_inactive")?,
    })
}

fn map_row_to_room_type(row: PgRow) -> Result<RoomType, RoomError> {
    let settings: Json<RoomTypeSettings> = row.try_get("settings")?;
    let roles: Vec<i64> = row.try_get("allowed_role_ids")?;
    Ok(RoomType {
        id: RoomTypeId(row.try_get("id")?),
        name: row.try_get("name")?,
        server_pool_id: ServerPoolId(row.try_get("server_pool_id")?),
        restrict: row.try_get("restrict")?,
        allowed_role_ids: roles.into_iter().map(RoleId).collect(),
        settings: settings.0,
    })
}

/// A token row with an unknown role is treated as absent.
fn map_row_to_token(row: PgRow) -> Result<Option<RoomToken>, RoomError> {
    let stored_role: String = row.try_get("role")?;
    let Some(role) = TokenRole::from_db_str(&stored_role) else {
        tracing::warn!(target: "rooms.repo.rooms", role = %stored_role, "Ignoring token with unknown role");
        return Ok(None);
    };
    Ok(Some(RoomToken {
        token: row.try_get("token")?,
        room_id: RoomId::new(row.try_get::<String, _>("room_id")?),
        firstname: row.try_get("firstname")?,
        lastname: row.try_get("lastname")?,
        role,
        created_at: row.try_get("created_at")?,
        last_usage: row.try_get("last_usage")?,
    }))
}
