//! Servers repository.
//!
//! Status writes are guarded in SQL: demotion to `unhealthy` only applies to
//! an `online` server, and health results never touch a `disabled` one.

use super::{observe, HealthUpdate, ServerRepository};
use crate::errors::RoomError;
use crate::models::{Server, ServerLoad, ServerStatus};
use async_trait::async_trait;
use common::secret::SecretString;
use common::types::{ServerId, ServerPoolId};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::time::Instant;
use tracing::instrument;

const SERVER_SELECT: &str = r#"
    SELECT s.id, s.name, s.base_url, s.secret, s.strength, s.status, s.error_count,
           s.meeting_count, s.participant_count, s.video_count,
           ARRAY(
               SELECT server_pool_id FROM server_pool_members WHERE server_id = s.id
               ORDER BY server_pool_id
           ) AS pool_ids
    FROM servers s
"#;

/// Postgres-backed [`ServerRepository`].
#[derive(Debug, Clone)]
pub struct PgServerRepository {
    pool: PgPool,
}

impl PgServerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ServerRepository for PgServerRepository {
    #[instrument(skip_all, name = "rooms.repo.get_server", fields(server_id = %server_id))]
    async fn get_server(&self, server_id: ServerId) -> Result<Option<Server>, RoomError> {
        let start = Instant::now();
        let row = sqlx::query(&format!("{SERVER_SELECT} WHERE s.id = $1"))
            .bind(server_id.0)
            .fetch_optional(&self.pool)
            .await;

        observe("get_server", start, row)?
            .map(map_row_to_server)
            .transpose()
    }

    #[instrument(skip_all, name = "rooms.repo.list_online_in_pool", fields(pool_id = %pool_id))]
    async fn list_online_in_pool(&self, pool_id: ServerPoolId) -> Result<Vec<Server>, RoomError> {
        let start = Instant::now();
        let rows = sqlx::query(&format!(
            r#"
            {SERVER_SELECT}
            JOIN server_pool_members m ON m.server_id = s.id
            WHERE m.server_pool_id = $1 AND s.status = 'online'
            ORDER BY s.id
            "#
        ))
        .bind(pool_id.0)
        .fetch_all(&self.pool)
        .await;

        observe("list_online_in_pool", start, rows)?
            .into_iter()
            .map(map_row_to_server)
            .collect()
    }

    #[instrument(skip_all, name = "rooms.repo.list_monitored")]
    async fn list_monitored(&self) -> Result<Vec<Server>, RoomError> {
        let start = Instant::now();
        let rows = sqlx::query(&format!(
            "{SERVER_SELECT} WHERE s.status <> 'disabled' ORDER BY s.id"
        ))
        .fetch_all(&self.pool)
        .await;

        observe("list_monitored", start, rows)?
            .into_iter()
            .map(map_row_to_server)
            .collect()
    }

    #[instrument(skip_all, name = "rooms.repo.mark_unhealthy", fields(server_id = %server_id))]
    async fn mark_unhealthy(&self, server_id: ServerId) -> Result<bool, RoomError> {
        let start = Instant::now();
        let result = sqlx::query(
            r#"
            UPDATE servers SET status = 'unhealthy', updated_at = NOW()
            WHERE id = $1 AND status = 'online'
            "#,
        )
        .bind(server_id.0)
        .execute(&self.pool)
        .await;

        observe("mark_unhealthy", start, result).map(|done| done.rows_affected() > 0)
    }

    #[instrument(skip_all, name = "rooms.repo.disable", fields(server_id = %server_id))]
    async fn disable(&self, server_id: ServerId) -> Result<bool, RoomError> {
        let start = Instant::now();
        let result = sqlx::query(
            "UPDATE servers SET status = 'disabled', updated_at = NOW() WHERE id = $1",
        )
        .bind(server_id.0)
        .execute(&self.pool)
        .await;

        observe("disable_server", start, result).map(|done| done.rows_affected() > 0)
    }

    #[instrument(skip_all, name = "rooms.repo.increment_meeting_count", fields(server_id = %server_id))]
    async fn increment_meeting_count(&self, server_id: ServerId) -> Result<(), RoomError> {
        let start = Instant::now();
        let result = sqlx::query("UPDATE servers SET meeting_count = meeting_count + 1 WHERE id = $1")
            .bind(server_id.0)
            .execute(&self.pool)
            .await;

        observe("increment_meeting_count", start, result).map(|_| ())
    }

    #[instrument(skip_all, name = "rooms.repo.apply_health", fields(server_id = %server_id))]
    async fn apply_health(
        &self,
        server_id: ServerId,
        update: HealthUpdate,
    ) -> Result<bool, RoomError> {
        let start = Instant::now();
        let load = update.load;
        let result = sqlx::query(
            r#"
            UPDATE servers
            SET status = $2,
                error_count = $3,
                meeting_count = COALESCE($4, meeting_count),
                participant_count = COALESCE($5, participant_count),
                video_count = COALESCE($6, video_count),
                updated_at = NOW()
            WHERE id = $1 AND status <> 'disabled'
            "#,
        )
        .bind(server_id.0)
        .bind(update.status.as_db_str())
        .bind(update.error_count)
        .bind(load.map(|l| l.meeting_count))
        .bind(load.map(|l| l.participant_count))
        .bind(load.map(|l| l.video_count))
        .execute(&self.pool)
        .await;

        observe("apply_health", start, result).map(|done| done.rows_affected() > 0)
    }
}

fn map_row_to_server(row: PgRow) -> Result<Server, RoomError> {
    let status: String = row.try_get("status")?;
    let secret: String = row.try_get("secret")?;
    let pool_ids: Vec<i64> = row.try_get("pool_ids")?;
    Ok(Server {
        id: ServerId(row.try_get("id")?),
        name: row.try_get("name")?,
        base_url: row.try_get("base_url")?,
        secret: SecretString::from(secret),
        strength: row.try_get("strength")?,
        pool_ids: pool_ids.into_iter().map(ServerPoolId).collect(),
        status: ServerStatus::from_db_str(&status),
        error_count: row.try_get("error_count")?,
        load: ServerLoad {
            meeting_count: row.try_get("meeting_count")?,
            participant_count: row.try_get("participant_count")?,
            video_count: row.try_get("video_count")?,
        },
    })
}
