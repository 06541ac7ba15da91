//! Room Repository Implementation
//!
//! PostgreSQL implementation of the RoomRepository trait.
//! Members are stored as a `TEXT[]` column on the room row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use crate::domain::{Room, RoomRepository, RoomType};
use crate::shared::error::StoreError;

/// Database row representation matching the rooms table.
#[derive(Debug, sqlx::FromRow)]
struct RoomRow {
    name: String,
    room_type: String,
    owner_alias: String,
    members: Vec<String>,
    created_at: DateTime<Utc>,
}

impl RoomRow {
    /// Convert database row to domain Room entity.
    fn into_room(self) -> Room {
        Room {
            name: self.name,
            room_type: RoomType::from_str(&self.room_type),
            owner_alias: self.owner_alias,
            members: self.members.into_iter().collect(),
            created_at: self.created_at,
        }
    }
}

/// PostgreSQL room metadata repository.
#[derive(Clone)]
pub struct PgRoomRepository {
    pool: PgPool,
}

impl PgRoomRepository {
    /// Create a new PgRoomRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomRepository for PgRoomRepository {
    #[instrument(skip(self, room), fields(room = %room.name))]
    async fn insert(&self, room: &Room) -> Result<Room, StoreError> {
        let members: Vec<String> = room.members.iter().cloned().collect();
        let row = sqlx::query_as::<_, RoomRow>(
            r#"
            INSERT INTO rooms (name, room_type, owner_alias, members, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING name, room_type, owner_alias, members, created_at
            "#,
        )
        .bind(&room.name)
        .bind(room.room_type.as_str())
        .bind(&room.owner_alias)
        .bind(&members)
        .bind(room.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_room())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Room>, StoreError> {
        let row = sqlx::query_as::<_, RoomRow>(
            r#"
            SELECT name, room_type, owner_alias, members, created_at
            FROM rooms
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_room()))
    }

    async fn list(&self) -> Result<Vec<Room>, StoreError> {
        let rows = sqlx::query_as::<_, RoomRow>(
            r#"
            SELECT name, room_type, owner_alias, members, created_at
            FROM rooms
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_room()).collect())
    }

    #[instrument(skip(self))]
    async fn delete(&self, name: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM rooms WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
