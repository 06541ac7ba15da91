//! Sequence Counter Implementation
//!
//! PostgreSQL-backed per-room counters. The increment is a single upsert
//! statement, so concurrent callers on any number of service instances are
//! serialized by the row lock, not by anything in this process.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use crate::domain::SequenceAllocator;
use crate::shared::error::StoreError;

#[derive(Clone)]
pub struct PgSequenceAllocator {
    pool: PgPool,
}

impl PgSequenceAllocator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SequenceAllocator for PgSequenceAllocator {
    #[instrument(skip(self))]
    async fn next(&self, room_name: &str) -> Result<i64, StoreError> {
        let seq: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO room_sequences (room_name, seq)
            VALUES ($1, 1)
            ON CONFLICT (room_name)
            DO UPDATE SET seq = room_sequences.seq + 1, updated_at = NOW()
            RETURNING seq
            "#,
        )
        .bind(room_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(seq)
    }

    async fn current(&self, room_name: &str) -> Result<i64, StoreError> {
        let seq: Option<i64> =
            sqlx::query_scalar("SELECT seq FROM room_sequences WHERE room_name = $1")
                .bind(room_name)
                .fetch_optional(&self.pool)
                .await?;

        Ok(seq.unwrap_or(0))
    }
}
