//! Message Store Implementation
//!
//! PostgreSQL implementation of the append-only per-room message log.
//! Ordering always comes from `sequence_num`, never from insertion order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{BoxStream, StreamExt};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::domain::{Message, MessageKind, MessageProperties, MessageQuery, MessageStore};
use crate::shared::error::StoreError;

/// PostgreSQL message store.
///
/// `(room_name, sequence_num)` is a unique key, so a second append of the
/// same number fails with `StoreError::Duplicate` instead of overwriting.
#[derive(Clone)]
pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    /// Creates a new PgMessageStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Internal row type for message queries.
/// Maps to the messages table schema defined in the migration.
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    room_name: String,
    sequence_num: i64,
    text: String,
    from_alias: String,
    to_alias: String,
    kind: String,
    sent_at: DateTime<Utc>,
    received_at: DateTime<Utc>,
}

impl MessageRow {
    /// Converts database row to domain Message entity.
    fn into_message(self) -> Message {
        Message {
            id: self.id,
            text: self.text,
            properties: MessageProperties {
                room_name: self.room_name,
                from_alias: self.from_alias,
                to_alias: self.to_alias,
                kind: MessageKind::from_str(&self.kind),
                sequence_num: self.sequence_num,
                sent_at: self.sent_at,
                received_at: self.received_at,
            },
        }
    }
}

const MESSAGE_COLUMNS: &str =
    "id, room_name, sequence_num, text, from_alias, to_alias, kind, sent_at, received_at";

/// Build the filtered SELECT for `query`. Bounds are inclusive.
fn build_query(
    room_name: &str,
    query: &MessageQuery,
    limit: Option<usize>,
) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!(
        "SELECT {} FROM messages WHERE room_name = ",
        MESSAGE_COLUMNS
    ));
    builder.push_bind(room_name.to_string());

    if let Some(recipient) = &query.recipient {
        builder.push(" AND to_alias = ").push_bind(recipient.clone());
    }
    if let Some(text) = &query.text {
        builder.push(" AND text = ").push_bind(text.clone());
    }
    if let Some(min_seq) = query.min_seq {
        builder.push(" AND sequence_num >= ").push_bind(min_seq);
    }
    if let Some(max_seq) = query.max_seq {
        builder.push(" AND sequence_num <= ").push_bind(max_seq);
    }

    builder.push(" ORDER BY sequence_num ASC");

    if let Some(limit) = limit {
        builder
            .push(" LIMIT ")
            .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
    }

    builder
}

#[async_trait]
impl MessageStore for PgMessageStore {
    #[instrument(skip(self, message), fields(room = %message.room_name(), sequence_num = message.sequence_num()))]
    async fn append(&self, message: &Message) -> Result<Message, StoreError> {
        let props = &message.properties;
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            INSERT INTO messages (id, room_name, sequence_num, text, from_alias,
                                  to_alias, kind, sent_at, received_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(message.id)
        .bind(&props.room_name)
        .bind(props.sequence_num)
        .bind(&message.text)
        .bind(&props.from_alias)
        .bind(&props.to_alias)
        .bind(props.kind.as_str())
        .bind(props.sent_at)
        .bind(props.received_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_message())
    }

    #[instrument(skip(self, query))]
    async fn query(
        &self,
        room_name: &str,
        query: &MessageQuery,
        limit: Option<usize>,
    ) -> Result<Vec<Message>, StoreError> {
        let rows = build_query(room_name, query, limit)
            .build_query_as::<MessageRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(MessageRow::into_message).collect())
    }

    fn replay<'a>(&'a self, room_name: &'a str) -> BoxStream<'a, Result<Message, StoreError>> {
        sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, room_name, sequence_num, text, from_alias, to_alias,
                   kind, sent_at, received_at
            FROM messages
            WHERE room_name = $1
            ORDER BY sequence_num ASC
            "#,
        )
        .bind(room_name)
        .fetch(&self.pool)
        .map(|row| row.map(MessageRow::into_message).map_err(StoreError::from))
        .boxed()
    }

    #[instrument(skip(self))]
    async fn purge(&self, room_name: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM messages WHERE room_name = $1")
            .bind(room_name)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
