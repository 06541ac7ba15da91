//! User Repository Implementation
//!
//! PostgreSQL implementation of the UserRepository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{User, UserRepository};
use crate::shared::error::StoreError;

/// Database row representation matching the users table schema.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    alias: String,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
}

impl UserRow {
    /// Convert database row to domain User entity.
    fn into_user(self) -> User {
        User {
            alias: self.alias,
            created_at: self.created_at,
            modified_at: self.modified_at,
        }
    }
}

/// PostgreSQL user repository implementation.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new PgUserRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    /// Insert a new alias. The primary key turns a taken alias into
    /// `StoreError::Duplicate`.
    async fn register(&self, user: &User) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (alias, created_at, modified_at)
            VALUES ($1, $2, $3)
            RETURNING alias, created_at, modified_at
            "#,
        )
        .bind(&user.alias)
        .bind(user.created_at)
        .bind(user.modified_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_user())
    }

    async fn find_by_alias(&self, alias: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT alias, created_at, modified_at
            FROM users
            WHERE alias = $1
            "#,
        )
        .bind(alias)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_user()))
    }
}
