//! User entity and repository trait.
//!
//! Maps to the `users` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::StoreError;

/// A registered chat alias.
///
/// Maps to the `users` table:
/// - alias: VARCHAR(32) PRIMARY KEY
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// - modified_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub alias: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl User {
    pub fn new(alias: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            alias: alias.into(),
            created_at: now,
            modified_at: now,
        }
    }
}

/// Repository trait for User data access operations.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Register a new alias; `StoreError::Duplicate` if it is taken.
    async fn register(&self, user: &User) -> Result<User, StoreError>;

    /// Find a user by alias.
    async fn find_by_alias(&self, alias: &str) -> Result<Option<User>, StoreError>;
}
