//! User Directory
//!
//! Alias registration and lookup. The HTTP layer checks aliases against it;
//! rooms themselves never do.

use std::sync::Arc;

use tracing::{info, instrument};

use super::error::RoomError;
use crate::domain::{User, UserRepository};
use crate::shared::error::StoreError;
use crate::shared::retry::StorePolicy;
use crate::shared::validation::check_alias;

#[derive(Clone)]
pub struct UserDirectory {
    users: Arc<dyn UserRepository>,
    policy: StorePolicy,
}

impl UserDirectory {
    pub fn new(users: Arc<dyn UserRepository>, policy: StorePolicy) -> Self {
        Self { users, policy }
    }

    /// Register a new alias; `RoomError::Duplicate` if it is taken.
    #[instrument(skip(self))]
    pub async fn register(&self, alias: &str) -> Result<User, RoomError> {
        check_alias(alias).map_err(RoomError::Validation)?;

        let user = User::new(alias);
        let users = &self.users;
        let registered = self
            .policy
            .write("users.register", || users.register(&user))
            .await
            .map_err(|e| match e {
                StoreError::Duplicate(_) => {
                    RoomError::Duplicate(format!("alias '{}' is already registered", alias))
                }
                other => RoomError::from_store("*", None, other),
            })?;

        info!(alias = %alias, "User registered");
        Ok(registered)
    }

    pub async fn get(&self, alias: &str) -> Result<Option<User>, RoomError> {
        let users = &self.users;
        self.policy
            .read("users.find_by_alias", || users.find_by_alias(alias))
            .await
            .map_err(|e| RoomError::from_store("*", None, e))
    }

    /// Like `get`, but an unknown alias is `RoomError::NotFound`.
    pub async fn require(&self, alias: &str) -> Result<User, RoomError> {
        self.get(alias)
            .await?
            .ok_or_else(|| RoomError::NotFound(format!("User '{}'", alias)))
    }
}
