//! User directory.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use haulboard_core::UserId;
use haulboard_social::User;

use crate::error::StoreError;

/// Lookup of users by id and by username.
pub trait UserStore: Send + Sync {
    /// Insert a new user. Usernames are unique (case-sensitive).
    fn insert(&self, user: User) -> Result<(), StoreError>;

    fn get(&self, user_id: UserId) -> Result<Option<User>, StoreError>;

    fn by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
}

impl<S> UserStore for Arc<S>
where
    S: UserStore + ?Sized,
{
    fn insert(&self, user: User) -> Result<(), StoreError> {
        (**self).insert(user)
    }

    fn get(&self, user_id: UserId) -> Result<Option<User>, StoreError> {
        (**self).get(user_id)
    }

    fn by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        (**self).by_username(username)
    }
}

#[derive(Debug, Default)]
struct Directory {
    by_id: HashMap<UserId, User>,
    by_name: HashMap<String, UserId>,
}

/// In-memory user directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    inner: RwLock<Directory>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for InMemoryUserStore {
    fn insert(&self, user: User) -> Result<(), StoreError> {
        let mut dir = self.inner.write().map_err(|_| StoreError::poisoned())?;
        if dir.by_name.contains_key(&user.username) {
            return Err(StoreError::Conflict(format!(
                "username '{}' is taken",
                user.username
            )));
        }
        if dir.by_id.contains_key(&user.id) {
            return Err(StoreError::Conflict(format!("user {} exists", user.id)));
        }
        dir.by_name.insert(user.username.clone(), user.id);
        dir.by_id.insert(user.id, user);
        Ok(())
    }

    fn get(&self, user_id: UserId) -> Result<Option<User>, StoreError> {
        let dir = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(dir.by_id.get(&user_id).cloned())
    }

    fn by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let dir = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(dir
            .by_name
            .get(username)
            .and_then(|id| dir.by_id.get(id))
            .cloned())
    }
}
