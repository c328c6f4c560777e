//! User cache and batched user loading.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::{fetch_all, show_many_users_url, SourceApi};
use crate::error::Result;
use crate::model::User;

/// Maximum number of ids per `show_many` request.
pub const USER_BATCH_SIZE: usize = 100;

/// Process-wide map of Zendesk user id to user.
///
/// A `None` slot means the user has been claimed for loading but is not (or
/// not yet) resolved. Claimed ids are never requested again, so a user that
/// Zendesk did not return stays unresolved for the rest of the run.
#[derive(Debug, Default)]
pub struct UserCache {
    users: HashMap<i64, Option<Arc<User>>>,
}

impl UserCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `id` for loading. Returns `false` if it is already known,
    /// resolved or in flight.
    pub fn claim(&mut self, id: i64) -> bool {
        match self.users.entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(None);
                true
            }
        }
    }

    /// Drops unresolved claims so that the ids can be claimed again later.
    pub fn release(&mut self, ids: &[i64]) {
        for id in ids {
            if matches!(self.users.get(id), Some(None)) {
                self.users.remove(id);
            }
        }
    }

    /// Stores a loaded user.
    pub fn insert(&mut self, user: User) {
        self.users.insert(user.id, Some(Arc::new(user)));
    }

    /// Returns the resolved user, if any.
    #[must_use]
    pub fn get(&self, id: i64) -> Option<Arc<User>> {
        self.users.get(&id).cloned().flatten()
    }

    /// Number of resolved users.
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.users.values().filter(|u| u.is_some()).count()
    }
}

/// Loads users by id in batches of at most [`USER_BATCH_SIZE`].
pub struct UserBatchLoader<'a> {
    api: &'a dyn SourceApi,
}

impl<'a> UserBatchLoader<'a> {
    /// Creates a loader reading from `api`.
    pub fn new(api: &'a dyn SourceApi) -> Self {
        Self { api }
    }

    /// Loads `ids` into `cache`, one request per batch. Returns how many
    /// users were resolved. Ids missing from the responses stay unresolved.
    ///
    /// # Errors
    ///
    /// Returns the first batch failure; users of earlier batches stay cached.
    pub async fn load(&self, ids: &[i64], cache: &mut UserCache) -> Result<usize> {
        let mut loaded = 0;
        for batch in ids.chunks(USER_BATCH_SIZE) {
            let url = show_many_users_url(self.api.base_url(), batch);
            let users: Vec<User> = fetch_all(self.api, "users", url)
                .await
                .map_err(|e| e.with_context("error while getting batch of users"))?;
            debug!("Loaded {} of {} users in batch", users.len(), batch.len());
            loaded += users.len();
            for user in users {
                cache.insert(user);
            }
        }
        Ok(loaded)
    }
}

#[cfg(test)]
#[path = "users_tests.rs"]
mod tests;
