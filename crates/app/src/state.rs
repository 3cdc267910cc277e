use std::sync::{Arc, PoisonError, RwLock};

use status_sync_core::{StatusMap, UserStatus};

/// In-memory map of the statuses fetched from the chat server.
#[derive(Debug, Clone, Default)]
pub struct StatusStore {
    inner: Arc<RwLock<StatusMap>>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies the current map so loaders can read it without holding the lock.
    pub fn snapshot(&self) -> StatusMap {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get(&self, user_id: &str) -> Option<UserStatus> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .cloned()
    }

    /// Replaces the stored status of every user in `statuses`. Returns the new size.
    pub fn apply(&self, statuses: Vec<UserStatus>) -> usize {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        for status in statuses {
            map.insert(status.user_id.clone(), status);
        }
        map.len()
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
