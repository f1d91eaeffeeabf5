use crate::libs::core::models::UserId;
use crate::libs::storage::records::{ActiveChat, UserRecord};
use crate::libs::storage::storage_traits::{StoreError, UserStore};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Process-local store. Useful for tests and for embedding the relay without a
/// database file; contents are lost on drop.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<UserId, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn users(&self) -> Result<MutexGuard<'_, HashMap<UserId, UserRecord>>, StoreError> {
        self.users
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    /// Every stored record, ordered by user id.
    pub fn snapshot(&self) -> Result<Vec<UserRecord>, StoreError> {
        let mut records: Vec<UserRecord> = self.users()?.values().cloned().collect();
        records.sort_by_key(|r| r.user_id);
        Ok(records)
    }
}

impl UserStore for InMemoryUserStore {
    fn get(&self, user_id: UserId) -> Result<UserRecord, StoreError> {
        Ok(self
            .users()?
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| UserRecord::new(user_id)))
    }

    fn put(&self, record: &UserRecord) -> Result<(), StoreError> {
        self.users()?.insert(record.user_id, record.clone());
        Ok(())
    }

    fn put_pair(&self, first: &UserRecord, second: &UserRecord) -> Result<(), StoreError> {
        let mut users = self.users()?;
        users.insert(first.user_id, first.clone());
        users.insert(second.user_id, second.clone());
        Ok(())
    }

    fn scan_active_unpaired(&self, excluding: UserId) -> Result<Vec<UserId>, StoreError> {
        let mut ids: Vec<UserId> = self
            .users()?
            .values()
            .filter(|r| r.is_available() && r.user_id != excluding)
            .map(|r| r.user_id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn scan_paired_sessions(&self) -> Result<Vec<ActiveChat>, StoreError> {
        let users = self.users()?;
        let mut chats: Vec<ActiveChat> = users
            .values()
            .filter_map(|a| {
                let partner = a.partner?;
                let b = users.get(&partner)?;
                (a.user_id < b.user_id && b.partner == Some(a.user_id)).then(|| ActiveChat {
                    user_a: a.user_id,
                    user_b: b.user_id,
                    last_activity_a: a.last_activity,
                    last_activity_b: b.last_activity,
                })
            })
            .collect();
        chats.sort_by_key(|c| c.user_a);
        Ok(chats)
    }

    fn count_active(&self) -> Result<usize, StoreError> {
        Ok(self.users()?.values().filter(|r| r.active).count())
    }
}
