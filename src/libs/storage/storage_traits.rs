use crate::libs::core::models::UserId;
use crate::libs::storage::records::{ActiveChat, UserRecord};
use thiserror::Error;

/// Durable user-id → record mapping shared by every core component.
pub trait UserStore: Send + Sync {
    /// Returns the stored record, or a fresh default one when the user is unknown.
    fn get(&self, user_id: UserId) -> Result<UserRecord, StoreError>;
    fn put(&self, record: &UserRecord) -> Result<(), StoreError>;
    /// Writes both records or neither.
    fn put_pair(&self, first: &UserRecord, second: &UserRecord) -> Result<(), StoreError>;
    fn scan_active_unpaired(&self, excluding: UserId) -> Result<Vec<UserId>, StoreError>;
    fn scan_paired_sessions(&self) -> Result<Vec<ActiveChat>, StoreError>;
    fn count_active(&self) -> Result<usize, StoreError>;
}

pub trait Transactional {
    fn commit(self) -> Result<(), StoreError>;
    fn rollback(self) -> Result<(), StoreError>;
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Sqlite Error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("ConnectionPool Error: {0}")]
    ConnectionPool(#[from] r2d2::Error),
    #[error("Initialization Error: {0}")]
    Initialization(String),
    #[error("Lock Poisoned: {0}")]
    Poisoned(String),
}
