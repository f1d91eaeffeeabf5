use crate::libs::core::models::{Preferences, UserId};
use crate::libs::storage::records::{ActiveChat, UserRecord};
use crate::libs::storage::storage_traits::{StoreError, Transactional, UserStore};
use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Result, Row, Transaction};
use std::time::Duration;
use tracing::debug;

const USER_COLUMNS: &str =
    "user_id, is_active, current_chat, last_activity, country, language, gender";

pub struct SqliteTransaction<'conn> {
    tx: Transaction<'conn>,
}

impl<'conn> SqliteTransaction<'conn> {
    pub fn new(conn: &'conn mut PooledConnection<SqliteConnectionManager>) -> Result<Self, StoreError> {
        let trans = conn.transaction()?;
        Ok(Self { tx: trans })
    }

    pub fn inner(&self) -> &Transaction<'conn> {
        &self.tx
    }

    pub fn load_user(&self, user_id: UserId) -> Result<Option<UserRecord>, StoreError> {
        let record = self
            .tx
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
                params![user_id],
                user_from_row,
            )
            .optional()?;
        Ok(record)
    }

    pub fn store_user(&self, record: &UserRecord) -> Result<(), StoreError> {
        self.tx.execute(
            "INSERT OR REPLACE INTO users
             (user_id, is_active, current_chat, last_activity, country, language, gender)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.user_id,
                record.active,
                record.partner,
                record.last_activity,
                record.preferences.country,
                record.preferences.language,
                record.preferences.gender,
            ],
        )?;
        Ok(())
    }
}

impl<'conn> Transactional for SqliteTransaction<'conn> {
    fn commit(self) -> Result<(), StoreError> {
        Ok(self.tx.commit()?)
    }

    fn rollback(self) -> Result<(), StoreError> {
        Ok(self.tx.rollback()?)
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    let last_activity: Option<DateTime<Utc>> = row.get(3)?;
    Ok(UserRecord {
        user_id: row.get(0)?,
        active: row.get(1)?,
        partner: row.get(2)?,
        last_activity: last_activity.unwrap_or_else(Utc::now),
        preferences: Preferences {
            country: row.get(4)?,
            language: row.get(5)?,
            gender: row.get(6)?,
        },
    })
}

#[derive(Debug, Clone)]
pub struct SqliteStore {
    conn_pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    pub fn new(db_path: &str) -> Result<Self, StoreError> {
        let manager = SqliteConnectionManager::file(db_path)
            .with_init(|conn| conn.busy_timeout(Duration::from_secs(5)));
        let pool = Pool::new(manager)?;
        Ok(Self { conn_pool: pool })
    }

    pub fn new_connection(&self) -> Result<PooledConnection<SqliteConnectionManager>, StoreError> {
        Ok(self.conn_pool.get()?)
    }
}

impl UserStore for SqliteStore {
    fn get(&self, user_id: UserId) -> Result<UserRecord, StoreError> {
        let mut connection = self.new_connection()?;
        let tx = SqliteTransaction::new(&mut connection)?;
        let record = tx.load_user(user_id)?;
        tx.commit()?;
        Ok(record.unwrap_or_else(|| UserRecord::new(user_id)))
    }

    fn put(&self, record: &UserRecord) -> Result<(), StoreError> {
        let mut connection = self.new_connection()?;
        let tx = SqliteTransaction::new(&mut connection)?;
        tx.store_user(record)?;
        tx.commit()
    }

    fn put_pair(&self, first: &UserRecord, second: &UserRecord) -> Result<(), StoreError> {
        let mut connection = self.new_connection()?;
        let tx = SqliteTransaction::new(&mut connection)?;
        // dropping the transaction on an early return rolls both writes back
        tx.store_user(first)?;
        tx.store_user(second)?;
        tx.commit()?;
        debug!(first = %first.user_id, second = %second.user_id, "stored user pair");
        Ok(())
    }

    fn scan_active_unpaired(&self, excluding: UserId) -> Result<Vec<UserId>, StoreError> {
        let connection = self.new_connection()?;
        let mut stmt = connection.prepare(
            "SELECT user_id FROM users
             WHERE is_active = 1
               AND current_chat IS NULL
               AND user_id != ?1
             ORDER BY user_id",
        )?;
        let ids = stmt
            .query_map(params![excluding], |row| row.get::<_, UserId>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    fn scan_paired_sessions(&self) -> Result<Vec<ActiveChat>, StoreError> {
        let connection = self.new_connection()?;
        let mut stmt = connection.prepare(
            "SELECT u1.user_id, u2.user_id, u1.last_activity, u2.last_activity
             FROM users u1, users u2
             WHERE u1.current_chat = u2.user_id
               AND u2.current_chat = u1.user_id
               AND u1.user_id < u2.user_id
             ORDER BY u1.user_id",
        )?;
        let now = Utc::now();
        let chats = stmt
            .query_map([], |row| {
                let last_a: Option<DateTime<Utc>> = row.get(2)?;
                let last_b: Option<DateTime<Utc>> = row.get(3)?;
                Ok(ActiveChat {
                    user_a: row.get(0)?,
                    user_b: row.get(1)?,
                    last_activity_a: last_a.unwrap_or(now),
                    last_activity_b: last_b.unwrap_or(now),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(chats)
    }

    fn count_active(&self) -> Result<usize, StoreError> {
        let connection = self.new_connection()?;
        let count: i64 =
            connection.query_row("SELECT COUNT(*) FROM users WHERE is_active = 1", [], |row| {
                row.get(0)
            })?;
        Ok(count as usize)
    }
}
