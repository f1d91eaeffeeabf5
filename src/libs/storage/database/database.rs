use crate::libs::storage::database::storage_sqllite::{SqliteStore, SqliteTransaction};
use crate::libs::storage::storage_traits::{StoreError, Transactional};
use tracing::info;

/// Opens (creating if needed) the database at `path` and applies the schema.
pub fn initialize_database(path: &str) -> Result<SqliteStore, StoreError> {
    let db_store = SqliteStore::new(path)?;
    db_migration(&db_store)?;
    info!(path, "database initialized");
    Ok(db_store)
}

pub fn db_migration(db_store: &SqliteStore) -> Result<(), StoreError> {
    let mut connection = db_store.new_connection()?;
    let sqlite_transaction = SqliteTransaction::new(&mut connection)?;

    // current_chat is NULL while the user is not paired
    let migration = sqlite_transaction.inner().execute_batch(
        r#"CREATE TABLE IF NOT EXISTS users (
                user_id INTEGER PRIMARY KEY,
                is_active INTEGER NOT NULL DEFAULT 0,
                current_chat INTEGER,
                last_activity TEXT,
                country TEXT,
                language TEXT,
                gender TEXT,

                CHECK (is_active IN (0, 1))
            );
            CREATE INDEX IF NOT EXISTS idx_users_matching ON users(is_active, current_chat);
            CREATE INDEX IF NOT EXISTS idx_users_current_chat ON users(current_chat);
    "#,
    );
    if let Err(e) = migration {
        sqlite_transaction.rollback()?;
        return Err(StoreError::Initialization(e.to_string()));
    }

    sqlite_transaction.commit()
}
