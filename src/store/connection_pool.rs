use std::path::Path;

use anyhow::Result;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::constants::PERSIST_TIMEOUT;

pub type ConnectionPool = Pool<SqliteConnectionManager>;

/// Every pooled connection runs in WAL mode with foreign keys enforced, so encounter
/// deletes cascade and readers never see a half-written encounter.
pub fn get(path: &Path) -> Result<ConnectionPool> {
    let manager = SqliteConnectionManager::file(path).with_init(|connection| {
        connection.busy_timeout(PERSIST_TIMEOUT)?;
        connection.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        connection.pragma_update(None, "synchronous", "NORMAL")?;
        connection.pragma_update(None, "foreign_keys", "ON")
    });

    let pool = Pool::builder().max_size(4).build(manager)?;

    Ok(pool)
}
