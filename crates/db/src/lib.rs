//! SQLite persistence for inscriptions and bridge claims.
//!
//! One WAL-mode database holds both tables, reached through a fixed pool of
//! connections ([`pool::POOL_SIZE`]) so concurrent reads from the query
//! surface proceed in parallel. Every operation is a self-contained
//! statement (or an implicit transaction), so no connection or transaction
//! ever spans a suspension point in the callers.

pub mod claims;
pub mod inscriptions;
pub mod pool;
pub mod schema;
mod types;

use std::{
    path::Path,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use rusqlite::Connection;

use crate::pool::ConnectionPool;

pub use claims::ClaimStore;
pub use inscriptions::{InscriptionStore, StoreStats};
pub use types::{BurnClaim, ClaimStatus, Inscription};

/// Schema version stored in `PRAGMA user_version`.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("unknown claim status in database: {0}")]
    UnknownStatus(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Shared handle to the database. Cheap to clone; hands out the per-table
/// stores.
#[derive(Clone)]
pub struct Database {
    pool: Arc<ConnectionPool>,
}

impl Database {
    /// Opens (or creates) the database at `path` and applies the schema.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            pool: Arc::new(ConnectionPool::open_file(path)?),
        })
    }

    /// In-memory database, used by tests.
    pub fn open_memory() -> Result<Self> {
        Ok(Self {
            pool: Arc::new(ConnectionPool::open_memory()?),
        })
    }

    pub fn inscriptions(&self) -> InscriptionStore {
        InscriptionStore::new(self.pool.clone())
    }

    pub fn claims(&self) -> ClaimStore {
        ClaimStore::new(self.pool.clone())
    }
}

fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;
    Ok(())
}

fn migrate(conn: &Connection) -> Result<()> {
    let version: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if version < SCHEMA_VERSION {
        conn.execute_batch(schema::SCHEMA)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }
    Ok(())
}

/// Milliseconds since the Unix epoch, for claim audit timestamps.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_applies_once() {
        let db = Database::open_memory().expect("open");
        let version: u32 = db
            .pool
            .with(|conn| {
                Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
            })
            .expect("user_version");
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn stores_share_one_database() {
        let db = Database::open_memory().expect("open");
        assert_eq!(db.inscriptions().count().expect("count"), 0);
        assert_eq!(db.claims().count().expect("count"), 0);
    }
}
