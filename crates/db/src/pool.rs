//! Fixed-size connection pool.
//!
//! WAL readers run concurrently, so the query surface hands each request its
//! own connection instead of serializing every read behind one lock. Writes
//! still funnel through SQLite's write lock; `busy_timeout` covers the rare
//! collision between the indexer and a bridge mutation.

use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags};

use crate::{configure, migrate, Result};

/// Connections per database, sized for the HTTP query load.
pub const POOL_SIZE: usize = 20;

/// Distinguishes the shared-cache databases of concurrently running tests.
static MEMORY_DB_ID: AtomicUsize = AtomicUsize::new(0);

enum Target {
    File(PathBuf),
    /// Named shared-cache in-memory database, so every pooled connection
    /// sees the same data. Used by tests.
    Memory(String),
}

impl Target {
    fn connect(&self) -> rusqlite::Result<Connection> {
        match self {
            Target::File(path) => Connection::open(path),
            Target::Memory(name) => Connection::open_with_flags(
                format!("file:{name}?mode=memory&cache=shared"),
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            ),
        }
    }
}

pub(crate) struct ConnectionPool {
    connections: Vec<Mutex<Connection>>,
    next: AtomicUsize,
}

impl ConnectionPool {
    pub(crate) fn open_file(path: &Path) -> Result<Self> {
        Self::open(Target::File(path.to_path_buf()))
    }

    pub(crate) fn open_memory() -> Result<Self> {
        let id = MEMORY_DB_ID.fetch_add(1, Ordering::Relaxed);
        Self::open(Target::Memory(format!("ordbridge-mem-{id}")))
    }

    fn open(target: Target) -> Result<Self> {
        let mut connections = Vec::with_capacity(POOL_SIZE);
        for i in 0..POOL_SIZE {
            let conn = target.connect()?;
            configure(&conn)?;
            // The schema lands once, before any other connection can see a
            // partially created database.
            if i == 0 {
                migrate(&conn)?;
            }
            connections.push(Mutex::new(conn));
        }
        Ok(Self {
            connections,
            next: AtomicUsize::new(0),
        })
    }

    /// Runs `f` on a pooled connection: an idle one when available, the next
    /// in rotation otherwise.
    pub(crate) fn with<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        for _ in 0..self.connections.len() {
            let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.connections.len();
            if let Some(conn) = self.connections[idx].try_lock() {
                return f(&conn);
            }
        }
        // Every connection is busy; wait our turn on one.
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.connections.len();
        f(&self.connections[idx].lock())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn pooled_connections_share_one_database() {
        let pool = ConnectionPool::open_memory().expect("open");
        pool.with(|conn| {
            conn.execute(
                "INSERT INTO inscriptions
                 (id, content_type, content, block_height, block_hash, txid, vout,
                  owner, timestamp, inscription_number)
                 VALUES ('xi0', 't', x'', 1, 'h', 'x', 0, 'o', 0, 0)",
                [],
            )?;
            Ok(())
        })
        .expect("insert");

        // Exhaust the rotation so the read lands on every other connection.
        for _ in 0..POOL_SIZE {
            let count: i64 = pool
                .with(|conn| {
                    Ok(conn.query_row("SELECT COUNT(*) FROM inscriptions", [], |row| row.get(0))?)
                })
                .expect("count");
            assert_eq!(count, 1);
        }
    }

    #[test]
    fn concurrent_readers_make_progress() {
        let pool = Arc::new(ConnectionPool::open_memory().expect("open"));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = pool.clone();
                std::thread::spawn(move || {
                    for _ in 0..20 {
                        let count: i64 = pool
                            .with(|conn| {
                                Ok(conn.query_row(
                                    "SELECT COUNT(*) FROM burn_claims",
                                    [],
                                    |row| row.get(0),
                                )?)
                            })
                            .expect("count");
                        assert_eq!(count, 0);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("reader thread");
        }
    }

    #[test]
    fn memory_databases_are_isolated_from_each_other() {
        let a = ConnectionPool::open_memory().expect("open a");
        let b = ConnectionPool::open_memory().expect("open b");
        a.with(|conn| {
            conn.execute(
                "INSERT INTO inscriptions
                 (id, content_type, content, block_height, block_hash, txid, vout,
                  owner, timestamp, inscription_number)
                 VALUES ('xi0', 't', x'', 1, 'h', 'x', 0, 'o', 0, 0)",
                [],
            )?;
            Ok(())
        })
        .expect("insert");

        let count: i64 = b
            .with(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM inscriptions", [], |row| row.get(0))?)
            })
            .expect("count");
        assert_eq!(count, 0);
    }
}
