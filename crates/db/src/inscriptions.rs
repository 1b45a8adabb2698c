//! Inscription store queries.

use std::sync::Arc;

use rusqlite::{params, OptionalExtension, Row};

use crate::{pool::ConnectionPool, Inscription, Result};

/// Hard caps on page sizes, applied here so every caller gets them.
pub const MAX_PAGE: u64 = 1000;
pub const MAX_LATEST: u64 = 100;

/// Aggregate numbers for the stats endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub total: u64,
    pub distinct_owners: u64,
    /// Content type → count, most frequent first.
    pub by_content_type: Vec<(String, u64)>,
}

#[derive(Clone)]
pub struct InscriptionStore {
    pool: Arc<ConnectionPool>,
}

impl InscriptionStore {
    pub(crate) fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    /// Inserts an inscription. A duplicate id is a silent no-op; the return
    /// value says whether a row actually landed, which is what number
    /// assignment keys off.
    pub fn insert(&self, inscription: &Inscription) -> Result<bool> {
        self.pool.with(|conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO inscriptions
                 (id, content_type, content, block_height, block_hash, txid, vout,
                  owner, timestamp, inscription_number)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    inscription.id,
                    inscription.content_type,
                    inscription.content,
                    inscription.block_height as i64,
                    inscription.block_hash,
                    inscription.txid,
                    inscription.vout as i64,
                    inscription.owner,
                    inscription.timestamp as i64,
                    inscription.inscription_number as i64,
                ],
            )?;
            Ok(changed == 1)
        })
    }

    pub fn exists(&self, id: &str) -> Result<bool> {
        self.pool.with(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM inscriptions WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn get(&self, id: &str) -> Result<Option<Inscription>> {
        self.pool.with(|conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {COLUMNS} FROM inscriptions WHERE id = ?1"),
                    params![id],
                    row_to_inscription,
                )
                .optional()?)
        })
    }

    pub fn by_owner(&self, owner: &str, limit: u64, offset: u64) -> Result<Vec<Inscription>> {
        self.pool.with(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM inscriptions WHERE owner = ?1
                 ORDER BY inscription_number DESC LIMIT ?2 OFFSET ?3"
            ))?;
            let rows = stmt
                .query_map(
                    params![owner, limit.min(MAX_PAGE) as i64, offset as i64],
                    row_to_inscription,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn latest(&self, limit: u64) -> Result<Vec<Inscription>> {
        self.pool.with(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM inscriptions ORDER BY inscription_number DESC LIMIT ?1"
            ))?;
            let rows = stmt
                .query_map(params![limit.min(MAX_LATEST) as i64], row_to_inscription)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn by_content_type(&self, content_type: &str, limit: u64) -> Result<Vec<Inscription>> {
        self.pool.with(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM inscriptions WHERE content_type = ?1
                 ORDER BY inscription_number DESC LIMIT ?2"
            ))?;
            let rows = stmt
                .query_map(
                    params![content_type, limit.min(MAX_PAGE) as i64],
                    row_to_inscription,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count(&self) -> Result<u64> {
        self.pool.with(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM inscriptions", [], |row| row.get(0))?;
            Ok(count as u64)
        })
    }

    pub fn stats(&self) -> Result<StoreStats> {
        self.pool.with(|conn| {
            let total: i64 =
                conn.query_row("SELECT COUNT(*) FROM inscriptions", [], |row| row.get(0))?;
            let distinct_owners: i64 = conn.query_row(
                "SELECT COUNT(DISTINCT owner) FROM inscriptions WHERE owner != ''",
                [],
                |row| row.get(0),
            )?;

            let mut stmt = conn.prepare(
                "SELECT content_type, COUNT(*) AS n FROM inscriptions
                 GROUP BY content_type ORDER BY n DESC",
            )?;
            let by_content_type = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(StoreStats {
                total: total as u64,
                distinct_owners: distinct_owners as u64,
                by_content_type,
            })
        })
    }

    /// Rolls back every inscription at or above `height`. Returns the number
    /// of rows removed.
    pub fn delete_from_height(&self, height: u64) -> Result<u64> {
        self.pool.with(|conn| {
            let removed = conn.execute(
                "DELETE FROM inscriptions WHERE block_height >= ?1",
                params![height as i64],
            )?;
            Ok(removed as u64)
        })
    }
}

const COLUMNS: &str = "id, content_type, content, block_height, block_hash, txid, vout, owner, \
                       timestamp, inscription_number";

fn row_to_inscription(row: &Row<'_>) -> rusqlite::Result<Inscription> {
    Ok(Inscription {
        id: row.get(0)?,
        content_type: row.get(1)?,
        content: row.get(2)?,
        block_height: row.get::<_, i64>(3)? as u64,
        block_hash: row.get(4)?,
        txid: row.get(5)?,
        vout: row.get::<_, i64>(6)? as u32,
        owner: row.get(7)?,
        timestamp: row.get::<_, i64>(8)? as u64,
        inscription_number: row.get::<_, i64>(9)? as u64,
    })
}

#[cfg(test)]
mod tests {
    use crate::Database;

    use super::*;

    fn store() -> InscriptionStore {
        Database::open_memory().expect("open").inscriptions()
    }

    fn inscription(id: &str, number: u64, height: u64, owner: &str) -> Inscription {
        Inscription {
            id: id.to_string(),
            content_type: "text/plain".to_string(),
            content: b"hello".to_vec(),
            block_height: height,
            block_hash: format!("hash-{height}"),
            txid: id.split('i').next().unwrap_or_default().to_string(),
            vout: 0,
            owner: owner.to_string(),
            timestamp: 1_700_000_000 + number,
            inscription_number: number,
        }
    }

    #[test]
    fn insert_and_get_round_trip() {
        let store = store();
        let insc = inscription("a1i0", 0, 100, "bcrt1qowner");
        assert!(store.insert(&insc).expect("insert"));
        assert_eq!(store.get("a1i0").expect("get"), Some(insc));
        assert_eq!(store.get("missing").expect("get"), None);
    }

    #[test]
    fn duplicate_insert_is_silent_noop() {
        let store = store();
        let insc = inscription("a1i0", 0, 100, "o");
        assert!(store.insert(&insc).expect("insert"));
        assert!(!store.insert(&insc).expect("insert again"));
        assert_eq!(store.count().expect("count"), 1);
    }

    #[test]
    fn by_owner_pages_and_clamps() {
        let store = store();
        for i in 0..5 {
            store
                .insert(&inscription(&format!("t{i}i0"), i, 100 + i, "alice"))
                .expect("insert");
        }
        store
            .insert(&inscription("zzi0", 5, 200, "bob"))
            .expect("insert");

        let page = store.by_owner("alice", 2, 1).expect("page");
        assert_eq!(page.len(), 2);
        // Newest first; offset 1 skips number 4.
        assert_eq!(page[0].inscription_number, 3);

        let all = store.by_owner("alice", 10_000, 0).expect("all");
        assert_eq!(all.len(), 5);
    }

    #[test]
    fn latest_orders_by_number_desc() {
        let store = store();
        for i in 0..4 {
            store
                .insert(&inscription(&format!("t{i}i0"), i, 100, "o"))
                .expect("insert");
        }
        let latest = store.latest(2).expect("latest");
        assert_eq!(
            latest.iter().map(|i| i.inscription_number).collect::<Vec<_>>(),
            vec![3, 2]
        );
    }

    #[test]
    fn stats_histogram() {
        let store = store();
        let mut a = inscription("a1i0", 0, 100, "alice");
        a.content_type = "image/png".into();
        store.insert(&a).expect("insert");
        store.insert(&inscription("b1i0", 1, 100, "alice")).expect("insert");
        store.insert(&inscription("c1i0", 2, 101, "bob")).expect("insert");

        let stats = store.stats().expect("stats");
        assert_eq!(stats.total, 3);
        assert_eq!(stats.distinct_owners, 2);
        assert_eq!(stats.by_content_type[0], ("text/plain".to_string(), 2));
    }

    #[test]
    fn delete_from_height_removes_at_and_above() {
        let store = store();
        store.insert(&inscription("a1i0", 0, 100, "o")).expect("insert");
        store.insert(&inscription("b1i0", 1, 101, "o")).expect("insert");
        store.insert(&inscription("c1i0", 2, 102, "o")).expect("insert");

        let removed = store.delete_from_height(101).expect("delete");
        assert_eq!(removed, 2);
        assert_eq!(store.count().expect("count"), 1);
        assert!(store.exists("a1i0").expect("exists"));
        assert!(!store.exists("b1i0").expect("exists"));
    }
}
