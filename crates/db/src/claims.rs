//! Burn claim store.
//!
//! Status transitions are single guarded UPDATE statements: the old status
//! sits in the WHERE clause, so a transition that lost a race (or repeats) is
//! a no-op rather than an overwrite, and `updated_at` moves atomically with
//! the status.

use std::sync::Arc;

use rusqlite::{params, OptionalExtension, Row};

use crate::{now_ms, pool::ConnectionPool, BurnClaim, ClaimStatus, DbError, Result};

#[derive(Clone)]
pub struct ClaimStore {
    pool: Arc<ConnectionPool>,
}

impl ClaimStore {
    pub(crate) fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    /// Inserts a claim unless one already exists for the inscription.
    pub fn insert_if_absent(&self, claim: &BurnClaim) -> Result<bool> {
        self.pool.with(|conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO burn_claims
                 (inscription_id, collection_name, token_id, sender_address, burn_txid,
                  burn_block_height, burn_block_hash, status, attest_txid, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    claim.inscription_id,
                    claim.collection_name,
                    claim.token_id as i64,
                    claim.sender_address,
                    claim.burn_txid,
                    claim.burn_block_height as i64,
                    claim.burn_block_hash,
                    claim.status.as_str(),
                    claim.attest_txid,
                    claim.created_at as i64,
                    claim.updated_at as i64,
                ],
            )?;
            Ok(changed == 1)
        })
    }

    pub fn get(&self, inscription_id: &str) -> Result<Option<BurnClaim>> {
        self.pool.with(|conn| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM burn_claims WHERE inscription_id = ?1"),
                params![inscription_id],
                row_to_claim,
            )
            .optional()?
            .transpose()
        })
    }

    pub fn by_sender(&self, sender: &str, limit: u64, offset: u64) -> Result<Vec<BurnClaim>> {
        self.pool.with(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM burn_claims WHERE sender_address = ?1
                 ORDER BY created_at DESC LIMIT ?2 OFFSET ?3"
            ))?;
            let rows = stmt
                .query_map(params![sender, limit as i64, offset as i64], row_to_claim)?
                .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
            rows.into_iter().collect()
        })
    }

    /// Claims in a given state, oldest burn first so attestation proceeds in
    /// burn order.
    pub fn by_status(&self, status: ClaimStatus) -> Result<Vec<BurnClaim>> {
        self.pool.with(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM burn_claims WHERE status = ?1
                 ORDER BY burn_block_height ASC, created_at ASC"
            ))?;
            let rows = stmt
                .query_map(params![status.as_str()], row_to_claim)?
                .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
            rows.into_iter().collect()
        })
    }

    /// Promotes every `detected` claim with enough confirmations at `height`.
    /// Returns the number promoted.
    pub fn confirm_ready(&self, height: u64, required_confirmations: u64) -> Result<u64> {
        self.pool.with(|conn| {
            let changed = conn.execute(
                "UPDATE burn_claims SET status = ?1, updated_at = ?2
                 WHERE status = ?3 AND ?4 - burn_block_height >= ?5",
                params![
                    ClaimStatus::Confirmed.as_str(),
                    now_ms() as i64,
                    ClaimStatus::Detected.as_str(),
                    height as i64,
                    required_confirmations as i64,
                ],
            )?;
            Ok(changed as u64)
        })
    }

    /// `confirmed → attested`, recording the attestation txid. Re-marking an
    /// already attested claim is a no-op, which makes worker retries safe.
    pub fn mark_attested(&self, inscription_id: &str, attest_txid: &str) -> Result<bool> {
        self.pool.with(|conn| {
            let changed = conn.execute(
                "UPDATE burn_claims SET status = ?1, attest_txid = ?2, updated_at = ?3
                 WHERE inscription_id = ?4 AND status = ?5",
                params![
                    ClaimStatus::Attested.as_str(),
                    attest_txid,
                    now_ms() as i64,
                    inscription_id,
                    ClaimStatus::Confirmed.as_str(),
                ],
            )?;
            Ok(changed == 1)
        })
    }

    /// `confirmed → failed`.
    pub fn mark_failed(&self, inscription_id: &str) -> Result<bool> {
        self.pool.with(|conn| {
            let changed = conn.execute(
                "UPDATE burn_claims SET status = ?1, updated_at = ?2
                 WHERE inscription_id = ?3 AND status = ?4",
                params![
                    ClaimStatus::Failed.as_str(),
                    now_ms() as i64,
                    inscription_id,
                    ClaimStatus::Confirmed.as_str(),
                ],
            )?;
            Ok(changed == 1)
        })
    }

    /// `failed → confirmed` across the board. Returns the number flipped.
    pub fn retry_failed(&self) -> Result<u64> {
        self.pool.with(|conn| {
            let changed = conn.execute(
                "UPDATE burn_claims SET status = ?1, updated_at = ?2 WHERE status = ?3",
                params![
                    ClaimStatus::Confirmed.as_str(),
                    now_ms() as i64,
                    ClaimStatus::Failed.as_str(),
                ],
            )?;
            Ok(changed as u64)
        })
    }

    /// Reorg rollback: only `detected` claims are removable — everything
    /// further along is either a user-visible failure worth keeping or
    /// already on the other chain.
    pub fn delete_detected_from_height(&self, height: u64) -> Result<u64> {
        self.pool.with(|conn| {
            let changed = conn.execute(
                "DELETE FROM burn_claims WHERE status = ?1 AND burn_block_height >= ?2",
                params![ClaimStatus::Detected.as_str(), height as i64],
            )?;
            Ok(changed as u64)
        })
    }

    pub fn count(&self) -> Result<u64> {
        self.pool.with(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM burn_claims", [], |row| row.get(0))?;
            Ok(count as u64)
        })
    }

    pub fn status_counts(&self) -> Result<Vec<(ClaimStatus, u64)>> {
        let raw = self.pool.with(|conn| {
            let mut stmt =
                conn.prepare("SELECT status, COUNT(*) FROM burn_claims GROUP BY status")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
                })?
                .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
            Ok(rows)
        })?;

        let mut counts: Vec<(ClaimStatus, u64)> =
            ClaimStatus::ALL.into_iter().map(|s| (s, 0)).collect();
        for (status, count) in raw {
            let status =
                ClaimStatus::parse(&status).ok_or_else(|| DbError::UnknownStatus(status))?;
            if let Some(slot) = counts.iter_mut().find(|(s, _)| *s == status) {
                slot.1 = count;
            }
        }
        Ok(counts)
    }
}

const COLUMNS: &str = "inscription_id, collection_name, token_id, sender_address, burn_txid, \
                       burn_block_height, burn_block_hash, status, attest_txid, created_at, \
                       updated_at";

fn row_to_claim(row: &Row<'_>) -> rusqlite::Result<Result<BurnClaim>> {
    let status: String = row.get(7)?;
    let Some(status) = ClaimStatus::parse(&status) else {
        return Ok(Err(DbError::UnknownStatus(status)));
    };
    Ok(Ok(BurnClaim {
        inscription_id: row.get(0)?,
        collection_name: row.get(1)?,
        token_id: row.get::<_, i64>(2)? as u64,
        sender_address: row.get(3)?,
        burn_txid: row.get(4)?,
        burn_block_height: row.get::<_, i64>(5)? as u64,
        burn_block_hash: row.get(6)?,
        status,
        attest_txid: row.get(8)?,
        created_at: row.get::<_, i64>(9)? as u64,
        updated_at: row.get::<_, i64>(10)? as u64,
    }))
}
