//! Bridge claim lifecycle.
//!
//! One claim per burned inscription. The indexer feeds transactions in; the
//! confirmation sweep and the attestation worker move claims along. Every
//! mutation is a single guarded store statement, so the store is the
//! serialization point and this service keeps no state between calls.

use bitcoin::{Network, Transaction};
use ordbridge_db::{now_ms, BurnClaim, ClaimStatus, ClaimStore};
use ordbridge_ordtx::{match_burn, BurnCandidate};
use tracing::{debug, info};

use crate::{CollectionRegistry, Result};

/// Page cap for sender-scoped claim queries.
pub const MAX_CLAIM_PAGE: u64 = 1000;

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Address burns must pay on their first output.
    pub burn_address: String,
    /// When set, output 1 must pay this address for the fee to count.
    pub oracle_fee_address: Option<String>,
    pub collection_name: String,
    pub collection_symbol: String,
    /// Depth at which a detected burn becomes attestable.
    pub required_confirmations: u64,
    /// 0 disables the fee check entirely.
    pub min_fee_sats: u64,
    pub network: Network,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeStats {
    pub total_claims: u64,
    pub by_status: Vec<(ClaimStatus, u64)>,
    pub collection_size: usize,
    pub burn_address: String,
    pub required_confirmations: u64,
    pub min_fee_sats: u64,
}

pub struct BridgeService {
    claims: ClaimStore,
    collection: CollectionRegistry,
    config: BridgeConfig,
}

impl BridgeService {
    pub fn new(claims: ClaimStore, collection: CollectionRegistry, config: BridgeConfig) -> Self {
        Self {
            claims,
            collection,
            config,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn collection(&self) -> &CollectionRegistry {
        &self.collection
    }

    /// Burn detection entry point, called once per indexed transaction.
    /// Returns the status of the claim created, if any.
    pub fn process_transaction(
        &self,
        tx: &Transaction,
        height: u64,
        block_hash: &str,
    ) -> Result<Option<ClaimStatus>> {
        let Some(candidate) = match_burn(
            tx,
            &self.config.burn_address,
            self.config.oracle_fee_address.as_deref(),
            self.config.network,
        ) else {
            return Ok(None);
        };
        self.process_burn(&candidate, height, block_hash)
    }

    /// Registers a burn that already matched the burn shape. Silently drops
    /// burns of inscriptions outside the collection and repeat burns.
    pub fn process_burn(
        &self,
        candidate: &BurnCandidate,
        height: u64,
        block_hash: &str,
    ) -> Result<Option<ClaimStatus>> {
        let Some(item) = self.collection.by_inscription_id(&candidate.inscription_id) else {
            debug!(id = %candidate.inscription_id, "burned inscription not in collection");
            return Ok(None);
        };
        if self.claims.get(&candidate.inscription_id)?.is_some() {
            debug!(id = %candidate.inscription_id, "claim already exists");
            return Ok(None);
        }

        let status = if self.config.min_fee_sats > 0 && candidate.fee_paid < self.config.min_fee_sats
        {
            ClaimStatus::Underpaid
        } else {
            ClaimStatus::Detected
        };

        let now = now_ms();
        let claim = BurnClaim {
            inscription_id: candidate.inscription_id.clone(),
            collection_name: self.config.collection_name.clone(),
            token_id: item.token_id,
            sender_address: candidate.sender_address.clone(),
            burn_txid: candidate.burn_txid.clone(),
            burn_block_height: height,
            burn_block_hash: block_hash.to_string(),
            status,
            attest_txid: None,
            created_at: now,
            updated_at: now,
        };

        if !self.claims.insert_if_absent(&claim)? {
            return Ok(None);
        }
        info!(
            id = %claim.inscription_id,
            token_id = claim.token_id,
            %status,
            %height,
            "burn claim registered"
        );
        Ok(Some(status))
    }

    /// Promotes detected claims that reached the confirmation depth at the
    /// current height. Returns the count promoted.
    pub fn confirm(&self, height: u64) -> Result<u64> {
        let promoted = self
            .claims
            .confirm_ready(height, self.config.required_confirmations)?;
        if promoted > 0 {
            info!(%height, promoted, "claims confirmed");
        }
        Ok(promoted)
    }

    /// Puts every failed claim back in the attestation queue.
    pub fn retry_failed(&self) -> Result<u64> {
        let retried = self.claims.retry_failed()?;
        if retried > 0 {
            info!(retried, "failed claims requeued");
        }
        Ok(retried)
    }

    /// Rolls back claims invalidated by a reorg at `height`. Only detected
    /// claims go; later states are deliberately preserved.
    pub fn reorg(&self, height: u64) -> Result<u64> {
        let removed = self.claims.delete_detected_from_height(height)?;
        if removed > 0 {
            info!(%height, removed, "detected claims rolled back by reorg");
        }
        Ok(removed)
    }

    pub fn get(&self, inscription_id: &str) -> Result<Option<BurnClaim>> {
        Ok(self.claims.get(inscription_id)?)
    }

    pub fn by_sender(&self, sender: &str, limit: u64, offset: u64) -> Result<Vec<BurnClaim>> {
        Ok(self
            .claims
            .by_sender(sender, limit.min(MAX_CLAIM_PAGE), offset)?)
    }

    /// The attestation queue: confirmed claims, oldest burns first.
    pub fn ready_for_attestation(&self) -> Result<Vec<BurnClaim>> {
        Ok(self.claims.by_status(ClaimStatus::Confirmed)?)
    }

    pub fn mark_attested(&self, inscription_id: &str, attest_txid: &str) -> Result<bool> {
        Ok(self.claims.mark_attested(inscription_id, attest_txid)?)
    }

    pub fn mark_failed(&self, inscription_id: &str) -> Result<bool> {
        Ok(self.claims.mark_failed(inscription_id)?)
    }

    pub fn stats(&self) -> Result<BridgeStats> {
        Ok(BridgeStats {
            total_claims: self.claims.count()?,
            by_status: self.claims.status_counts()?,
            collection_size: self.collection.len(),
            burn_address: self.config.burn_address.clone(),
            required_confirmations: self.config.required_confirmations,
            min_fee_sats: self.config.min_fee_sats,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use ordbridge_db::Database;

    use super::*;
    use crate::collection::RawCollectionItem;

    pub(crate) const BURN_ADDRESS: &str = "bcrt1pburnburnburn";
    pub(crate) const COLLECTION_ID_7: &str =
        "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33bi0";

    pub(crate) fn service_with_min_fee(min_fee_sats: u64) -> BridgeService {
        let db = Database::open_memory().expect("open");
        // Token ids 0..=7; the last item is the one the tests burn.
        let mut raw: Vec<RawCollectionItem> = (0..7)
            .map(|i| RawCollectionItem {
                id: format!("{:064x}i0", i + 1),
                meta: serde_json::Value::Null,
            })
            .collect();
        raw.push(RawCollectionItem {
            id: COLLECTION_ID_7.to_string(),
            meta: serde_json::Value::Null,
        });
        let collection = CollectionRegistry::from_raw(raw);

        BridgeService::new(
            db.claims(),
            collection,
            BridgeConfig {
                burn_address: BURN_ADDRESS.to_string(),
                oracle_fee_address: Some("bcrt1poracle".to_string()),
                collection_name: "punks".to_string(),
                collection_symbol: "PNK".to_string(),
                required_confirmations: 6,
                min_fee_sats,
                network: Network::Regtest,
            },
        )
    }

    /// A taproot sender with a fixed witness program, rendered through the
    /// same path the indexer uses.
    pub(crate) fn sender_address() -> String {
        let mut script_bytes = vec![0x51, 0x20];
        script_bytes.extend_from_slice(&[0x5a; 32]);
        let script = bitcoin::ScriptBuf::from_bytes(script_bytes);
        ordbridge_ordtx::render_address(&script, Network::Regtest)
    }

    pub(crate) fn candidate(fee_paid: u64) -> BurnCandidate {
        BurnCandidate {
            inscription_id: COLLECTION_ID_7.to_string(),
            burn_txid: "f".repeat(64),
            sender_address: sender_address(),
            fee_paid,
        }
    }
}
