//! The per-block indexing procedure and the loop that drives it.
//!
//! One block per iteration: fetch, check parent linkage, walk transactions
//! (inscriptions then burns), sweep confirmations, advance. A broken parent
//! link rolls the tip back instead of advancing; the same height is fetched
//! again next iteration and lands on the canonical chain.

use std::{sync::Arc, time::Duration};

use bitcoin::{BlockHash, Network, Transaction};
use ordbridge_bridge::{BridgeError, BridgeService};
use ordbridge_db::{DbError, Inscription, InscriptionStore};
use ordbridge_ordtx::{extract_envelopes, render_address};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::client::{BlockSource, ClientError};

#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub start_height: u64,
    pub network: Network,
    /// Sleep before re-polling a height the chain has not reached.
    pub not_found_delay: Duration,
    /// Back-off after a transient fetch or store error.
    pub error_backoff: Duration,
}

impl IndexerConfig {
    pub fn new(start_height: u64, network: Network) -> Self {
        Self {
            start_height,
            network,
            not_found_delay: Duration::from_secs(10),
            error_backoff: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Error)]
pub enum StepError {
    #[error("block {0} not yet available")]
    NotAvailable(u64),

    #[error("client: {0}")]
    Client(#[from] ClientError),

    #[error("store: {0}")]
    Store(#[from] DbError),

    #[error("bridge: {0}")]
    Bridge(#[from] BridgeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Advanced {
        height: u64,
        inscriptions: u64,
        burns: u64,
    },
    /// Parent linkage broke; state above `height` was rolled back and the
    /// height will be refetched.
    Reorged { height: u64 },
}

pub struct Indexer<C> {
    client: Arc<C>,
    store: InscriptionStore,
    bridge: Option<Arc<BridgeService>>,
    config: IndexerConfig,
    current_height: u64,
    last_block_hash: Option<BlockHash>,
    inscription_counter: u64,
}

impl<C: BlockSource> Indexer<C> {
    /// Seeds the number counter from what is already persisted, so restarts
    /// continue the dense sequence.
    pub fn new(
        client: Arc<C>,
        store: InscriptionStore,
        bridge: Option<Arc<BridgeService>>,
        config: IndexerConfig,
    ) -> Result<Self, StepError> {
        let inscription_counter = store.count()?;
        Ok(Self {
            client,
            store,
            bridge,
            current_height: config.start_height,
            config,
            last_block_hash: None,
            inscription_counter,
        })
    }

    pub fn current_height(&self) -> u64 {
        self.current_height
    }

    /// Processes exactly one height. Advances on success, rolls back on a
    /// reorg, and leaves all state untouched on error.
    pub async fn step(&mut self) -> Result<StepOutcome, StepError> {
        let height = self.current_height;
        let block = self.client.block_at(height).await.map_err(|e| match e {
            ClientError::BlockNotFound(h) => StepError::NotAvailable(h),
            other => StepError::Client(other),
        })?;

        if let Some(last) = self.last_block_hash {
            if block.header.prev_blockhash != last {
                self.handle_reorg()?;
                return Ok(StepOutcome::Reorged { height });
            }
        }

        let block_hash = block.block_hash();
        let block_hash_hex = block_hash.to_string();
        let block_time = u64::from(block.header.time);

        let mut inscriptions = 0;
        let mut burns = 0;
        for tx in &block.txdata {
            inscriptions += self.index_transaction(tx, &block_hash_hex, block_time)?;
            if let Some(bridge) = &self.bridge {
                if bridge
                    .process_transaction(tx, height, &block_hash_hex)?
                    .is_some()
                {
                    burns += 1;
                }
            }
        }

        if let Some(bridge) = &self.bridge {
            bridge.confirm(height)?;
        }

        self.last_block_hash = Some(block_hash);
        self.current_height += 1;

        Ok(StepOutcome::Advanced {
            height,
            inscriptions,
            burns,
        })
    }

    /// Extracts inscriptions from one transaction's inputs. The envelope
    /// index within the transaction is the id suffix; numbers are only
    /// consumed by rows that actually land.
    fn index_transaction(
        &mut self,
        tx: &Transaction,
        block_hash: &str,
        block_time: u64,
    ) -> Result<u64, StepError> {
        let envelopes = extract_envelopes(tx);
        if envelopes.is_empty() {
            return Ok(0);
        }

        let owner = tx
            .output
            .first()
            .map(|out| render_address(&out.script_pubkey, self.config.network))
            .unwrap_or_default();
        let txid = tx.compute_txid();

        let mut indexed = 0;
        for (local_index, envelope) in envelopes.into_iter().enumerate() {
            let id = format!("{txid}i{local_index}");
            if self.store.exists(&id)? {
                continue;
            }
            let inscription = Inscription {
                id: id.clone(),
                content_type: envelope.content_type.unwrap_or_default(),
                content: envelope.body.unwrap_or_default(),
                block_height: self.current_height,
                block_hash: block_hash.to_string(),
                txid: txid.to_string(),
                vout: 0,
                owner: owner.clone(),
                timestamp: block_time,
                inscription_number: self.inscription_counter,
            };
            if self.store.insert(&inscription)? {
                debug!(%id, number = self.inscription_counter, "inscription indexed");
                self.inscription_counter += 1;
                indexed += 1;
            }
        }
        Ok(indexed)
    }

    /// Rolls the tip back: inscriptions at or above the current height go,
    /// the number counter re-seeds from the surviving rows, and the bridge
    /// drops its unconfirmed claims. The height stays put.
    fn handle_reorg(&mut self) -> Result<(), StepError> {
        let height = self.current_height;
        warn!(%height, "parent hash mismatch, rolling back");

        let removed = self.store.delete_from_height(height)?;
        self.inscription_counter = self.store.count()?;
        if let Some(bridge) = &self.bridge {
            bridge.reorg(height)?;
        }
        self.last_block_hash = None;

        info!(%height, removed, counter = self.inscription_counter, "rollback complete");
        Ok(())
    }

    /// Drives [`Self::step`] until shutdown. Cadence: full speed while blocks
    /// are flowing, long poll at the tip, short back-off on errors.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(height = self.current_height, "indexer starting");

        while !*shutdown.borrow() {
            let delay = match self.step().await {
                Ok(StepOutcome::Advanced {
                    height,
                    inscriptions,
                    burns,
                }) => {
                    if inscriptions > 0 || burns > 0 {
                        info!(%height, inscriptions, burns, "block indexed");
                    } else {
                        debug!(%height, "block indexed");
                    }
                    None
                }
                Ok(StepOutcome::Reorged { height }) => {
                    info!(%height, "refetching after rollback");
                    None
                }
                Err(StepError::NotAvailable(height)) => {
                    debug!(%height, "waiting for block");
                    Some(self.config.not_found_delay)
                }
                Err(err) => {
                    error!(%err, height = self.current_height, "block processing failed");
                    Some(self.config.error_backoff)
                }
            };

            if let Some(delay) = delay {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shutdown.changed() => {}
                }
            }
        }

        info!(height = self.current_height, "indexer stopped");
    }
}
