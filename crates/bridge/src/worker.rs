//! Attestation worker.
//!
//! Turns confirmed claims into on-chain mint calls, at most once per claim.
//! Calls within one cycle are chained on each other's unconfirmed change so
//! the cycle never races a wallet scan; the batch cap keeps the chain under
//! the mempool's ancestor limit.

use std::sync::Arc;

use alloy_primitives::{B256, U256};
use bitcoin::{Address, Network};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    contract::{
        inscription_hash, AttestBurnCall, ContractTransport, TxParams, UnspentOutput,
    },
    BridgeService, Result,
};

/// Claims attempted per cycle. One below the mempool's 25-ancestor policy
/// with headroom for the funding chain itself.
pub const MAX_BATCH_SIZE: usize = 20;

/// Ceiling on sats a single call may spend, guarding against runaway fee
/// estimation in the transport.
pub const MAX_SATS_TO_SPEND: u64 = 100_000;

#[derive(Debug, Error)]
enum SenderError {
    #[error("empty sender address")]
    Empty,

    #[error("unparseable address: {0}")]
    Parse(String),

    #[error("not a taproot address")]
    NotTaproot,
}

/// Counts for one worker cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleOutcome {
    pub attested: u64,
    pub failed: u64,
}

pub struct AttestationWorker<T> {
    bridge: Arc<BridgeService>,
    transport: Arc<T>,
    network: Network,
}

impl<T: ContractTransport> AttestationWorker<T> {
    pub fn new(bridge: Arc<BridgeService>, transport: Arc<T>, network: Network) -> Self {
        Self {
            bridge,
            transport,
            network,
        }
    }

    /// One sweep over the attestation queue. Errors on individual claims are
    /// absorbed into `failed` status; only store failures propagate.
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        let ready = self.bridge.ready_for_attestation()?;
        let mut outcome = CycleOutcome::default();
        if ready.is_empty() {
            return Ok(outcome);
        }

        debug!(queued = ready.len(), "starting attestation cycle");
        let mut pending_utxos: Vec<UnspentOutput> = Vec::new();

        for claim in ready.into_iter().take(MAX_BATCH_SIZE) {
            let id = claim.inscription_id;

            let sender = match taproot_sender(&claim.sender_address, self.network) {
                Ok(sender) => sender,
                Err(err) => {
                    warn!(%id, %err, "sender address unusable, failing claim");
                    self.bridge.mark_failed(&id)?;
                    outcome.failed += 1;
                    continue;
                }
            };

            let call = AttestBurnCall {
                sender,
                inscription_hash: inscription_hash(&id),
                token_id: U256::from(claim.token_id),
            };

            match self.transport.simulate(&call).await {
                Ok(simulation) => {
                    if let Some(reason) = simulation.revert {
                        warn!(%id, %reason, "simulation reverted, failing claim");
                        self.bridge.mark_failed(&id)?;
                        outcome.failed += 1;
                        continue;
                    }
                }
                Err(err) => {
                    warn!(%id, %err, "simulation transport error, failing claim");
                    self.bridge.mark_failed(&id)?;
                    outcome.failed += 1;
                    continue;
                }
            }

            let params = TxParams {
                max_sats_to_spend: MAX_SATS_TO_SPEND,
                fee_rate: 0,
                priority_fee: 0,
                utxos: (!pending_utxos.is_empty()).then(|| pending_utxos.clone()),
            };

            match self.transport.submit(&call, &params).await {
                Ok(receipt) => {
                    // Chain the next call on this one's unconfirmed change.
                    pending_utxos = receipt.new_outputs;
                    self.bridge.mark_attested(&id, &receipt.txid)?;
                    info!(%id, txid = %receipt.txid, "claim attested");
                    outcome.attested += 1;
                }
                Err(err) => {
                    warn!(%id, %err, "broadcast failed, failing claim");
                    self.bridge.mark_failed(&id)?;
                    outcome.failed += 1;
                }
            }
        }

        Ok(outcome)
    }
}

/// Converts a bech32m sender address into the contract's 32-byte account
/// form. Only v1 witness programs qualify; the bridge requires taproot
/// senders.
fn taproot_sender(address: &str, network: Network) -> std::result::Result<B256, SenderError> {
    if address.is_empty() {
        return Err(SenderError::Empty);
    }
    let address = address
        .parse::<Address<_>>()
        .map_err(|e| SenderError::Parse(e.to_string()))?
        .require_network(network)
        .map_err(|e| SenderError::Parse(e.to_string()))?;

    let script = address.script_pubkey();
    if !script.is_p2tr() {
        return Err(SenderError::NotTaproot);
    }
    Ok(B256::from_slice(&script.as_bytes()[2..34]))
}

#[cfg(test)]
mod tests {
    use mockall::predicate::always;
    use ordbridge_db::ClaimStatus;

    use super::*;
    use crate::{
        contract::{MockContractTransport, Simulation, TransportError, TxReceipt},
        service::test_utils::{candidate, service_with_min_fee, COLLECTION_ID_7},
    };

    const NETWORK: Network = Network::Regtest;

    fn confirmed_service() -> Arc<BridgeService> {
        let service = service_with_min_fee(0);
        service
            .process_burn(&candidate(0), 100, "blockhash")
            .expect("process");
        service.confirm(106).expect("confirm");
        Arc::new(service)
    }

    fn worker(
        service: Arc<BridgeService>,
        transport: MockContractTransport,
    ) -> AttestationWorker<MockContractTransport> {
        AttestationWorker::new(service, Arc::new(transport), NETWORK)
    }

    #[tokio::test]
    async fn attests_confirmed_claim() {
        let service = confirmed_service();

        let mut transport = MockContractTransport::new();
        transport
            .expect_simulate()
            .times(1)
            .returning(|_| Ok(Simulation::ok()));
        transport
            .expect_submit()
            .times(1)
            .withf(|call, params| {
                params.max_sats_to_spend == MAX_SATS_TO_SPEND
                    && params.fee_rate == 0
                    && params.utxos.is_none()
                    && call.token_id == U256::from(7u64)
                    && call.inscription_hash == inscription_hash(COLLECTION_ID_7)
            })
            .returning(|_, _| {
                Ok(TxReceipt {
                    txid: "attest-txid".to_string(),
                    new_outputs: vec![],
                })
            });

        let outcome = worker(service.clone(), transport)
            .run_cycle()
            .await
            .expect("cycle");
        assert_eq!(outcome, CycleOutcome { attested: 1, failed: 0 });

        let claim = service.get(COLLECTION_ID_7).expect("get").expect("claim");
        assert_eq!(claim.status, ClaimStatus::Attested);
        assert_eq!(claim.attest_txid.as_deref(), Some("attest-txid"));
    }

    #[tokio::test]
    async fn empty_queue_makes_no_transport_calls() {
        let service = Arc::new(service_with_min_fee(0));
        let mut transport = MockContractTransport::new();
        transport.expect_simulate().times(0);
        transport.expect_submit().times(0);

        let outcome = worker(service, transport).run_cycle().await.expect("cycle");
        assert_eq!(outcome, CycleOutcome::default());
    }

    #[tokio::test]
    async fn revert_marks_failed_and_retry_recovers() {
        let service = confirmed_service();

        let mut transport = MockContractTransport::new();
        transport
            .expect_simulate()
            .times(1)
            .returning(|_| Ok(Simulation::reverted("inscription already bridged")));
        transport.expect_submit().times(0);

        let outcome = worker(service.clone(), transport)
            .run_cycle()
            .await
            .expect("cycle");
        assert_eq!(outcome, CycleOutcome { attested: 0, failed: 1 });
        assert_eq!(
            service.get(COLLECTION_ID_7).expect("get").unwrap().status,
            ClaimStatus::Failed
        );

        // Retry puts it back in the queue; a healthy cycle then attests it.
        assert_eq!(service.retry_failed().expect("retry"), 1);
        let mut transport = MockContractTransport::new();
        transport
            .expect_simulate()
            .times(1)
            .returning(|_| Ok(Simulation::ok()));
        transport
            .expect_submit()
            .times(1)
            .returning(|_, _| {
                Ok(TxReceipt {
                    txid: "retry-txid".to_string(),
                    new_outputs: vec![],
                })
            });

        worker(service.clone(), transport)
            .run_cycle()
            .await
            .expect("cycle");
        let claim = service.get(COLLECTION_ID_7).expect("get").unwrap();
        assert_eq!(claim.status, ClaimStatus::Attested);
        assert_eq!(claim.attest_txid.as_deref(), Some("retry-txid"));
    }

    #[tokio::test]
    async fn broadcast_error_marks_failed() {
        let service = confirmed_service();

        let mut transport = MockContractTransport::new();
        transport
            .expect_simulate()
            .times(1)
            .returning(|_| Ok(Simulation::ok()));
        transport
            .expect_submit()
            .times(1)
            .with(always(), always())
            .returning(|_, _| Err(TransportError::Network("connection reset".into())));

        let outcome = worker(service.clone(), transport)
            .run_cycle()
            .await
            .expect("cycle");
        assert_eq!(outcome, CycleOutcome { attested: 0, failed: 1 });
        assert_eq!(
            service.get(COLLECTION_ID_7).expect("get").unwrap().status,
            ClaimStatus::Failed
        );
    }

    #[tokio::test]
    async fn non_taproot_sender_fails_without_transport_calls() {
        let service = Arc::new(service_with_min_fee(0));
        let mut bad = candidate(0);
        bad.sender_address = String::new();
        service.process_burn(&bad, 100, "h").expect("process");
        service.confirm(106).expect("confirm");

        let mut transport = MockContractTransport::new();
        transport.expect_simulate().times(0);
        transport.expect_submit().times(0);

        let outcome = worker(service.clone(), transport)
            .run_cycle()
            .await
            .expect("cycle");
        assert_eq!(outcome, CycleOutcome { attested: 0, failed: 1 });
        assert_eq!(
            service.get(COLLECTION_ID_7).expect("get").unwrap().status,
            ClaimStatus::Failed
        );
    }

    #[tokio::test]
    async fn chains_utxos_across_claims_in_one_cycle() {
        let service = Arc::new(service_with_min_fee(0));
        // Two confirmed claims, burned in height order.
        let first = candidate(0);
        let mut second = candidate(0);
        second.inscription_id = format!("{:064x}i0", 1);
        service.process_burn(&first, 100, "h").expect("process");
        service.process_burn(&second, 101, "h").expect("process");
        service.confirm(120).expect("confirm");

        let chained = UnspentOutput {
            txid: "first-txid".to_string(),
            vout: 1,
            value_sats: 90_000,
        };
        let chained_for_second = chained.clone();

        let mut transport = MockContractTransport::new();
        transport
            .expect_simulate()
            .times(2)
            .returning(|_| Ok(Simulation::ok()));
        // First claim funds from the wallet...
        transport
            .expect_submit()
            .times(1)
            .withf(|_, params| params.utxos.is_none())
            .returning({
                let chained = chained.clone();
                move |_, _| {
                    Ok(TxReceipt {
                        txid: "first-txid".to_string(),
                        new_outputs: vec![chained.clone()],
                    })
                }
            });
        // ...the second spends the first's unconfirmed change.
        transport
            .expect_submit()
            .times(1)
            .withf(move |_, params| {
                params.utxos.as_deref() == Some(std::slice::from_ref(&chained_for_second))
            })
            .returning(|_, _| {
                Ok(TxReceipt {
                    txid: "second-txid".to_string(),
                    new_outputs: vec![],
                })
            });

        let outcome = worker(service.clone(), transport)
            .run_cycle()
            .await
            .expect("cycle");
        assert_eq!(outcome, CycleOutcome { attested: 2, failed: 0 });
    }

    #[test]
    fn taproot_sender_extracts_witness_program() {
        // A taproot script with a known program renders to an address that
        // converts back to the same 32 bytes.
        let program = [0x5a; 32];
        let mut script_bytes = vec![0x51, 0x20];
        script_bytes.extend_from_slice(&program);
        let script = bitcoin::ScriptBuf::from_bytes(script_bytes);
        let rendered = ordbridge_ordtx::render_address(&script, NETWORK);

        let sender = taproot_sender(&rendered, NETWORK).expect("convert");
        assert_eq!(sender, B256::from_slice(&program));
    }

    #[test]
    fn rejects_non_taproot_senders() {
        let mut v0 = vec![0x00, 0x14];
        v0.extend_from_slice(&[0x11; 20]);
        let script = bitcoin::ScriptBuf::from_bytes(v0);
        let rendered = ordbridge_ordtx::render_address(&script, NETWORK);

        assert!(matches!(
            taproot_sender(&rendered, NETWORK),
            Err(SenderError::NotTaproot)
        ));
        assert!(matches!(
            taproot_sender("", NETWORK),
            Err(SenderError::Empty)
        ));
        assert!(matches!(
            taproot_sender("not-an-address", NETWORK),
            Err(SenderError::Parse(_))
        ));
    }
}
