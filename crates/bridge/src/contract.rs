//! Contract transport interface.
//!
//! The transport owns everything wallet- and wire-shaped: building, signing,
//! and broadcasting the mint call, plus the dry-run simulation. The bridge
//! only decides what to call and with which inputs.

use alloy_primitives::{keccak256, B256, U256};
use async_trait::async_trait;
use thiserror::Error;

/// Arguments of the `attestBurn(sender, inscriptionHash, tokenId)` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestBurnCall {
    /// 32-byte taproot witness program of the burn's sender.
    pub sender: B256,
    pub inscription_hash: U256,
    pub token_id: U256,
}

/// Spend parameters for one submitted call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxParams {
    pub max_sats_to_spend: u64,
    pub fee_rate: u64,
    pub priority_fee: u64,
    /// When set, the transport must fund the call from exactly these outputs
    /// instead of scanning the wallet.
    pub utxos: Option<Vec<UnspentOutput>>,
}

/// An output usable as an input of a later call, possibly unconfirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnspentOutput {
    pub txid: String,
    pub vout: u32,
    pub value_sats: u64,
}

/// Result of a dry run against the contract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Simulation {
    /// `Some` when the contract would revert, with its reason string.
    pub revert: Option<String>,
}

impl Simulation {
    pub fn ok() -> Self {
        Self { revert: None }
    }

    pub fn reverted(reason: impl Into<String>) -> Self {
        Self {
            revert: Some(reason.into()),
        }
    }
}

/// Receipt of a broadcast call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub txid: String,
    /// Fresh outputs of this call, spendable by the next one while still
    /// unconfirmed.
    pub new_outputs: Vec<UnspentOutput>,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("network: {0}")]
    Network(String),

    #[error("rpc: {0}")]
    Rpc(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContractTransport: Send + Sync {
    async fn simulate(&self, call: &AttestBurnCall) -> Result<Simulation, TransportError>;

    async fn submit(
        &self,
        call: &AttestBurnCall,
        params: &TxParams,
    ) -> Result<TxReceipt, TransportError>;
}

/// keccak256 of the inscription id string, read as a big-endian 256-bit
/// integer. This is the contract's stable key for a bridged inscription.
pub fn inscription_hash(inscription_id: &str) -> U256 {
    U256::from_be_bytes(keccak256(inscription_id.as_bytes()).0)
}
