//! Burn transaction matching.
//!
//! A burn spends an inscription-bearing output to the bridge's burn address.
//! The shape is positional: output 0 pays the burn address, input 0 points at
//! the inscribed output, and output 1 (when present) names the sender and may
//! carry the oracle fee.

use bitcoin::{Network, Transaction};

use crate::addr::render_address;

/// A transaction that matched the burn shape. Whether it maps to a bridged
/// collection item is decided by the bridge service, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurnCandidate {
    /// `"{prev_txid}i{prev_vout}"` of the spent inscribed output.
    pub inscription_id: String,
    pub burn_txid: String,
    pub sender_address: String,
    /// Sats paid to the oracle fee address, 0 when absent or not configured.
    pub fee_paid: u64,
}

/// Matches a transaction against the burn shape. Returns `None` for anything
/// that does not pay `burn_address` on its first output.
pub fn match_burn(
    tx: &Transaction,
    burn_address: &str,
    oracle_fee_address: Option<&str>,
    network: Network,
) -> Option<BurnCandidate> {
    if burn_address.is_empty() {
        return None;
    }
    let first_output = tx.output.first()?;
    if render_address(&first_output.script_pubkey, network) != burn_address {
        return None;
    }

    let first_input = tx.input.first()?;
    let inscription_id = format!(
        "{}i{}",
        first_input.previous_output.txid, first_input.previous_output.vout
    );

    let second_output = tx.output.get(1);
    let sender_address = second_output
        .map(|out| render_address(&out.script_pubkey, network))
        .unwrap_or_default();

    let fee_paid = match (oracle_fee_address, second_output) {
        (Some(oracle), Some(out)) if render_address(&out.script_pubkey, network) == oracle => {
            out.value.to_sat()
        }
        _ => 0,
    };

    Some(BurnCandidate {
        inscription_id,
        burn_txid: tx.compute_txid().to_string(),
        sender_address,
        fee_paid,
    })
}
