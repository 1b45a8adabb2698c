//! Row types shared by the stores and their callers.

use std::fmt;

/// A persisted inscription. Immutable once written; rows only disappear when
/// a reorg rolls their block back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inscription {
    /// `"{txid}i{index}"`.
    pub id: String,
    pub content_type: String,
    pub content: Vec<u8>,
    pub block_height: u64,
    pub block_hash: String,
    pub txid: String,
    pub vout: u32,
    /// Rendered address of the reveal transaction's first output; empty when
    /// unrecoverable. Informational, not validated.
    pub owner: String,
    /// Block time, seconds since epoch. Informational.
    pub timestamp: u64,
    /// Dense sequence starting at 0, assigned at insertion.
    pub inscription_number: u64,
}

/// Lifecycle states of a burn claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClaimStatus {
    /// Burn seen, waiting for confirmations.
    Detected,
    /// Oracle fee below the configured minimum; stuck and user-visible.
    Underpaid,
    /// Enough confirmations; queued for attestation.
    Confirmed,
    /// Mint call broadcast; terminal.
    Attested,
    /// Attestation attempt failed; recoverable via retry.
    Failed,
}

impl ClaimStatus {
    pub const ALL: [ClaimStatus; 5] = [
        ClaimStatus::Detected,
        ClaimStatus::Underpaid,
        ClaimStatus::Confirmed,
        ClaimStatus::Attested,
        ClaimStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Detected => "detected",
            ClaimStatus::Underpaid => "underpaid",
            ClaimStatus::Confirmed => "confirmed",
            ClaimStatus::Attested => "attested",
            ClaimStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A burn claim as it moves through the bridge state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurnClaim {
    pub inscription_id: String,
    pub collection_name: String,
    pub token_id: u64,
    pub sender_address: String,
    pub burn_txid: String,
    pub burn_block_height: u64,
    pub burn_block_hash: String,
    pub status: ClaimStatus,
    /// Set exactly when the claim enters `Attested`.
    pub attest_txid: Option<String>,
    pub created_at: u64,
    pub updated_at: u64,
}
