//! One-way bridge from burned inscriptions to wrapped-token mints.
//!
//! The bridge watches for burns of a fixed collection, tracks each burn as a
//! claim through its confirmation lifecycle, and hands confirmed claims to
//! the attestation worker, which submits mint calls through a
//! [`contract::ContractTransport`].

pub mod collection;
pub mod contract;
pub mod service;
pub mod worker;

use ordbridge_db::DbError;
use thiserror::Error;

pub use collection::{CollectionItem, CollectionRegistry};
pub use service::{BridgeConfig, BridgeService, BridgeStats};
pub use worker::{AttestationWorker, CycleOutcome, MAX_BATCH_SIZE};

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("store: {0}")]
    Store(#[from] DbError),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
