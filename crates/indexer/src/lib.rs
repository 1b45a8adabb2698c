//! Block ingestion: fetch, reorg detection, inscription extraction, burn
//! detection, height advancement.

pub mod client;
pub mod pipeline;

pub use client::{BitcoinCoreClient, BlockSource, ClientError};
pub use pipeline::{Indexer, IndexerConfig, StepError, StepOutcome};
