//! Ordinals transaction processing: envelope extraction from witness data,
//! output script classification, and burn transaction matching.

pub mod addr;
pub mod burn;
pub mod envelope;

pub use addr::render_address;
pub use burn::{match_burn, BurnCandidate};
pub use envelope::{extract_envelopes, parser::parse_witness, Envelope};
