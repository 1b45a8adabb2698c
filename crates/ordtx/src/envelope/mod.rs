//! Inscription envelopes embedded in tapscript witness data.
//!
//! An envelope is the `OP_FALSE OP_IF "ord" .. OP_ENDIF` framing that carries
//! tagged inscription fields and a body. [`parser`] decodes envelopes from raw
//! witness bytes, [`builder`] produces the canonical script form.

pub mod builder;
pub mod parser;

use bitcoin::Transaction;

/// Marker pushed immediately after `OP_FALSE OP_IF` to identify an envelope.
pub const PROTOCOL_ID: [u8; 3] = *b"ord";

/// Tag bytes for the envelope fields we recognize. Even tags other than these
/// exist in the wild; unknown tags are ignored rather than rejected.
pub const TAG_CONTENT_TYPE: u8 = 1;
pub const TAG_POINTER: u8 = 2;
pub const TAG_PARENT: u8 = 3;
pub const TAG_METADATA: u8 = 5;
pub const TAG_METAPROTOCOL: u8 = 7;
pub const TAG_CONTENT_ENCODING: u8 = 9;
pub const TAG_DELEGATE: u8 = 11;

/// A decoded inscription envelope.
///
/// `body` is `Some` iff the payload contained a body separator (an empty push
/// in tag position); a separator followed by zero chunks yields `Some(vec![])`.
/// String-typed fields are decoded lossily, matching how inscriptions are
/// rendered rather than validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    pub content_type: Option<String>,
    pub body: Option<Vec<u8>>,
    pub pointer: Option<Vec<u8>>,
    pub parent: Option<Vec<u8>>,
    pub metadata: Option<Vec<u8>>,
    pub metaprotocol: Option<String>,
    pub content_encoding: Option<String>,
    pub delegate: Option<Vec<u8>>,
}

impl Envelope {
    /// An envelope carries an inscription only if it has a content type or a
    /// body; everything else is noise.
    pub(crate) fn is_inscription(&self) -> bool {
        self.content_type.is_some() || self.body.is_some()
    }
}

/// Extracts at most one envelope per input, in input order.
///
/// The local index of each returned envelope (its position in the returned
/// vector) is the `i<n>` suffix of the inscription id minted for it.
pub fn extract_envelopes(tx: &Transaction) -> Vec<Envelope> {
    tx.input
        .iter()
        .filter_map(|input| parser::parse_witness(&input.witness))
        .collect()
}

#[cfg(test)]
mod tests {
    use bitcoin::{
        absolute::LockTime, hashes::Hash, transaction::Version, OutPoint, ScriptBuf, Sequence,
        Transaction, TxIn, Txid, Witness,
    };

    use super::*;

    fn input_with(witness: Witness) -> TxIn {
        TxIn {
            previous_output: OutPoint::new(Txid::all_zeros(), 0),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness,
        }
    }

    fn reveal_witness(body: &[u8]) -> Witness {
        let script = builder::build_envelope_script(&Envelope {
            content_type: Some("text/plain".into()),
            body: Some(body.to_vec()),
            ..Default::default()
        })
        .unwrap();
        Witness::from_slice(&[script.into_bytes(), vec![0xc0; 33]])
    }

    fn tx(inputs: Vec<TxIn>) -> Transaction {
        Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: inputs,
            output: Vec::new(),
        }
    }

    #[test]
    fn one_envelope_per_input_in_input_order() {
        let tx = tx(vec![
            input_with(reveal_witness(b"first")),
            input_with(Witness::new()),
            input_with(reveal_witness(b"second")),
        ]);

        let envelopes = extract_envelopes(&tx);
        assert_eq!(envelopes.len(), 2);
        assert_eq!(envelopes[0].body.as_deref(), Some(b"first".as_slice()));
        assert_eq!(envelopes[1].body.as_deref(), Some(b"second".as_slice()));
    }

    #[test]
    fn inputs_without_envelopes_yield_nothing() {
        let tx = tx(vec![
            input_with(Witness::new()),
            input_with(Witness::from_slice(&[vec![0u8; 64]])),
        ]);
        assert!(extract_envelopes(&tx).is_empty());
    }
}
