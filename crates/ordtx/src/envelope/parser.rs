//! Byte-level envelope decoder.
//!
//! Witness items are scanned as raw bytes rather than through a script
//! instruction iterator: envelopes must be located anywhere in the item, and a
//! truncated push near the end of the script must not discard the payloads
//! already collected. Every malformed shape decodes to "no envelope" — this
//! module has no error type.

use bitcoin::Witness;

use super::{
    Envelope, PROTOCOL_ID, TAG_CONTENT_ENCODING, TAG_CONTENT_TYPE, TAG_DELEGATE, TAG_METADATA,
    TAG_METAPROTOCOL, TAG_PARENT, TAG_POINTER,
};

const OP_FALSE: u8 = 0x00;
const OP_IF: u8 = 0x63;
const OP_ENDIF: u8 = 0x68;
const OP_PUSHDATA1: u8 = 0x4c;
const OP_PUSHDATA2: u8 = 0x4d;
const OP_PUSHDATA4: u8 = 0x4e;
const OP_PUSHNUM_NEG1: u8 = 0x4f;
const OP_PUSHNUM_1: u8 = 0x51;
const OP_PUSHNUM_16: u8 = 0x60;

/// Scans every witness item in stack order and returns the first valid
/// envelope found.
pub fn parse_witness(witness: &Witness) -> Option<Envelope> {
    witness.iter().find_map(parse_script_bytes)
}

/// Scans one script for an `OP_FALSE OP_IF "ord"` framing and decodes the
/// envelope behind it. On a framing mismatch the scan resumes at the next
/// byte, so envelopes are found regardless of what precedes them.
pub fn parse_script_bytes(script: &[u8]) -> Option<Envelope> {
    let mut pos = 0;
    while pos + 1 < script.len() {
        if script[pos] == OP_FALSE && script[pos + 1] == OP_IF {
            if let Some(envelope) = parse_after_marker(script, pos + 2) {
                return Some(envelope);
            }
        }
        pos += 1;
    }
    None
}

/// Decodes the envelope starting right after `OP_FALSE OP_IF`. Returns `None`
/// if the protocol marker doesn't match or the collected payloads don't form
/// an inscription.
fn parse_after_marker(script: &[u8], start: usize) -> Option<Envelope> {
    let (marker, mut pos) = read_push(script, start)?;
    if marker != PROTOCOL_ID {
        return None;
    }

    // Collect push payloads until OP_ENDIF, a non-push opcode, or the end of
    // the script. A truncated push terminates collection without invalidating
    // what came before it.
    let mut payloads = Vec::new();
    while pos < script.len() && script[pos] != OP_ENDIF {
        match read_push(script, pos) {
            Some((payload, next)) => {
                payloads.push(payload);
                pos = next;
            }
            None => break,
        }
    }

    assemble(payloads)
}

/// Decodes a single push at `pos`, returning the pushed bytes and the offset
/// of the byte after the push. `None` means "not a push": an unrecognized
/// opcode, or a claimed length that runs past the end of the script.
fn read_push(script: &[u8], pos: usize) -> Option<(Vec<u8>, usize)> {
    let opcode = *script.get(pos)?;
    let (len, data_start) = match opcode {
        OP_FALSE => (0, pos + 1),
        // Direct pushes: the opcode is the length.
        0x01..=0x4b => (opcode as usize, pos + 1),
        OP_PUSHDATA1 => {
            let len = *script.get(pos + 1)? as usize;
            (len, pos + 2)
        }
        OP_PUSHDATA2 => {
            let bytes: [u8; 2] = script.get(pos + 1..pos + 3)?.try_into().ok()?;
            (u16::from_le_bytes(bytes) as usize, pos + 3)
        }
        OP_PUSHDATA4 => {
            let bytes: [u8; 4] = script.get(pos + 1..pos + 5)?.try_into().ok()?;
            (u32::from_le_bytes(bytes) as usize, pos + 5)
        }
        // Pushnum opcodes push their small-number encoding.
        OP_PUSHNUM_NEG1 => return Some((vec![0x81], pos + 1)),
        OP_PUSHNUM_1..=OP_PUSHNUM_16 => return Some((vec![opcode - 0x50], pos + 1)),
        _ => return None,
    };
    let data = script.get(data_start..data_start + len)?;
    Some((data.to_vec(), data_start + len))
}

/// Splits the payload list into tag/value fields and a body, applying the
/// tie-break rules: fields sit in pairs at even indices until the first empty
/// even-index payload (the body separator); everything after the separator is
/// body, concatenated in order.
fn assemble(payloads: Vec<Vec<u8>>) -> Option<Envelope> {
    let separator = payloads
        .iter()
        .enumerate()
        .position(|(i, payload)| i % 2 == 0 && payload.is_empty());
    let field_end = separator.unwrap_or(payloads.len());

    let mut envelope = Envelope::default();

    let mut i = 0;
    while i + 1 < field_end {
        apply_field(&mut envelope, &payloads[i], &payloads[i + 1]);
        i += 2;
    }
    // A trailing tag with no value ends field parsing; it neither aborts nor
    // consumes the separator search above.

    envelope.body = separator.map(|sep| payloads[sep + 1..].concat());

    envelope.is_inscription().then_some(envelope)
}

fn apply_field(envelope: &mut Envelope, tag: &[u8], value: &[u8]) {
    // Tags are single bytes; a multi-byte payload in tag position skips the
    // pair without ending field parsing.
    let [tag] = tag else { return };

    match *tag {
        TAG_CONTENT_TYPE => set_first_string(&mut envelope.content_type, value),
        TAG_POINTER => set_first(&mut envelope.pointer, value),
        TAG_PARENT => set_first(&mut envelope.parent, value),
        // Metadata is chunked: every occurrence appends.
        TAG_METADATA => envelope
            .metadata
            .get_or_insert_with(Vec::new)
            .extend_from_slice(value),
        TAG_METAPROTOCOL => set_first_string(&mut envelope.metaprotocol, value),
        TAG_CONTENT_ENCODING => set_first_string(&mut envelope.content_encoding, value),
        TAG_DELEGATE => set_first(&mut envelope.delegate, value),
        _ => {}
    }
}

fn set_first(slot: &mut Option<Vec<u8>>, value: &[u8]) {
    if slot.is_none() {
        *slot = Some(value.to_vec());
    }
}

fn set_first_string(slot: &mut Option<String>, value: &[u8]) {
    if slot.is_none() {
        *slot = Some(String::from_utf8_lossy(value).into_owned());
    }
}
