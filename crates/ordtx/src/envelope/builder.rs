//! Canonical envelope script construction.
//!
//! Emits the `OP_FALSE OP_IF "ord" <fields> OP_0 <body chunks> OP_ENDIF`
//! form with plain PUSHBYTES/PUSHDATA opcodes. Used by tests and by tooling
//! that wants to inscribe; the parser accepts a superset of what this emits.

use bitcoin::{
    opcodes::{
        all::{OP_ENDIF, OP_IF},
        OP_FALSE,
    },
    script::{Builder, PushBytesBuf},
    ScriptBuf,
};
use thiserror::Error;

use super::{
    Envelope, PROTOCOL_ID, TAG_CONTENT_ENCODING, TAG_CONTENT_TYPE, TAG_DELEGATE, TAG_METADATA,
    TAG_METAPROTOCOL, TAG_PARENT, TAG_POINTER,
};

/// Body and metadata chunk size. Consensus caps a single push at 520 bytes.
const MAX_PUSH: usize = 520;

#[derive(Debug, Error)]
pub enum EnvelopeBuildError {
    #[error("field too large for a push: {0} bytes")]
    OversizedPush(usize),
}

/// Builds the canonical script for an envelope.
pub fn build_envelope_script(envelope: &Envelope) -> Result<ScriptBuf, EnvelopeBuildError> {
    let mut builder = Builder::new()
        .push_opcode(OP_FALSE)
        .push_opcode(OP_IF)
        .push_slice(PROTOCOL_ID);

    if let Some(content_type) = &envelope.content_type {
        builder = push_field(builder, TAG_CONTENT_TYPE, content_type.as_bytes())?;
    }
    if let Some(pointer) = &envelope.pointer {
        builder = push_field(builder, TAG_POINTER, pointer)?;
    }
    if let Some(parent) = &envelope.parent {
        builder = push_field(builder, TAG_PARENT, parent)?;
    }
    if let Some(metaprotocol) = &envelope.metaprotocol {
        builder = push_field(builder, TAG_METAPROTOCOL, metaprotocol.as_bytes())?;
    }
    if let Some(content_encoding) = &envelope.content_encoding {
        builder = push_field(builder, TAG_CONTENT_ENCODING, content_encoding.as_bytes())?;
    }
    if let Some(delegate) = &envelope.delegate {
        builder = push_field(builder, TAG_DELEGATE, delegate)?;
    }
    // Metadata is the one chunked field: repeat the tag per chunk.
    if let Some(metadata) = &envelope.metadata {
        for chunk in metadata.chunks(MAX_PUSH) {
            builder = push_field(builder, TAG_METADATA, chunk)?;
        }
    }

    if let Some(body) = &envelope.body {
        builder = builder.push_slice([]);
        for chunk in body.chunks(MAX_PUSH) {
            builder = builder.push_slice(push_bytes(chunk)?);
        }
    }

    Ok(builder.push_opcode(OP_ENDIF).into_script())
}

fn push_field(builder: Builder, tag: u8, value: &[u8]) -> Result<Builder, EnvelopeBuildError> {
    Ok(builder.push_slice([tag]).push_slice(push_bytes(value)?))
}

fn push_bytes(data: &[u8]) -> Result<PushBytesBuf, EnvelopeBuildError> {
    PushBytesBuf::try_from(data.to_vec()).map_err(|_| EnvelopeBuildError::OversizedPush(data.len()))
}
