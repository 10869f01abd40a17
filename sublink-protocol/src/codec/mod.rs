//! Wire codecs for every station/vehicle link
//!
//! Each link has a client codec (used by the station worker) and a server
//! codec (used by the vehicle endpoint).

mod frame;
mod log_batch;
mod negotiation;
mod pilot;
mod telemetry;

use bytes::{Buf, BufMut, BytesMut};

pub use frame::{FrameClientCodec, FrameServerCodec, MAX_FRAME_SIZE};
pub use log_batch::{
    decode_batch, encode_batch, BatchMode, LogBatch, LogBatchClientCodec, LogBatchServerCodec,
};
pub use negotiation::{
    decode_config, encode_config, CommandReply, CommandRequest, NegotiationClientCodec,
    NegotiationServerCodec,
};
pub use pilot::{PilotClientCodec, PilotServerCodec, PilotSignal};
pub use telemetry::{TelemetryClientCodec, TelemetryServerCodec};

/// Single byte a client sends to request the next record
pub const POLL_BYTE: u8 = b'1';

/// A poll request; encodes as [`POLL_BYTE`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Poll;

/// Protocol codec error
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("Hex decoding error: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("Frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("Record too short: expected {expected} bytes, got {actual}")]
    RecordTooShort { expected: usize, actual: usize },

    #[error("Thrust out of range on channel {channel}: {value}")]
    ThrustOutOfRange { channel: usize, value: i8 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

fn encode_poll(dst: &mut BytesMut) {
    dst.reserve(1);
    dst.put_u8(POLL_BYTE);
}

/// Take one request byte, if any arrived
fn decode_byte(src: &mut BytesMut) -> Option<u8> {
    if src.is_empty() {
        None
    } else {
        Some(src.get_u8())
    }
}

/// Peek a 4-byte big-endian length prefix and take the payload once complete
fn decode_length_prefixed(src: &mut BytesMut) -> Result<Option<BytesMut>, CodecError> {
    // Need at least 4 bytes for length prefix
    if src.len() < 4 {
        return Ok(None);
    }

    let len = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;

    if len > MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge {
            size: len,
            max: MAX_FRAME_SIZE,
        });
    }

    if src.len() < 4 + len {
        src.reserve(4 + len - src.len());
        return Ok(None);
    }

    src.advance(4);
    Ok(Some(src.split_to(len)))
}

fn encode_length_prefixed(data: &[u8], dst: &mut BytesMut) -> Result<(), CodecError> {
    if data.len() > MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge {
            size: data.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    dst.reserve(4 + data.len());
    dst.put_u32(data.len() as u32);
    dst.put_slice(data);
    Ok(())
}
