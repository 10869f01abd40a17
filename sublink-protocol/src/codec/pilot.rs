//! Ready byte and six signed thrust bytes for the pilot link
//!
//! The vehicle announces readiness with [`POLL_BYTE`]; the station answers
//! with exactly six `i8` values.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::{decode_byte, CodecError, POLL_BYTE};
use crate::types::{ThrusterVector, THRUSTER_COUNT};

/// What the vehicle sent on the pilot link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PilotSignal {
    Ready,
    Unexpected(u8),
}

impl From<u8> for PilotSignal {
    fn from(byte: u8) -> Self {
        if byte == POLL_BYTE {
            PilotSignal::Ready
        } else {
            PilotSignal::Unexpected(byte)
        }
    }
}

/// Decodes pilot signals and encodes thruster vectors
/// Used by the station side
#[derive(Debug, Default)]
pub struct PilotClientCodec;

impl PilotClientCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for PilotClientCodec {
    type Item = PilotSignal;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(decode_byte(src).map(PilotSignal::from))
    }
}

impl Encoder<ThrusterVector> for PilotClientCodec {
    type Error = CodecError;

    fn encode(&mut self, item: ThrusterVector, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(THRUSTER_COUNT);
        dst.put_slice(&item.to_bytes());
        Ok(())
    }
}

/// Decodes thruster vectors and encodes pilot signals
/// Used by the vehicle side
#[derive(Debug, Default)]
pub struct PilotServerCodec;

impl PilotServerCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for PilotServerCodec {
    type Item = ThrusterVector;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < THRUSTER_COUNT {
            return Ok(None);
        }

        let mut raw = [0u8; THRUSTER_COUNT];
        src.copy_to_slice(&mut raw);
        ThrusterVector::from_bytes(raw).map(Some)
    }
}

impl Encoder<PilotSignal> for PilotServerCodec {
    type Error = CodecError;

    fn encode(&mut self, item: PilotSignal, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let byte = match item {
            PilotSignal::Ready => POLL_BYTE,
            PilotSignal::Unexpected(b) => b,
        };
        dst.reserve(1);
        dst.put_u8(byte);
        Ok(())
    }
}
