//! Fixed 17 x f64 records for the telemetry link

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::{decode_byte, encode_poll, CodecError, Poll};
use crate::types::{TelemetryRecord, RECORD_SIZE};

/// Decodes telemetry records and encodes polls
/// Used by the station side
#[derive(Debug, Default)]
pub struct TelemetryClientCodec;

impl TelemetryClientCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for TelemetryClientCodec {
    type Item = TelemetryRecord;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < RECORD_SIZE {
            src.reserve(RECORD_SIZE - src.len());
            return Ok(None);
        }

        let record = TelemetryRecord::from_bytes(&src[..RECORD_SIZE])?;
        src.advance(RECORD_SIZE);
        Ok(Some(record))
    }
}

impl Encoder<Poll> for TelemetryClientCodec {
    type Error = CodecError;

    fn encode(&mut self, _item: Poll, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_poll(dst);
        Ok(())
    }
}

/// Decodes request bytes and encodes telemetry records
/// Used by the vehicle side
#[derive(Debug, Default)]
pub struct TelemetryServerCodec;

impl TelemetryServerCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for TelemetryServerCodec {
    type Item = u8;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(decode_byte(src))
    }
}

impl Encoder<TelemetryRecord> for TelemetryServerCodec {
    type Error = CodecError;

    fn encode(&mut self, item: TelemetryRecord, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(RECORD_SIZE);
        dst.put_slice(&item.to_bytes());
        Ok(())
    }
}
