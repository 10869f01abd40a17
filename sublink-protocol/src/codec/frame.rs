//! Length-framed blobs for the video link

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::{decode_byte, decode_length_prefixed, encode_length_prefixed, encode_poll, CodecError, Poll};

/// Maximum frame size (16 MB)
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Decodes frames and encodes polls
/// Used by the station side
#[derive(Debug, Default)]
pub struct FrameClientCodec;

impl FrameClientCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for FrameClientCodec {
    type Item = Bytes;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(decode_length_prefixed(src)?.map(BytesMut::freeze))
    }
}

impl Encoder<Poll> for FrameClientCodec {
    type Error = CodecError;

    fn encode(&mut self, _item: Poll, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_poll(dst);
        Ok(())
    }
}

/// Decodes request bytes and encodes frames
/// Used by the vehicle side
#[derive(Debug, Default)]
pub struct FrameServerCodec;

impl FrameServerCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for FrameServerCodec {
    type Item = u8;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(decode_byte(src))
    }
}

impl Encoder<Bytes> for FrameServerCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_length_prefixed(&item, dst)
    }
}
