//! sublink-protocol: Wire codecs and the in-process message contract
//!
//! This crate defines the byte formats spoken on each station/vehicle link
//! and the messages the station's workers and router exchange.

pub mod codec;
pub mod messages;
pub mod types;

// Re-export main types at crate root
pub use codec::{
    decode_batch, decode_config, encode_batch, encode_config, BatchMode, CodecError,
    CommandReply, CommandRequest, FrameClientCodec, FrameServerCodec, LogBatch,
    LogBatchClientCodec, LogBatchServerCodec, NegotiationClientCodec, NegotiationServerCodec,
    PilotClientCodec, PilotServerCodec, PilotSignal, Poll, TelemetryClientCodec,
    TelemetryServerCodec, MAX_FRAME_SIZE, POLL_BYTE,
};
pub use messages::{Body, Endpoint, Message, ParseTagError, Tag};
pub use types::{CommandConfig, Mission, TelemetryRecord, Thruster, ThrusterVector};
