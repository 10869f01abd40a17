//! Command negotiation RPC
//!
//! Requests and replies are length-prefixed bincode, the same framing for
//! both directions. The configuration itself travels as a hex string.

use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use tokio_util::codec::{Decoder, Encoder};

use super::{decode_length_prefixed, encode_length_prefixed, CodecError};
use crate::types::CommandConfig;

/// Station to vehicle negotiation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub req: String,
}

impl CommandRequest {
    pub const PROBE: &'static str = "1";
    pub const KILL: &'static str = "2";

    pub fn probe() -> Self {
        Self {
            req: Self::PROBE.into(),
        }
    }

    pub fn kill() -> Self {
        Self {
            req: Self::KILL.into(),
        }
    }

    /// Request carrying an encoded configuration
    pub fn configure(config: &CommandConfig) -> Result<Self, CodecError> {
        Ok(Self {
            req: encode_config(config)?,
        })
    }
}

/// Vehicle to station negotiation reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReply {
    pub ack: String,
}

impl CommandReply {
    pub const READY: &'static str = "1";
    pub const ACCEPTED: &'static str = "2";
    pub const KILLED: &'static str = "3";
    pub const REJECTED: &'static str = "!";

    pub fn new(ack: &str) -> Self {
        Self { ack: ack.into() }
    }

    pub fn ready() -> Self {
        Self::new(Self::READY)
    }

    pub fn accepted() -> Self {
        Self::new(Self::ACCEPTED)
    }

    pub fn killed() -> Self {
        Self::new(Self::KILLED)
    }

    pub fn rejected() -> Self {
        Self::new(Self::REJECTED)
    }
}

/// Serialize a configuration with bincode and hex-encode it
pub fn encode_config(config: &CommandConfig) -> Result<String, CodecError> {
    let data = bincode::serialize(config)?;
    Ok(hex::encode(data))
}

/// Reverse of [`encode_config`]; the result is not validated
pub fn decode_config(text: &str) -> Result<CommandConfig, CodecError> {
    let data = hex::decode(text)?;
    Ok(bincode::deserialize(&data)?)
}

fn decode_message<T: serde::de::DeserializeOwned>(
    src: &mut BytesMut,
) -> Result<Option<T>, CodecError> {
    match decode_length_prefixed(src)? {
        Some(data) => Ok(Some(bincode::deserialize(&data)?)),
        None => Ok(None),
    }
}

fn encode_message<T: Serialize>(item: &T, dst: &mut BytesMut) -> Result<(), CodecError> {
    let data = bincode::serialize(item)?;
    encode_length_prefixed(&data, dst)
}

/// Codec for CommandRequest (encoding) and CommandReply (decoding)
/// Used by the station side
#[derive(Debug, Default)]
pub struct NegotiationClientCodec;

impl NegotiationClientCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for NegotiationClientCodec {
    type Item = CommandReply;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_message(src)
    }
}

impl Encoder<CommandRequest> for NegotiationClientCodec {
    type Error = CodecError;

    fn encode(&mut self, item: CommandRequest, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_message(&item, dst)
    }
}

/// Codec for CommandReply (encoding) and CommandRequest (decoding)
/// Used by the vehicle side
#[derive(Debug, Default)]
pub struct NegotiationServerCodec;

impl NegotiationServerCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for NegotiationServerCodec {
    type Item = CommandRequest;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_message(src)
    }
}

impl Encoder<CommandReply> for NegotiationServerCodec {
    type Error = CodecError;

    fn encode(&mut self, item: CommandReply, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_message(&item, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Mission;

    fn config() -> CommandConfig {
        CommandConfig {
            logging_level: 2,
            video_enabled: true,
            telemetry_enabled: false,
            pilot_enabled: true,
            mission: Mission::Gate,
        }
    }

    #[test]
    fn test_config_hex_roundtrip() {
        let text = encode_config(&config()).unwrap();
        assert!(text.len() > 1);
        assert!(text.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(decode_config(&text).unwrap(), config());
    }

    #[test]
    fn test_decode_config_bad_hex() {
        assert!(matches!(decode_config("zz"), Err(CodecError::Hex(_))));
        assert!(matches!(decode_config("abc"), Err(CodecError::Hex(_))));
    }

    #[test]
    fn test_decode_config_bad_bincode() {
        // Valid hex, but too short for a CommandConfig
        assert!(matches!(decode_config("01"), Err(CodecError::Bincode(_))));
    }

    #[test]
    fn test_request_reply_roundtrip() {
        let mut client = NegotiationClientCodec::new();
        let mut server = NegotiationServerCodec::new();

        let mut buf = BytesMut::new();
        client
            .encode(CommandRequest::configure(&config()).unwrap(), &mut buf)
            .unwrap();
        let request = server.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decode_config(&request.req).unwrap(), config());

        server.encode(CommandReply::accepted(), &mut buf).unwrap();
        assert_eq!(client.decode(&mut buf).unwrap().unwrap().ack, "2");
    }

    #[test]
    fn test_partial_request() {
        let mut client = NegotiationClientCodec::new();
        let mut server = NegotiationServerCodec::new();

        let mut buf = BytesMut::new();
        client.encode(CommandRequest::probe(), &mut buf).unwrap();

        let mut partial = buf.split_to(3);
        assert!(server.decode(&mut partial).unwrap().is_none());
        partial.unsplit(buf);
        assert_eq!(server.decode(&mut partial).unwrap().unwrap().req, "1");
    }

    #[tokio::test]
    async fn test_framed_exchange_over_duplex() {
        use futures::{SinkExt, StreamExt};
        use tokio_util::codec::Framed;

        let (a, b) = tokio::io::duplex(1024);
        let mut station = Framed::new(a, NegotiationClientCodec::new());
        let mut vehicle = Framed::new(b, NegotiationServerCodec::new());

        station.send(CommandRequest::probe()).await.unwrap();
        let request = vehicle.next().await.unwrap().unwrap();
        assert_eq!(request, CommandRequest::probe());

        vehicle.send(CommandReply::ready()).await.unwrap();
        let reply = station.next().await.unwrap().unwrap();
        assert_eq!(reply, CommandReply::ready());
    }

    #[test]
    fn test_reply_constants() {
        assert_eq!(CommandReply::ready().ack, "1");
        assert_eq!(CommandReply::killed().ack, "3");
        assert_eq!(CommandReply::rejected().ack, "!");
        assert_eq!(CommandRequest::kill().req, "2");
    }
}
