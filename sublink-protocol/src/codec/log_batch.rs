//! Brace-delimited log batches for the logging link
//!
//! A batch is the concatenation of `{record}` groups. A record opens at `{`
//! when no record is open and closes at the next `}`, so a `{` inside a
//! record is plain text.

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::{decode_byte, encode_poll, CodecError, Poll};

/// How the station decoder treats a record cut off at the end of a read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BatchMode {
    /// Discard the trailing partial record
    #[default]
    Truncate,
    /// Keep the trailing partial record and prepend it to the next read
    CarryOver,
}

/// One read's worth of log records
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogBatch {
    Records(Vec<String>),
    /// The read was not valid UTF-8
    Invalid(Bytes),
}

/// Split a batch into complete records and the byte offset of a trailing
/// open record, if one is left unterminated.
fn scan(text: &str) -> (Vec<String>, Option<usize>) {
    let mut records = Vec::new();
    let mut open: Option<usize> = None;

    for (i, c) in text.char_indices() {
        match (c, open) {
            ('{', None) => open = Some(i),
            ('}', Some(start)) => {
                records.push(text[start + 1..i].to_string());
                open = None;
            }
            _ => {}
        }
    }

    (records, open)
}

/// Decode every complete record in `text`; a trailing partial record is dropped
pub fn decode_batch(text: &str) -> Vec<String> {
    scan(text).0
}

/// Wrap each record in braces
pub fn encode_batch<S: AsRef<str>>(records: &[S]) -> String {
    let mut out = String::with_capacity(records.iter().map(|r| r.as_ref().len() + 2).sum());
    for record in records {
        out.push('{');
        out.push_str(record.as_ref());
        out.push('}');
    }
    out
}

/// Decodes batches and encodes polls
/// Used by the station side. Each read buffer is treated as one reply.
#[derive(Debug, Default)]
pub struct LogBatchClientCodec {
    mode: BatchMode,
    pending: BytesMut,
}

impl LogBatchClientCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: BatchMode) -> Self {
        Self {
            mode,
            pending: BytesMut::new(),
        }
    }

    pub fn mode(&self) -> BatchMode {
        self.mode
    }

    fn decode_carry_over(&mut self, data: BytesMut) -> LogBatch {
        self.pending.unsplit(data);
        let buffered = self.pending.split();

        let valid = match std::str::from_utf8(&buffered) {
            Ok(_) => buffered.len(),
            // A multi-byte character cut at the end of the read
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(_) => return LogBatch::Invalid(buffered.freeze()),
        };
        let text = match std::str::from_utf8(&buffered[..valid]) {
            Ok(text) => text,
            Err(_) => return LogBatch::Invalid(buffered.freeze()),
        };

        let (records, open) = scan(text);
        if let Some(start) = open {
            self.pending.put_slice(&buffered[start..]);
        } else {
            self.pending.put_slice(&buffered[valid..]);
        }
        LogBatch::Records(records)
    }
}

impl Decoder for LogBatchClientCodec {
    type Item = LogBatch;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let data = src.split();
        let batch = match self.mode {
            BatchMode::Truncate => match std::str::from_utf8(&data) {
                Ok(text) => LogBatch::Records(decode_batch(text)),
                Err(_) => LogBatch::Invalid(data.freeze()),
            },
            BatchMode::CarryOver => self.decode_carry_over(data),
        };
        Ok(Some(batch))
    }
}

impl Encoder<Poll> for LogBatchClientCodec {
    type Error = CodecError;

    fn encode(&mut self, _item: Poll, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_poll(dst);
        Ok(())
    }
}

/// Decodes request bytes and encodes batches
/// Used by the vehicle side
#[derive(Debug, Default)]
pub struct LogBatchServerCodec;

impl LogBatchServerCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for LogBatchServerCodec {
    type Item = u8;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(decode_byte(src))
    }
}

impl Encoder<Vec<String>> for LogBatchServerCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Vec<String>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let batch = encode_batch(&item);
        dst.reserve(batch.len());
        dst.put_slice(batch.as_bytes());
        Ok(())
    }
}
