use tracing::debug;

use sublink_protocol::{BatchMode, Body, LogBatch, LogBatchClientCodec, Poll, Tag};

use super::{Cycle, LinkDriver, LinkError};

/// Pulls brace-delimited batches of vehicle log records
#[derive(Debug)]
pub struct LoggingLink {
    mode: BatchMode,
    /// Forwarding level; 0 mutes the link
    level: u8,
}

impl LoggingLink {
    pub fn new() -> Self {
        Self::with_mode(BatchMode::default())
    }

    pub fn with_mode(mode: BatchMode) -> Self {
        Self { mode, level: 1 }
    }

    pub fn level(&self) -> u8 {
        self.level
    }
}

impl Default for LoggingLink {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkDriver for LoggingLink {
    const TAG: Tag = Tag::Logging;

    type Reply = LogBatch;
    type Request = Poll;
    type Codec = LogBatchClientCodec;

    fn codec(&self) -> Self::Codec {
        LogBatchClientCodec::with_mode(self.mode)
    }

    fn next_request(&mut self) -> Option<Poll> {
        Some(Poll)
    }

    fn on_reply(&mut self, batch: LogBatch) -> Result<Cycle<Poll>, LinkError> {
        let records = match batch {
            LogBatch::Records(records) => records,
            LogBatch::Invalid(raw) => {
                return Err(LinkError::MalformedRecord(format!(
                    "{} byte batch is not UTF-8",
                    raw.len()
                )))
            }
        };

        if self.level == 0 {
            return Ok(Cycle::new(Vec::new(), Some(Poll)));
        }
        Ok(Cycle::new(
            records.into_iter().map(Body::Log).collect(),
            Some(Poll),
        ))
    }

    fn on_message(&mut self, body: &Body) -> bool {
        match body {
            Body::Modify(level) => {
                debug!(link = %Self::TAG, level, "logging level changed");
                self.level = *level;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_batch_becomes_one_message_per_record() {
        let mut link = LoggingLink::new();
        let cycle = link
            .on_reply(LogBatch::Records(vec!["a".into(), "b".into()]))
            .unwrap();
        assert_eq!(
            cycle.records,
            vec![Body::Log("a".into()), Body::Log("b".into())]
        );
        assert_eq!(cycle.request, Some(Poll));
    }

    #[test]
    fn test_level_zero_mutes_forwarding() {
        let mut link = LoggingLink::new();
        assert!(link.on_message(&Body::Modify(0)));
        assert_eq!(link.level(), 0);

        let cycle = link
            .on_reply(LogBatch::Records(vec!["a".into()]))
            .unwrap();
        assert!(cycle.records.is_empty());
        // Still polling so the vehicle queue keeps draining
        assert_eq!(cycle.request, Some(Poll));
    }

    #[test]
    fn test_any_nonzero_level_unmutes() {
        for level in [1, 2] {
            let mut link = LoggingLink::new();
            link.on_message(&Body::Modify(0));
            link.on_message(&Body::Modify(level));

            let cycle = link
                .on_reply(LogBatch::Records(vec!["INFO x: y".into()]))
                .unwrap();
            assert_eq!(cycle.records, vec![Body::Log("INFO x: y".into())]);
        }
    }

    #[test]
    fn test_invalid_batch_is_malformed() {
        let mut link = LoggingLink::new();
        assert!(matches!(
            link.on_reply(LogBatch::Invalid(Bytes::from_static(&[0xff]))),
            Err(LinkError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_control_is_not_for_logging() {
        let mut link = LoggingLink::new();
        assert!(!link.on_message(&Body::Control(Default::default())));
    }

    #[test]
    fn test_codec_uses_mode() {
        let link = LoggingLink::with_mode(BatchMode::CarryOver);
        assert_eq!(link.codec().mode(), BatchMode::CarryOver);
    }
}
