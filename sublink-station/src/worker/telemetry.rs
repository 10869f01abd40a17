use sublink_protocol::{Body, Poll, Tag, TelemetryClientCodec, TelemetryRecord};

use super::{Cycle, LinkDriver, LinkError};

/// Pulls one 17-value sensor record per poll
#[derive(Debug, Default)]
pub struct TelemetryLink {
    last: Option<TelemetryRecord>,
}

impl TelemetryLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&TelemetryRecord> {
        self.last.as_ref()
    }
}

impl LinkDriver for TelemetryLink {
    const TAG: Tag = Tag::Telemetry;

    type Reply = TelemetryRecord;
    type Request = Poll;
    type Codec = TelemetryClientCodec;

    fn codec(&self) -> Self::Codec {
        TelemetryClientCodec::new()
    }

    fn next_request(&mut self) -> Option<Poll> {
        Some(Poll)
    }

    fn on_reply(&mut self, record: TelemetryRecord) -> Result<Cycle<Poll>, LinkError> {
        self.last = Some(record);
        Ok(Cycle::single(Body::Telemetry(record), Some(Poll)))
    }
}
