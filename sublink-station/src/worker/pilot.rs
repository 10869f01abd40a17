use tracing::{debug, trace};

use sublink_protocol::{Body, PilotClientCodec, PilotSignal, Tag, ThrusterVector};

use super::{Cycle, LinkDriver, LinkError};

/// Answers each vehicle ready byte with the latest thruster vector
///
/// When no fresher vector arrived since the last send, the previous one is
/// sent again.
#[derive(Debug, Default)]
pub struct PilotLink {
    last: ThrusterVector,
    fresh: bool,
    resent: u64,
}

impl PilotLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> ThrusterVector {
        self.last
    }

    /// Ready bytes answered with a vector that was already sent
    pub fn resent(&self) -> u64 {
        self.resent
    }
}

impl LinkDriver for PilotLink {
    const TAG: Tag = Tag::Pilot;

    type Reply = PilotSignal;
    type Request = ThrusterVector;
    type Codec = PilotClientCodec;

    fn codec(&self) -> Self::Codec {
        PilotClientCodec::new()
    }

    /// The vehicle speaks first
    fn next_request(&mut self) -> Option<ThrusterVector> {
        None
    }

    fn on_reply(&mut self, signal: PilotSignal) -> Result<Cycle<ThrusterVector>, LinkError> {
        match signal {
            PilotSignal::Ready => {
                if self.fresh {
                    self.fresh = false;
                } else {
                    self.resent += 1;
                    trace!(link = %Self::TAG, "resending last vector");
                }
                Ok(Cycle::new(Vec::new(), Some(self.last)))
            }
            PilotSignal::Unexpected(byte) => Err(LinkError::TransportClosed(format!(
                "unexpected pilot byte 0x{:02x}",
                byte
            ))),
        }
    }

    fn on_message(&mut self, body: &Body) -> bool {
        match body {
            Body::Control(vector) => {
                debug!(link = %Self::TAG, values = ?vector.values(), "new thruster vector");
                self.last = *vector;
                self.fresh = true;
                true
            }
            _ => false,
        }
    }
}
