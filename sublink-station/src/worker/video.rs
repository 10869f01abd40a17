use bytes::Bytes;

use sublink_protocol::{Body, FrameClientCodec, Poll, Tag};

use super::{Cycle, LinkDriver, LinkError};

/// Pulls one length-framed image per poll
#[derive(Debug, Default)]
pub struct VideoLink {
    frames: u64,
}

impl VideoLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames forwarded since startup
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl LinkDriver for VideoLink {
    const TAG: Tag = Tag::Video;

    type Reply = Bytes;
    type Request = Poll;
    type Codec = FrameClientCodec;

    fn codec(&self) -> Self::Codec {
        FrameClientCodec::new()
    }

    fn next_request(&mut self) -> Option<Poll> {
        Some(Poll)
    }

    fn on_reply(&mut self, frame: Bytes) -> Result<Cycle<Poll>, LinkError> {
        if frame.is_empty() {
            return Err(LinkError::MalformedRecord("empty frame".into()));
        }
        self.frames += 1;
        Ok(Cycle::single(Body::Frame(frame), Some(Poll)))
    }
}
