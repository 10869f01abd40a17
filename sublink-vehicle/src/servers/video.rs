use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::Framed;
use tracing::{debug, warn};

use sublink_protocol::{CodecError, FrameServerCodec, Tag, POLL_BYTE};

use super::{pacer, LinkHandler};
use crate::sources::FrameSource;

/// Answers each poll with one length-framed payload
pub struct VideoServer<S: FrameSource + ?Sized> {
    source: Arc<Mutex<S>>,
    frame_interval: Duration,
}

impl<S: FrameSource + ?Sized> VideoServer<S> {
    pub fn new(source: Arc<Mutex<S>>, frame_interval: Duration) -> Self {
        Self {
            source,
            frame_interval,
        }
    }
}

#[async_trait]
impl<S: FrameSource + ?Sized + 'static> LinkHandler for VideoServer<S> {
    const TAG: Tag = Tag::Video;

    async fn serve_peer(&mut self, stream: TcpStream) -> Result<(), CodecError> {
        let mut framed = Framed::new(stream, FrameServerCodec::new());
        let mut pacing = pacer(self.frame_interval);

        while let Some(request) = framed.next().await {
            let byte = request?;
            if byte != POLL_BYTE {
                debug!(byte, "ignoring non-poll byte");
                continue;
            }

            pacing.tick().await;
            let frame = self.source.lock().await.next_frame().await;
            let Some(frame) = frame else {
                warn!("frame source exhausted, closing session");
                return Ok(());
            };
            framed.send(frame).await?;
        }

        Ok(())
    }
}
