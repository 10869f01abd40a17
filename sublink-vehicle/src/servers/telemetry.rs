use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::Framed;
use tracing::debug;

use sublink_protocol::{CodecError, Tag, TelemetryServerCodec, POLL_BYTE};

use super::{pacer, LinkHandler};
use crate::sources::TelemetrySource;

/// Answers each poll with one 17-value record
pub struct TelemetryServer<S: TelemetrySource + ?Sized> {
    source: Arc<Mutex<S>>,
    sample_interval: Duration,
}

impl<S: TelemetrySource + ?Sized> TelemetryServer<S> {
    pub fn new(source: Arc<Mutex<S>>, sample_interval: Duration) -> Self {
        Self {
            source,
            sample_interval,
        }
    }
}

#[async_trait]
impl<S: TelemetrySource + ?Sized + 'static> LinkHandler for TelemetryServer<S> {
    const TAG: Tag = Tag::Telemetry;

    async fn serve_peer(&mut self, stream: TcpStream) -> Result<(), CodecError> {
        let mut framed = Framed::new(stream, TelemetryServerCodec::new());
        let mut pacing = pacer(self.sample_interval);

        while let Some(request) = framed.next().await {
            let byte = request?;
            if byte != POLL_BYTE {
                debug!(byte, "ignoring non-poll byte");
                continue;
            }

            pacing.tick().await;
            let record = self.source.lock().await.sample().await;
            framed.send(record).await?;
        }

        Ok(())
    }
}
