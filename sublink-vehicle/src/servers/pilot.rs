use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::Framed;
use tracing::debug;

use sublink_protocol::{CodecError, PilotServerCodec, PilotSignal, Tag};

use super::{pacer, LinkHandler};
use crate::sources::ThrusterSink;

/// Signals ready, then hands each received thruster vector to the sink
pub struct PilotServer<S: ThrusterSink + ?Sized> {
    sink: Arc<Mutex<S>>,
    ready_interval: Duration,
}

impl<S: ThrusterSink + ?Sized> PilotServer<S> {
    pub fn new(sink: Arc<Mutex<S>>, ready_interval: Duration) -> Self {
        Self {
            sink,
            ready_interval,
        }
    }
}

#[async_trait]
impl<S: ThrusterSink + ?Sized + 'static> LinkHandler for PilotServer<S> {
    const TAG: Tag = Tag::Pilot;

    async fn serve_peer(&mut self, stream: TcpStream) -> Result<(), CodecError> {
        let mut framed = Framed::new(stream, PilotServerCodec::new());
        let mut pacing = pacer(self.ready_interval);

        loop {
            pacing.tick().await;
            if let Err(e) = framed.send(PilotSignal::Ready).await {
                debug!(error = %e, "station gone before ready signal");
                return Ok(());
            }

            match framed.next().await {
                Some(Ok(thrust)) => self.sink.lock().await.apply(thrust),
                Some(Err(e)) => return Err(e),
                None => return Ok(()),
            }
        }
    }
}
