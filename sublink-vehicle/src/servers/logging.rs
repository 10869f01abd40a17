use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::debug;

use sublink_protocol::{CodecError, LogBatchServerCodec, Tag, POLL_BYTE};

use super::LinkHandler;
use crate::forward::LogForwarder;

/// Answers each poll with every queued log record as one brace batch
pub struct LoggingServer {
    forwarder: LogForwarder,
    batch_max: usize,
}

impl LoggingServer {
    pub fn new(forwarder: LogForwarder, batch_max: usize) -> Self {
        Self {
            forwarder,
            batch_max: batch_max.max(1),
        }
    }
}

#[async_trait]
impl LinkHandler for LoggingServer {
    const TAG: Tag = Tag::Logging;

    async fn serve_peer(&mut self, stream: TcpStream) -> Result<(), CodecError> {
        let mut framed = Framed::new(stream, LogBatchServerCodec::new());

        while let Some(request) = framed.next().await {
            if request? != POLL_BYTE {
                continue;
            }

            let batch = self.forwarder.next_batch(self.batch_max).await;
            if batch.is_empty() {
                debug!("log forwarding stopped, closing session");
                return Ok(());
            }
            framed.send(batch).await?;
        }

        Ok(())
    }
}
