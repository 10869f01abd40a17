//! Vehicle-side link servers
//!
//! Each link listens on its own port and serves one station at a time. A
//! second peer waits in the listen backlog until the first disconnects.

mod logging;
mod pilot;
mod telemetry;
mod video;

pub use logging::LoggingServer;
pub use pilot::PilotServer;
pub use telemetry::TelemetryServer;
pub use video::VideoServer;

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::broadcast;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use sublink_protocol::{CodecError, Tag};

/// Pending connections kept while a peer is being served
const LISTEN_BACKLOG: u32 = 5;

/// Pause after a failed accept before trying again
pub(crate) const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// One link's per-peer protocol
#[async_trait]
pub trait LinkHandler: Send + 'static {
    const TAG: Tag;

    /// Serve one connected station until it hangs up
    async fn serve_peer(&mut self, stream: TcpStream) -> Result<(), CodecError>;
}

/// Ticker enforcing a minimum gap between replies
pub(crate) fn pacer(period: Duration) -> Interval {
    let mut interval = tokio::time::interval(period.max(Duration::from_millis(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Wait out [`ACCEPT_BACKOFF`]; false when `shutdown` fired meanwhile
pub(crate) async fn accept_backoff(shutdown: &mut broadcast::Receiver<()>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(ACCEPT_BACKOFF) => true,
        _ = shutdown.recv() => false,
    }
}

/// Bind a listener the way every server expects
///
/// `SO_REUSEADDR` lets a stopped server rebind while old sockets linger.
pub async fn bind_listener(host: &str, port: u16) -> std::io::Result<TcpListener> {
    let addr = tokio::net::lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                format!("{} did not resolve", host),
            )
        })?;

    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4()?,
        SocketAddr::V6(_) => TcpSocket::new_v6()?,
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(LISTEN_BACKLOG)
}

/// Accept and serve peers one at a time until `shutdown` fires
pub async fn serve_link<H: LinkHandler>(
    listener: TcpListener,
    mut handler: H,
    mut shutdown: broadcast::Receiver<()>,
) {
    match listener.local_addr() {
        Ok(addr) => info!(link = %H::TAG, %addr, "link server listening"),
        Err(e) => warn!(link = %H::TAG, error = %e, "link server listening on unknown address"),
    }

    loop {
        let (stream, peer) = tokio::select! {
            result = listener.accept() => match result {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!(link = %H::TAG, error = %e, "accept error");
                    if accept_backoff(&mut shutdown).await {
                        continue;
                    }
                    break;
                }
            },
            _ = shutdown.recv() => break,
        };

        info!(link = %H::TAG, %peer, "station connected");
        if let Err(e) = stream.set_nodelay(true) {
            debug!(link = %H::TAG, error = %e, "failed to set TCP_NODELAY");
        }

        tokio::select! {
            result = handler.serve_peer(stream) => match result {
                Ok(()) => info!(link = %H::TAG, %peer, "station disconnected"),
                Err(e) => warn!(link = %H::TAG, %peer, error = %e, "session ended with error"),
            },
            _ = shutdown.recv() => break,
        }
    }

    info!(link = %H::TAG, "link server stopped");
}
