//! Per-link connection workers
//!
//! Every link is served by a [`ChannelWorker`] driving a [`LinkDriver`]. The
//! worker owns the connection state machine; the driver only knows its wire
//! codec and how to react to one decoded reply.

mod dialer;
mod engine;
mod logging;
mod pilot;
mod telemetry;
mod video;

use std::time::Duration;

use tokio_util::codec::{Decoder, Encoder};

use sublink_protocol::{Body, CodecError, Tag};

pub use dialer::{Dialer, TcpDialer};
pub use engine::ChannelWorker;
pub use logging::LoggingLink;
pub use pilot::PilotLink;
pub use telemetry::TelemetryLink;
pub use video::VideoLink;

/// Connection state of a link worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Waiting for the first `initialize`
    Idle,
    /// Initial connect, bounded by [`RetryPolicy::max_attempts`]
    Connecting,
    Connected,
    /// Lost an established connection; reconnecting without a bound
    Disconnected,
    /// Initial connect exhausted its attempts; waiting for a new `initialize`
    Failed,
}

impl LinkState {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkState::Idle => "idle",
            LinkState::Connecting => "connecting",
            LinkState::Connected => "connected",
            LinkState::Disconnected => "disconnected",
            LinkState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bound on consecutive initial connect attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

/// Tuning shared by all link workers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    pub retry: RetryPolicy,
    /// Pause between reconnect attempts after an established link drops
    pub reconnect_delay: Duration,
    /// Treat the link as closed when no reply arrives within this window
    pub read_timeout: Option<Duration>,
    /// Consecutive malformed replies tolerated before reconnecting
    pub malformed_limit: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            reconnect_delay: Duration::from_millis(250),
            read_timeout: None,
            malformed_limit: 5,
        }
    }
}

/// Failures a link worker reacts to
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    /// Counted against the retry budget
    #[error("connect attempt {attempt} refused: {reason}")]
    ConnectRefused { attempt: u32, reason: String },

    /// Not counted; the worker reconnects from scratch
    #[error("transport closed: {0}")]
    TransportClosed(String),

    /// The record is dropped and counted against the malformed limit
    #[error("malformed record: {0}")]
    MalformedRecord(String),
}

/// Outcome of serving one decoded reply
#[derive(Debug, Clone, PartialEq)]
pub struct Cycle<R> {
    /// Emitted to `gui` in order
    pub records: Vec<Body>,
    /// Sent back on the link after the records
    pub request: Option<R>,
}

impl<R> Cycle<R> {
    pub fn new(records: Vec<Body>, request: Option<R>) -> Self {
        Self { records, request }
    }

    pub fn single(record: Body, request: Option<R>) -> Self {
        Self::new(vec![record], request)
    }
}

/// Link-specific half of a worker
///
/// Drivers are synchronous: I/O, retries, and status reporting belong to
/// the engine.
pub trait LinkDriver: Send + 'static {
    /// Source tag for everything this link emits
    const TAG: Tag;

    type Reply: Send;
    type Request: Send;
    type Codec: Decoder<Item = Self::Reply, Error = CodecError>
        + Encoder<Self::Request, Error = CodecError>
        + Send
        + Unpin
        + 'static;

    /// Fresh codec for a new connection
    fn codec(&self) -> Self::Codec;

    /// Request sent right after connecting and after a dropped reply
    fn next_request(&mut self) -> Option<Self::Request>;

    /// React to one decoded reply
    fn on_reply(&mut self, reply: Self::Reply) -> Result<Cycle<Self::Request>, LinkError>;

    /// Handle an inbox message other than `initialize`/`shutdown`
    ///
    /// Returns false when the message means nothing to this link.
    fn on_message(&mut self, body: &Body) -> bool {
        let _ = body;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_config_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.reconnect_delay, Duration::from_millis(250));
        assert_eq!(config.read_timeout, None);
        assert_eq!(config.malformed_limit, 5);
    }

    #[test]
    fn test_link_error_display() {
        let err = LinkError::ConnectRefused {
            attempt: 2,
            reason: "connection refused".into(),
        };
        assert_eq!(err.to_string(), "connect attempt 2 refused: connection refused");
        assert_eq!(
            LinkError::MalformedRecord("empty frame".into()).to_string(),
            "malformed record: empty frame"
        );
    }

    #[test]
    fn test_link_state_display() {
        assert_eq!(LinkState::Failed.to_string(), "failed");
    }
}
