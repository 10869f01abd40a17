//! Headless stand-in for the presentation layer
//!
//! Consumes `gui`-addressed messages and keeps the per-link status the
//! operator would see. Vehicle log records are re-emitted through tracing.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::Interval;
use tracing::{debug, info};

use sublink_protocol::{Body, Message, Tag, TelemetryRecord};

/// Records kept for [`StatusBoard::recent_logs`]
const LOG_HISTORY: usize = 200;

/// What the operator sees for one link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkStatus {
    #[default]
    NotConnected,
    Connecting,
    Connected,
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LinkStatus::NotConnected => "not connected",
            LinkStatus::Connecting => "connecting",
            LinkStatus::Connected => "connected",
        })
    }
}

#[derive(Debug, Default)]
pub struct StatusBoard {
    status: BTreeMap<Tag, LinkStatus>,
    frames: u64,
    last_frame_len: usize,
    logs: VecDeque<String>,
    telemetry: Option<TelemetryRecord>,
    summary_every: Option<Duration>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log [`StatusBoard::summary`] periodically while running
    pub fn with_summary_interval(mut self, every: Duration) -> Self {
        self.summary_every = Some(every).filter(|d| !d.is_zero());
        self
    }

    pub fn status(&self, tag: Tag) -> LinkStatus {
        self.status.get(&tag).copied().unwrap_or_default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn recent_logs(&self) -> impl Iterator<Item = &str> {
        self.logs.iter().map(String::as_str)
    }

    pub fn telemetry(&self) -> Option<&TelemetryRecord> {
        self.telemetry.as_ref()
    }

    /// Fold one message into the board
    pub fn apply(&mut self, msg: &Message) {
        let source = msg.source;
        match &msg.body {
            Body::Connected => self.set_status(source, LinkStatus::Connected),
            Body::Disconnected => self.set_status(source, LinkStatus::NotConnected),
            Body::Connecting => self.set_status(source, LinkStatus::Connecting),
            Body::Frame(frame) => {
                self.frames += 1;
                self.last_frame_len = frame.len();
            }
            Body::Log(line) => {
                info!(target: "vehicle", "{}", line);
                if self.logs.len() == LOG_HISTORY {
                    self.logs.pop_front();
                }
                self.logs.push_back(line.clone());
            }
            Body::Telemetry(record) => self.telemetry = Some(*record),
            other => debug!(%source, verb = other.verb(), "status board ignoring message"),
        }
    }

    fn set_status(&mut self, tag: Tag, status: LinkStatus) {
        let previous = self.status.insert(tag, status).unwrap_or_default();
        if previous != status {
            info!(link = %tag, %status, "link status changed");
        }
    }

    /// One-line summary of every link
    pub fn summary(&self) -> String {
        let links: Vec<String> = Tag::LINKS
            .iter()
            .map(|tag| format!("{}: {}", tag, self.status(*tag)))
            .collect();
        let mut line = links.join(", ");
        if self.frames > 0 {
            line.push_str(&format!(
                " | frames: {} (last {} bytes)",
                self.frames, self.last_frame_len
            ));
        }
        if let Some(t) = &self.telemetry {
            line.push_str(&format!(
                " | pressure {:.1}, battery {:.1}V, yaw {:.1}",
                t.pressure, t.voltmeter, t.yaw
            ));
        }
        line
    }

    /// Consume messages until shutdown or the router hangs up
    pub async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<Message>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Self {
        let mut ticker = self.summary_every.map(tokio::time::interval);

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                msg = rx.recv() => match msg {
                    Some(msg) => self.apply(&msg),
                    None => break,
                },
                _ = tick(&mut ticker) => info!(summary = %self.summary(), "link status"),
            }
        }
        info!(summary = %self.summary(), "status board stopped");
        self
    }
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
