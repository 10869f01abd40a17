//! Starting and stopping link servers on command
//!
//! The supervisor owns every running link server. A configure directive
//! starts the servers its flags enable; a kill stops all of them.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use sublink_protocol::{CommandConfig, Mission, Tag};
use sublink_utils::{Result, SublinkError};

use crate::command::{CommandEvent, Directive};
use crate::config::VehicleConfig;
use crate::forward::LogForwarder;
use crate::servers::{
    bind_listener, serve_link, LinkHandler, LoggingServer, PilotServer, TelemetryServer,
    VideoServer,
};
use crate::sources::Sources;

/// How long a stopping server gets before it is aborted
const STOP_TIMEOUT: Duration = Duration::from_secs(2);

struct RunningServer {
    addr: SocketAddr,
    shutdown: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl RunningServer {
    async fn stop(self, tag: Tag) {
        self.shutdown.send(()).ok();
        let mut task = self.task;
        if tokio::time::timeout(STOP_TIMEOUT, &mut task).await.is_err() {
            warn!(link = %tag, "server did not stop in time, aborting");
            task.abort();
        }
    }
}

pub struct Supervisor {
    config: VehicleConfig,
    sources: Sources,
    forwarder: LogForwarder,
    running: BTreeMap<Tag, RunningServer>,
    mission: Mission,
}

impl Supervisor {
    pub fn new(config: VehicleConfig, sources: Sources, forwarder: LogForwarder) -> Self {
        Self {
            config,
            sources,
            forwarder,
            running: BTreeMap::new(),
            mission: Mission::None,
        }
    }

    pub fn is_running(&self, tag: Tag) -> bool {
        self.running.contains_key(&tag)
    }

    /// Links with a running server, in tag order
    pub fn running(&self) -> Vec<Tag> {
        self.running.keys().copied().collect()
    }

    pub fn local_addr(&self, tag: Tag) -> Option<SocketAddr> {
        self.running.get(&tag).map(|server| server.addr)
    }

    pub fn mission(&self) -> Mission {
        self.mission
    }

    pub async fn apply(&mut self, event: CommandEvent) {
        match event {
            CommandEvent::Configure(config) => self.configure(&config).await,
            CommandEvent::Kill => self.kill().await,
        }
    }

    /// Start every enabled server that is not already running
    pub async fn configure(&mut self, command: &CommandConfig) {
        self.forwarder.set_level(command.logging_level);
        if command.mission != self.mission {
            info!(from = %self.mission, to = %command.mission, "mission selected");
            self.mission = command.mission;
        }

        let wanted = [
            (Tag::Video, command.video_enabled),
            (Tag::Logging, command.logging_enabled()),
            (Tag::Telemetry, command.telemetry_enabled),
            (Tag::Pilot, command.pilot_enabled),
        ];

        for (tag, enabled) in wanted {
            if !enabled || self.is_running(tag) {
                continue;
            }
            if let Err(e) = self.start(tag).await {
                error!(link = %tag, error = %e, "failed to start link server");
            }
        }
    }

    /// Stop every running server
    pub async fn kill(&mut self) {
        let running = std::mem::take(&mut self.running);
        let count = running.len();
        for (tag, server) in running {
            server.stop(tag).await;
        }
        info!(stopped = count, "all link servers stopped");
    }

    async fn start(&mut self, tag: Tag) -> Result<()> {
        let port = self
            .config
            .ports
            .link(tag)
            .ok_or_else(|| SublinkError::internal(format!("{} is not a link", tag)))?;
        let host = &self.config.general.bind_host;

        let listener = bind_listener(host, port)
            .await
            .map_err(|source| SublinkError::Bind {
                addr: format!("{}:{}", host, port),
                source,
            })?;
        let addr = listener.local_addr()?;
        let (shutdown, shutdown_rx) = broadcast::channel(1);

        let pacing = &self.config.pacing;
        let task = match tag {
            Tag::Video => spawn_server(
                listener,
                VideoServer::new(self.sources.frames.clone(), pacing.frame_interval()),
                shutdown_rx,
            ),
            Tag::Logging => spawn_server(
                listener,
                LoggingServer::new(self.forwarder.clone(), pacing.log_batch_max),
                shutdown_rx,
            ),
            Tag::Telemetry => spawn_server(
                listener,
                TelemetryServer::new(self.sources.telemetry.clone(), pacing.telemetry_interval()),
                shutdown_rx,
            ),
            Tag::Pilot => spawn_server(
                listener,
                PilotServer::new(self.sources.thrusters.clone(), pacing.pilot_interval()),
                shutdown_rx,
            ),
            Tag::Gui | Tag::Main => {
                return Err(SublinkError::internal(format!("{} is not a link", tag)))
            }
        };

        info!(link = %tag, %addr, "link server started");
        self.running.insert(
            tag,
            RunningServer {
                addr,
                shutdown,
                task,
            },
        );
        Ok(())
    }

    /// Apply directives until the command server hangs up or `shutdown` fires
    ///
    /// Every server is stopped before returning.
    pub async fn run(
        mut self,
        mut directives: mpsc::UnboundedReceiver<Directive>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Self {
        loop {
            tokio::select! {
                directive = directives.recv() => {
                    let Some(directive) = directive else { break };
                    self.apply(directive.event).await;
                    directive.applied.send(()).ok();
                }
                _ = shutdown.recv() => break,
            }
        }

        self.kill().await;
        self
    }
}

fn spawn_server<H: LinkHandler>(
    listener: TcpListener,
    handler: H,
    shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(serve_link(listener, handler, shutdown))
}
