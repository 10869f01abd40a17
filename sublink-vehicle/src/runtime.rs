//! Vehicle assembly: command server plus supervisor

use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use sublink_utils::{Result, SublinkError};

use crate::command::CommandServer;
use crate::config::VehicleConfig;
use crate::forward::LogForwarder;
use crate::servers::bind_listener;
use crate::sources::Sources;
use crate::supervisor::Supervisor;

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// A running vehicle
pub struct Vehicle {
    command_addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
    command: JoinHandle<()>,
    supervisor: JoinHandle<Supervisor>,
}

impl Vehicle {
    /// Bind the command server and wait for the station
    ///
    /// Link servers start only when a configuration is accepted.
    pub async fn start(
        config: VehicleConfig,
        sources: Sources,
        forwarder: LogForwarder,
    ) -> Result<Self> {
        let host = config.general.bind_host.clone();
        let port = config.ports.command;
        let listener = bind_listener(&host, port)
            .await
            .map_err(|source| SublinkError::Bind {
                addr: format!("{}:{}", host, port),
                source,
            })?;
        let command_addr = listener.local_addr()?;

        let (shutdown_tx, _) = broadcast::channel(1);
        let (directives_tx, directives_rx) = mpsc::unbounded_channel();

        let server =
            CommandServer::new(directives_tx).with_kill_enabled(config.general.kill_enabled);
        let command = tokio::spawn(server.run(listener, shutdown_tx.subscribe()));

        let supervisor = Supervisor::new(config, sources, forwarder);
        let supervisor = tokio::spawn(supervisor.run(directives_rx, shutdown_tx.subscribe()));

        info!(%command_addr, "vehicle started");
        Ok(Self {
            command_addr,
            shutdown_tx,
            command,
            supervisor,
        })
    }

    pub fn command_addr(&self) -> SocketAddr {
        self.command_addr
    }

    /// Stop the command server and every link server
    pub async fn shutdown(self) -> Option<Supervisor> {
        self.shutdown_tx.send(()).ok();

        if tokio::time::timeout(STOP_TIMEOUT, self.command).await.is_err() {
            warn!("command server did not stop in time");
        }
        let supervisor = match tokio::time::timeout(STOP_TIMEOUT, self.supervisor).await {
            Ok(Ok(supervisor)) => Some(supervisor),
            _ => {
                warn!("supervisor did not stop cleanly");
                None
            }
        };

        info!("vehicle stopped");
        supervisor
    }
}

#[cfg(test)]
mod tests {
    use futures::{SinkExt, StreamExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio_util::codec::Framed;

    use sublink_protocol::{
        CommandConfig, CommandReply, CommandRequest, FrameClientCodec, Mission,
        NegotiationClientCodec, Poll,
    };

    use super::*;
    use crate::forward::forward_layer;

    async fn free_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    async fn request(addr: SocketAddr, request: CommandRequest) -> CommandReply {
        let stream = TcpStream::connect(addr).await.unwrap();
        let mut framed = Framed::new(stream, NegotiationClientCodec::new());
        framed.send(request).await.unwrap();
        framed.next().await.unwrap().unwrap()
    }

    async fn vehicle(kill_enabled: bool) -> (Vehicle, u16) {
        let mut config = VehicleConfig::default();
        config.general.bind_host = "127.0.0.1".into();
        config.general.kill_enabled = kill_enabled;
        config.ports.command = free_port().await;
        config.ports.video = free_port().await;

        let video_port = config.ports.video;
        let (_layer, forwarder) = forward_layer();
        let vehicle = Vehicle::start(config, Sources::simulated(4, 4), forwarder)
            .await
            .unwrap();
        (vehicle, video_port)
    }

    fn video_only() -> CommandConfig {
        CommandConfig {
            logging_level: 0,
            video_enabled: true,
            telemetry_enabled: false,
            pilot_enabled: false,
            mission: Mission::None,
        }
    }

    #[tokio::test]
    async fn test_accepted_configuration_starts_video() {
        let (vehicle, video_port) = vehicle(false).await;
        let addr = vehicle.command_addr();

        assert_eq!(request(addr, CommandRequest::probe()).await, CommandReply::ready());
        assert_eq!(
            request(addr, CommandRequest::configure(&video_only()).unwrap()).await,
            CommandReply::accepted()
        );

        // Accepted means listening
        let stream = TcpStream::connect(("127.0.0.1", video_port)).await.unwrap();
        let mut station = Framed::new(stream, FrameClientCodec::new());
        station.send(Poll).await.unwrap();
        assert!(!station.next().await.unwrap().unwrap().is_empty());

        let supervisor = vehicle.shutdown().await.unwrap();
        assert!(supervisor.running().is_empty());
    }

    #[tokio::test]
    async fn test_kill_stops_link_servers() {
        let (vehicle, video_port) = vehicle(true).await;
        let addr = vehicle.command_addr();

        request(addr, CommandRequest::configure(&video_only()).unwrap()).await;
        assert_eq!(request(addr, CommandRequest::kill()).await, CommandReply::killed());
        assert!(TcpStream::connect(("127.0.0.1", video_port)).await.is_err());

        vehicle.shutdown().await;
    }

    #[tokio::test]
    async fn test_command_port_in_use() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = VehicleConfig::default();
        config.general.bind_host = "127.0.0.1".into();
        config.ports.command = taken.local_addr().unwrap().port();

        let (_layer, forwarder) = forward_layer();
        let err = Vehicle::start(config, Sources::simulated(4, 4), forwarder)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, SublinkError::Bind { .. }));
    }
}
