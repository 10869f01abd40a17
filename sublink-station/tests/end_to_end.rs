//! Station and vehicle talking over loopback

use std::collections::HashSet;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;

use sublink_protocol::{Body, Tag, ThrusterVector};
use sublink_station::config::StationConfig;
use sublink_station::{NegotiationOutcome, Station};
use sublink_vehicle::config::VehicleConfig;
use sublink_vehicle::{
    forward_layer, ChannelThrusters, SimulatedTelemetry, Sources, SyntheticFrames, Vehicle,
};

const WAIT: Duration = Duration::from_secs(10);

async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

struct Ports {
    command: u16,
    video: u16,
    logging: u16,
    telemetry: u16,
    pilot: u16,
}

impl Ports {
    async fn free() -> Self {
        Self {
            command: free_port().await,
            video: free_port().await,
            logging: free_port().await,
            telemetry: free_port().await,
            pilot: free_port().await,
        }
    }

    fn vehicle(&self) -> VehicleConfig {
        let mut config = VehicleConfig::default();
        config.general.bind_host = "127.0.0.1".into();
        config.general.kill_enabled = true;
        config.ports.command = self.command;
        config.ports.video = self.video;
        config.ports.logging = self.logging;
        config.ports.telemetry = self.telemetry;
        config.ports.pilot = self.pilot;
        config.pacing.frame_interval_ms = 5;
        config.pacing.telemetry_interval_ms = 5;
        config.pacing.pilot_interval_ms = 5;
        config
    }

    fn station(&self) -> StationConfig {
        let mut config = StationConfig::default();
        config.general.status_interval_secs = 0;
        config.vehicle.host = "127.0.0.1".into();
        config.vehicle.command_port = self.command;
        config.vehicle.video_port = self.video;
        config.vehicle.logging_port = self.logging;
        config.vehicle.telemetry_port = self.telemetry;
        config.vehicle.pilot_port = self.pilot;
        config
    }
}

#[tokio::test]
async fn test_negotiated_links_deliver_data() {
    let ports = Ports::free().await;

    let (thrust_tx, mut thrust_rx) = mpsc::unbounded_channel();
    let sources = Sources::new(
        SyntheticFrames::new(16, 8),
        SimulatedTelemetry::with_seed(11),
        ChannelThrusters(thrust_tx),
    );
    // Held so the logging server waits for records instead of closing
    let (_layer, forwarder) = forward_layer();
    let vehicle = Vehicle::start(ports.vehicle(), sources, forwarder)
        .await
        .unwrap();

    let (station, mut gui) = Station::start_with_presentation(ports.station());
    assert_eq!(
        station.negotiate_and_activate().await,
        NegotiationOutcome::Accepted
    );

    let mut connected = HashSet::new();
    let mut frames = 0;
    let mut samples = 0;
    timeout(WAIT, async {
        while connected.len() < 4 || frames < 3 || samples < 3 {
            let msg = gui.rx.recv().await.unwrap();
            match msg.body {
                Body::Connected => {
                    connected.insert(msg.source);
                }
                Body::Frame(frame) => {
                    assert!(frame.starts_with(b"P5\n16 8\n255\n"));
                    frames += 1;
                }
                Body::Telemetry(record) => {
                    assert!(record.voltmeter > 0.0);
                    samples += 1;
                }
                _ => {}
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(connected, Tag::LINKS.into_iter().collect());

    let thrust = ThrusterVector::new([20, 20, 0, 20, 20, -30]).unwrap();
    assert!(station.pilot(thrust));
    timeout(WAIT, async {
        while thrust_rx.recv().await.unwrap() != thrust {}
    })
    .await
    .unwrap();

    drop(gui);
    timeout(WAIT, station.shutdown()).await.unwrap();
    vehicle.shutdown().await;
}

#[tokio::test]
async fn test_kill_drops_station_links() {
    let ports = Ports::free().await;
    let (_layer, forwarder) = forward_layer();
    let vehicle = Vehicle::start(ports.vehicle(), Sources::simulated(4, 4), forwarder)
        .await
        .unwrap();

    let mut config = ports.station();
    config.command.logging_level = 0;
    config.command.video = false;
    config.command.pilot = false;

    let (station, mut gui) = Station::start_with_presentation(config);
    assert!(station.negotiate_and_activate().await.is_accepted());

    timeout(WAIT, async {
        while gui.rx.recv().await.unwrap().body != Body::Connected {}
    })
    .await
    .unwrap();

    assert_eq!(station.kill_vehicle().await, sublink_station::Ack::Killed);
    timeout(WAIT, async {
        loop {
            let msg = gui.rx.recv().await.unwrap();
            if msg.source == Tag::Telemetry && msg.body == Body::Disconnected {
                break;
            }
        }
    })
    .await
    .unwrap();

    drop(gui);
    timeout(WAIT, station.shutdown()).await.unwrap();
    vehicle.shutdown().await;
}

#[tokio::test]
async fn test_no_vehicle_means_no_activation() {
    let ports = Ports::free().await;
    let mut config = ports.station();
    config.negotiation.timeout_ms = 300;

    let (station, mut gui) = Station::start_with_presentation(config);
    assert_eq!(
        station.negotiate_and_activate().await,
        NegotiationOutcome::Unavailable
    );
    assert!(timeout(Duration::from_millis(200), gui.rx.recv()).await.is_err());

    drop(gui);
    timeout(WAIT, station.shutdown()).await.unwrap();
}
