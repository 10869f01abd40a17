//! Station assembly
//!
//! Wires the router, the four link workers, and the presentation layer
//! together, and drives negotiation from the `main` participant.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use sublink_protocol::{Body, CommandConfig, Message, Tag, ThrusterVector};

use crate::activation::activation_plan;
use crate::config::StationConfig;
use crate::negotiator::{Ack, NegotiationOutcome, Negotiator};
use crate::presentation::StatusBoard;
use crate::router::{Mailbox, RouterBuilder};
use crate::worker::{
    ChannelWorker, LinkDriver, LoggingLink, PilotLink, TelemetryLink, VideoLink, WorkerConfig,
};

/// How long shutdown waits for each task before giving up on it
const STOP_TIMEOUT: Duration = Duration::from_secs(3);

/// A running station
pub struct Station {
    config: StationConfig,
    main: Mailbox,
    shutdown_tx: broadcast::Sender<()>,
    router: JoinHandle<()>,
    workers: Vec<(Tag, JoinHandle<()>)>,
    board: Option<JoinHandle<StatusBoard>>,
}

impl Station {
    /// Start with the headless [`StatusBoard`] as presentation layer
    pub fn start(config: StationConfig) -> Self {
        let (mut station, gui) = Self::wire(config);

        let mut board = StatusBoard::new();
        if station.config.general.status_interval_secs > 0 {
            board = board.with_summary_interval(Duration::from_secs(
                station.config.general.status_interval_secs,
            ));
        }
        let (_, rx) = gui.into_parts();
        station.board = Some(tokio::spawn(board.run(rx, station.shutdown_tx.subscribe())));
        station
    }

    /// Start and hand the `gui` mailbox to the caller
    pub fn start_with_presentation(config: StationConfig) -> (Self, Mailbox) {
        Self::wire(config)
    }

    fn wire(config: StationConfig) -> (Self, Mailbox) {
        let mut builder = RouterBuilder::new();
        let main = builder.attach(Tag::Main);
        let gui = builder.attach(Tag::Gui);

        let worker_config = config.worker_config();
        let workers = vec![
            spawn_worker(VideoLink::new(), builder.attach(Tag::Video), worker_config),
            spawn_worker(
                LoggingLink::with_mode(config.links.log_batch_mode.into()),
                builder.attach(Tag::Logging),
                worker_config,
            ),
            spawn_worker(TelemetryLink::new(), builder.attach(Tag::Telemetry), worker_config),
            spawn_worker(PilotLink::new(), builder.attach(Tag::Pilot), worker_config),
        ];

        let (shutdown_tx, _) = broadcast::channel(1);
        let router = tokio::spawn(builder.build().run(shutdown_tx.subscribe()));

        info!(vehicle = %config.vehicle.host, "station started");

        let station = Self {
            config,
            main,
            shutdown_tx,
            router,
            workers,
            board: None,
        };
        (station, gui)
    }

    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    fn negotiator(&self) -> Negotiator {
        Negotiator::from_config(&self.config)
    }

    /// Negotiate the configured links and activate them once accepted
    pub async fn negotiate_and_activate(&self) -> NegotiationOutcome {
        let command = self.config.command_config();
        let outcome = self.negotiator().negotiate(&command).await;
        if outcome.is_accepted() {
            self.activate(&command);
        }
        outcome
    }

    /// Send the activation plan for `command` to the workers
    ///
    /// Returns how many messages were sent.
    pub fn activate(&self, command: &CommandConfig) -> usize {
        let plan = activation_plan(command, &self.config.link_endpoints(), Tag::Main);
        let mut sent = 0;
        for msg in plan {
            if self.main.tx.send(msg).is_ok() {
                sent += 1;
            }
        }
        info!(messages = sent, "links activated");
        sent
    }

    /// Ask the vehicle to stop every link server
    pub async fn kill_vehicle(&self) -> Ack {
        let ack = self.negotiator().kill().await;
        match &ack {
            Ack::Killed => info!("vehicle stopped its link servers"),
            other => warn!(ack = %other, "vehicle did not confirm kill"),
        }
        ack
    }

    /// Queue a thruster vector for the pilot link
    pub fn pilot(&self, thrust: ThrusterVector) -> bool {
        self.main.send(Tag::Pilot, Body::Control(thrust))
    }

    /// Mute (0) or unmute the station's logging link
    ///
    /// Only gates what the station forwards to `gui`. The vehicle keeps the
    /// level it was configured with until a configuration is delivered again.
    pub fn set_logging_level(&self, level: u8) -> bool {
        self.main.send(Tag::Logging, Body::Modify(level))
    }

    /// Stop the workers, then the router and the presentation layer
    ///
    /// Returns the final board when the station owns one.
    pub async fn shutdown(self) -> Option<StatusBoard> {
        let Station {
            config: _,
            main,
            shutdown_tx,
            router,
            workers,
            board,
        } = self;

        for tag in Tag::LINKS {
            main.tx.send(Message::new(tag, Tag::Main, Body::Shutdown)).ok();
        }
        for (tag, handle) in workers {
            if tokio::time::timeout(STOP_TIMEOUT, handle).await.is_err() {
                warn!(link = %tag, "worker did not stop in time");
            }
        }

        // With every worker gone and `main` dropped the router drains and stops
        drop(main);
        let mut router = router;
        if tokio::time::timeout(STOP_TIMEOUT, &mut router).await.is_err() {
            shutdown_tx.send(()).ok();
            router.await.ok();
        }

        let board = match board {
            Some(board) => match tokio::time::timeout(STOP_TIMEOUT, board).await {
                Ok(Ok(board)) => Some(board),
                _ => {
                    warn!("status board did not stop cleanly");
                    None
                }
            },
            None => None,
        };

        info!("station stopped");
        board
    }
}

fn spawn_worker<L: LinkDriver>(
    driver: L,
    mailbox: Mailbox,
    config: WorkerConfig,
) -> (Tag, JoinHandle<()>) {
    let (outbox, inbox) = mailbox.into_parts();
    let handle = ChannelWorker::new(driver, inbox, outbox)
        .with_config(config)
        .spawn();
    (L::TAG, handle)
}
