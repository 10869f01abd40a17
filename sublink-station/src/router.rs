//! Message routing between the station's participants
//!
//! Every participant (the four link workers, the presentation layer, and
//! `main`) gets a [`Mailbox`]. The router fans in everything participants
//! send and delivers each message to the queue of its destination.

use std::collections::HashMap;

use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, trace, warn};

use sublink_protocol::{Body, Message, Tag};

/// One participant's view of the router
#[derive(Debug)]
pub struct Mailbox {
    pub tag: Tag,
    /// Messages sent here are routed by destination
    pub tx: mpsc::UnboundedSender<Message>,
    /// Messages addressed to this participant
    pub rx: mpsc::UnboundedReceiver<Message>,
}

impl Mailbox {
    /// Send a message from this participant
    pub fn send(&self, destination: Tag, body: Body) -> bool {
        self.tx
            .send(Message::new(destination, self.tag, body))
            .is_ok()
    }

    /// Split into the (outbox, inbox) pair a worker consumes
    pub fn into_parts(
        self,
    ) -> (
        mpsc::UnboundedSender<Message>,
        mpsc::UnboundedReceiver<Message>,
    ) {
        (self.tx, self.rx)
    }
}

/// Collects participants before the router starts
#[derive(Debug, Default)]
pub struct RouterBuilder {
    inbound: Vec<mpsc::UnboundedReceiver<Message>>,
    outbound: HashMap<Tag, mpsc::UnboundedSender<Message>>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the inbound and outbound queues for `tag`
    ///
    /// Attaching a tag twice replaces the earlier outbound queue.
    pub fn attach(&mut self, tag: Tag) -> Mailbox {
        let (to_router, inbound) = mpsc::unbounded_channel();
        let (outbound, to_participant) = mpsc::unbounded_channel();

        if self.outbound.insert(tag, outbound).is_some() {
            warn!(%tag, "participant attached twice; earlier mailbox no longer receives");
        }
        self.inbound.push(inbound);

        Mailbox {
            tag,
            tx: to_router,
            rx: to_participant,
        }
    }

    pub fn build(self) -> Router {
        Router {
            inbound: self.inbound,
            outbound: self.outbound,
        }
    }
}

/// Delivers every message to the queue named by its destination
pub struct Router {
    inbound: Vec<mpsc::UnboundedReceiver<Message>>,
    outbound: HashMap<Tag, mpsc::UnboundedSender<Message>>,
}

impl Router {
    pub fn is_attached(&self, tag: Tag) -> bool {
        self.outbound.contains_key(&tag)
    }

    /// Deliver one message
    pub fn route(&self, msg: Message) -> Result<(), RouterError> {
        let destination = msg.destination;
        let Some(queue) = self.outbound.get(&destination) else {
            return Err(RouterError::UnknownDestination(destination));
        };

        trace!(%msg, "routing");
        queue
            .send(msg)
            .map_err(|_| RouterError::QueueClosed(destination))
    }

    /// Route until `shutdown` fires or every participant has hung up
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let streams: Vec<BoxStream<'static, Message>> = self
            .inbound
            .into_iter()
            .map(|rx| {
                stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|msg| (msg, rx)) })
                    .boxed()
            })
            .collect();
        let mut inbound = stream::select_all(streams);
        let outbound = Router {
            inbound: Vec::new(),
            outbound: self.outbound,
        };

        info!(participants = outbound.outbound.len(), "router started");

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("router received shutdown signal");
                    break;
                }

                next = inbound.next() => {
                    let Some(msg) = next else {
                        info!("all participants hung up, router stopping");
                        break;
                    };

                    match outbound.route(msg) {
                        Ok(()) => {}
                        Err(e @ RouterError::UnknownDestination(_)) => {
                            debug!(error = %e, "dropping message");
                        }
                        Err(e @ RouterError::QueueClosed(_)) => {
                            warn!(error = %e, "dropping message");
                        }
                    }
                }
            }
        }
    }
}

/// Errors that can occur during message routing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    /// No participant attached under the destination tag
    UnknownDestination(Tag),
    /// The destination's receiver was dropped
    QueueClosed(Tag),
}

impl std::fmt::Display for RouterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouterError::UnknownDestination(tag) => write!(f, "No participant attached for {}", tag),
            RouterError::QueueClosed(tag) => write!(f, "Queue for {} is closed", tag),
        }
    }
}

impl std::error::Error for RouterError {}
