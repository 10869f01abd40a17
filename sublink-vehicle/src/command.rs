//! Vehicle side of the command negotiation handshake
//!
//! Replies to probes, decodes delivered configurations, and hands each
//! accepted request to the supervisor as a [`Directive`]. The reply is sent
//! only after the supervisor has applied it, so an accepted configuration
//! means the requested servers are already listening.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::codec::Framed;
use tracing::{debug, error, info, warn};

use sublink_protocol::{
    decode_config, CodecError, CommandConfig, CommandReply, CommandRequest,
    NegotiationServerCodec,
};

use crate::servers::accept_backoff;

/// How long a request waits for the supervisor
const APPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// What the station asked the vehicle to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEvent {
    Configure(CommandConfig),
    Kill,
}

/// A command event plus the channel the supervisor answers on
#[derive(Debug)]
pub struct Directive {
    pub event: CommandEvent,
    pub applied: oneshot::Sender<()>,
}

pub struct CommandServer {
    kill_enabled: bool,
    directives: mpsc::UnboundedSender<Directive>,
}

impl CommandServer {
    pub fn new(directives: mpsc::UnboundedSender<Directive>) -> Self {
        Self {
            kill_enabled: false,
            directives,
        }
    }

    pub fn with_kill_enabled(mut self, kill_enabled: bool) -> Self {
        self.kill_enabled = kill_enabled;
        self
    }

    /// Answer one request
    pub async fn handle(&self, request: &CommandRequest) -> CommandReply {
        match request.req.as_str() {
            CommandRequest::PROBE => CommandReply::ready(),
            CommandRequest::KILL => {
                if !self.kill_enabled {
                    warn!("kill requested but not enabled");
                    return CommandReply::rejected();
                }
                info!("kill requested");
                self.dispatch(CommandEvent::Kill, CommandReply::killed()).await
            }
            payload if payload.len() > 1 => match decode_and_validate(payload) {
                Ok(config) => {
                    info!(
                        logging_level = config.logging_level,
                        video = config.video_enabled,
                        telemetry = config.telemetry_enabled,
                        pilot = config.pilot_enabled,
                        mission = %config.mission,
                        "configuration received"
                    );
                    self.dispatch(CommandEvent::Configure(config), CommandReply::accepted())
                        .await
                }
                Err(e) => {
                    warn!(error = %e, "rejecting configuration");
                    CommandReply::rejected()
                }
            },
            other => {
                warn!(request = other, "unknown request");
                CommandReply::rejected()
            }
        }
    }

    async fn dispatch(&self, event: CommandEvent, reply: CommandReply) -> CommandReply {
        let (applied, done) = oneshot::channel();
        if self.directives.send(Directive { event, applied }).is_err() {
            error!("supervisor is gone");
            return CommandReply::rejected();
        }

        match tokio::time::timeout(APPLY_TIMEOUT, done).await {
            Ok(Ok(())) => reply,
            Ok(Err(_)) => {
                error!("supervisor dropped the request");
                CommandReply::rejected()
            }
            Err(_) => {
                error!("supervisor did not apply the request in time");
                CommandReply::rejected()
            }
        }
    }

    /// Accept negotiation connections until `shutdown` fires
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) {
        let server = Arc::new(self);
        if let Ok(addr) = listener.local_addr() {
            info!(%addr, "command server listening");
        }

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            debug!(%peer, "negotiation connection");
                            let server = Arc::clone(&server);
                            tokio::spawn(async move {
                                if let Err(e) = server.serve_connection(stream).await {
                                    debug!(%peer, error = %e, "negotiation connection ended");
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "command accept error");
                            if !accept_backoff(&mut shutdown).await {
                                break;
                            }
                        }
                    }
                }
                _ = shutdown.recv() => {
                    info!("Shutdown signal received, stopping command server");
                    break;
                }
            }
        }
    }

    async fn serve_connection(&self, stream: TcpStream) -> Result<(), CodecError> {
        let mut framed = Framed::new(stream, NegotiationServerCodec::new());
        while let Some(request) = framed.next().await {
            let reply = self.handle(&request?).await;
            framed.send(reply).await?;
        }
        Ok(())
    }
}

fn decode_and_validate(payload: &str) -> Result<CommandConfig, CodecError> {
    let config = decode_config(payload)?;
    config.validate()?;
    Ok(config)
}
