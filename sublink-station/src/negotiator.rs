//! Station side of the command negotiation handshake
//!
//! The station probes the vehicle's command server, then delivers the link
//! configuration. Only an accepted configuration activates links.

use std::fmt;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use sublink_protocol::{
    CommandConfig, CommandReply, CommandRequest, Endpoint, NegotiationClientCodec,
};

use crate::config::StationConfig;
use crate::worker::{Dialer, TcpDialer};

/// Acknowledgement from the vehicle, or the lack of one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ack {
    /// `"1"`: the command server is up
    Ready,
    /// `"2"`: the configuration was applied
    ConfigAccepted,
    /// `"3"`: every link server was stopped
    Killed,
    /// `"!"` from the vehicle
    Rejected,
    /// No reply: unreachable, reset, or timed out
    Unavailable,
    /// Anything else the vehicle answered
    Unexpected(String),
}

impl Ack {
    pub fn from_reply(reply: &CommandReply) -> Self {
        match reply.ack.as_str() {
            CommandReply::READY => Ack::Ready,
            CommandReply::ACCEPTED => Ack::ConfigAccepted,
            CommandReply::KILLED => Ack::Killed,
            CommandReply::REJECTED => Ack::Rejected,
            other => Ack::Unexpected(other.to_string()),
        }
    }

    /// Wire form of the acknowledgement
    pub fn as_str(&self) -> &str {
        match self {
            Ack::Ready => CommandReply::READY,
            Ack::ConfigAccepted => CommandReply::ACCEPTED,
            Ack::Killed => CommandReply::KILLED,
            Ack::Rejected | Ack::Unavailable => CommandReply::REJECTED,
            Ack::Unexpected(s) => s,
        }
    }
}

impl fmt::Display for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a full probe-then-deliver handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationOutcome {
    /// Configuration applied; the enabled links may be activated
    Accepted,
    /// The probe got no answer
    Unavailable,
    /// The probe was answered with something other than ready
    NotReady(Ack),
    /// The configuration was not accepted
    ConfigRejected(Ack),
}

impl NegotiationOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, NegotiationOutcome::Accepted)
    }
}

impl fmt::Display for NegotiationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegotiationOutcome::Accepted => write!(f, "configuration accepted"),
            NegotiationOutcome::Unavailable => write!(f, "command server unavailable"),
            NegotiationOutcome::NotReady(ack) => write!(f, "command server not ready ({})", ack),
            NegotiationOutcome::ConfigRejected(ack) => {
                write!(f, "configuration rejected ({})", ack)
            }
        }
    }
}

/// Client for the vehicle's command server
#[derive(Debug, Clone)]
pub struct Negotiator<D: Dialer = TcpDialer> {
    endpoint: Endpoint,
    request_timeout: Duration,
    dialer: D,
}

impl Negotiator<TcpDialer> {
    pub fn new(endpoint: Endpoint) -> Self {
        let request_timeout = Duration::from_secs(2);
        Self {
            endpoint,
            request_timeout,
            dialer: TcpDialer::new(request_timeout),
        }
    }

    /// Negotiator for the configured command server and request timeout
    pub fn from_config(config: &StationConfig) -> Self {
        Self::new(config.command_endpoint())
            .with_timeout(Duration::from_millis(config.negotiation.timeout_ms))
    }
}

impl<D: Dialer> Negotiator<D> {
    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn with_dialer<D2: Dialer>(self, dialer: D2) -> Negotiator<D2> {
        Negotiator {
            endpoint: self.endpoint,
            request_timeout: self.request_timeout,
            dialer,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Ask whether the command server is up
    pub async fn probe(&self) -> Ack {
        self.request(CommandRequest::probe()).await
    }

    /// Send a link configuration
    pub async fn deliver(&self, config: &CommandConfig) -> Ack {
        if let Err(e) = config.validate() {
            warn!(error = %e, "refusing to deliver invalid configuration");
            return Ack::Rejected;
        }

        match CommandRequest::configure(config) {
            Ok(request) => self.request(request).await,
            Err(e) => {
                warn!(error = %e, "failed to encode configuration");
                Ack::Rejected
            }
        }
    }

    /// Ask the vehicle to stop every link server
    pub async fn kill(&self) -> Ack {
        self.request(CommandRequest::kill()).await
    }

    /// Probe, then deliver `config` if the vehicle is ready
    pub async fn negotiate(&self, config: &CommandConfig) -> NegotiationOutcome {
        match self.probe().await {
            Ack::Ready => {}
            Ack::Unavailable => {
                warn!(endpoint = %self.endpoint, "command server unavailable");
                return NegotiationOutcome::Unavailable;
            }
            other => {
                warn!(endpoint = %self.endpoint, ack = %other, "command server not ready");
                return NegotiationOutcome::NotReady(other);
            }
        }

        match self.deliver(config).await {
            Ack::ConfigAccepted => {
                info!(endpoint = %self.endpoint, mission = %config.mission, "configuration accepted");
                NegotiationOutcome::Accepted
            }
            other => {
                warn!(endpoint = %self.endpoint, ack = %other, "configuration not accepted");
                NegotiationOutcome::ConfigRejected(other)
            }
        }
    }

    /// One request over a fresh connection, bounded by the request timeout
    async fn request(&self, request: CommandRequest) -> Ack {
        let req = request.req.clone();
        match tokio::time::timeout(self.request_timeout, self.exchange(request)).await {
            Ok(Ok(reply)) => {
                let ack = Ack::from_reply(&reply);
                debug!(%req, %ack, "negotiation reply");
                ack
            }
            Ok(Err(reason)) => {
                debug!(%req, %reason, "negotiation request failed");
                Ack::Unavailable
            }
            Err(_) => {
                debug!(
                    %req,
                    timeout_ms = self.request_timeout.as_millis() as u64,
                    "negotiation request timed out"
                );
                Ack::Unavailable
            }
        }
    }

    async fn exchange(&self, request: CommandRequest) -> Result<CommandReply, String> {
        let stream = self
            .dialer
            .dial(&self.endpoint)
            .await
            .map_err(|e| e.to_string())?;
        let mut framed = Framed::new(stream, NegotiationClientCodec::new());

        framed.send(request).await.map_err(|e| e.to_string())?;
        match framed.next().await {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(e)) => Err(e.to_string()),
            None => Err("connection closed before reply".into()),
        }
    }
}
