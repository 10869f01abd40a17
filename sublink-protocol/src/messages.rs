//! Message contract between the station's workers, router, and presentation layer

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;

use crate::types::{TelemetryRecord, ThrusterVector};

/// Participant addressed by a [`Message`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tag {
    Video,
    Logging,
    Telemetry,
    Pilot,
    Gui,
    Main,
}

impl Tag {
    /// The four link workers, in startup order
    pub const LINKS: [Tag; 4] = [Tag::Video, Tag::Logging, Tag::Telemetry, Tag::Pilot];

    /// Wire name of the tag
    pub fn as_str(self) -> &'static str {
        match self {
            Tag::Video => "video",
            Tag::Logging => "logging",
            Tag::Telemetry => "telemetry",
            Tag::Pilot => "pilot",
            Tag::Gui => "gui",
            Tag::Main => "main",
        }
    }

    /// Whether this tag names a link worker
    pub fn is_link(self) -> bool {
        Self::LINKS.contains(&self)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown tag name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tag: {0}")]
pub struct ParseTagError(pub String);

impl FromStr for Tag {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(Tag::Video),
            "logging" => Ok(Tag::Logging),
            "telemetry" => Ok(Tag::Telemetry),
            "pilot" => Ok(Tag::Pilot),
            "gui" => Ok(Tag::Gui),
            "main" => Ok(Tag::Main),
            other => Err(ParseTagError(other.to_string())),
        }
    }
}

/// Host and port of a vehicle link
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Verb and payload of a [`Message`]
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Start connecting to the given endpoint
    Initialize(Endpoint),
    /// Link-specific setting (the logging level for the logging link)
    Modify(u8),
    /// Link is connected
    Connected,
    /// Link is not connected
    Disconnected,
    /// Link left Idle or Failed and is attempting its first connect
    Connecting,
    /// One encoded video frame
    Frame(Bytes),
    /// One log record from the vehicle
    Log(String),
    /// One decoded telemetry record
    Telemetry(TelemetryRecord),
    /// Thruster command for the pilot link
    Control(ThrusterVector),
    /// Stop the addressed worker
    Shutdown,
}

impl Body {
    /// Verb name, as used in logs and by the presentation layer
    pub fn verb(&self) -> &'static str {
        match self {
            Body::Initialize(_) => "initialize",
            Body::Modify(_) => "modify",
            Body::Connected => "conn_socket",
            Body::Disconnected => "no_conn_socket",
            Body::Connecting => "connecting",
            Body::Frame(_) => "frame",
            Body::Log(_) => "log",
            Body::Telemetry(_) => "telemetry",
            Body::Control(_) => "control",
            Body::Shutdown => "shutdown",
        }
    }

    /// Whether this body reports link status rather than carrying data
    pub fn is_status(&self) -> bool {
        matches!(self, Body::Connected | Body::Disconnected | Body::Connecting)
    }
}

/// A single routed message: exactly one destination and one source
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub destination: Tag,
    pub source: Tag,
    pub body: Body,
}

impl Message {
    pub fn new(destination: Tag, source: Tag, body: Body) -> Self {
        Self {
            destination,
            source,
            body,
        }
    }

    pub fn verb(&self) -> &'static str {
        self.body.verb()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}: {}", self.source, self.destination, self.verb())
    }
}
