//! sublink-vehicle: the vehicle side of the sublink links
//!
//! Serves video, logging, telemetry, and pilot links to one station, and
//! starts them on demand through the command negotiation server.

pub mod cli;
pub mod command;
pub mod config;
pub mod forward;
pub mod runtime;
pub mod servers;
pub mod sources;
pub mod supervisor;

pub use command::{CommandEvent, CommandServer, Directive};
pub use forward::{forward_layer, ForwardLayer, LogForwarder};
pub use runtime::Vehicle;
pub use sources::{
    ChannelThrusters, FrameSource, LoggingThrusters, SimulatedTelemetry, Sources,
    SyntheticFrames, TelemetrySource, ThrusterSink,
};
pub use supervisor::Supervisor;
