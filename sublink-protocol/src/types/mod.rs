//! Value types carried on the links

mod command;
mod telemetry;
mod thrust;

pub use command::{CommandConfig, Mission, MAX_LOGGING_LEVEL};
pub use telemetry::{TelemetryRecord, FIELD_COUNT, RECORD_SIZE};
pub use thrust::{Thruster, ThrusterVector, THRUSTER_COUNT, THRUST_LIMIT};
