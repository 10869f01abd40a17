//! Configuration schema structs

use std::time::Duration;

use serde::{Deserialize, Serialize};

use sublink_protocol::{BatchMode, CommandConfig, Endpoint, Mission};

use crate::activation::LinkEndpoints;
use crate::worker::{RetryPolicy, WorkerConfig};

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    pub general: GeneralConfig,
    pub vehicle: VehicleConfig,
    pub command: CommandSection,
    pub links: LinkConfig,
    pub negotiation: NegotiationConfig,
}

impl StationConfig {
    pub fn command_endpoint(&self) -> Endpoint {
        Endpoint::new(self.vehicle.host.clone(), self.vehicle.command_port)
    }

    pub fn link_endpoints(&self) -> LinkEndpoints {
        let v = &self.vehicle;
        LinkEndpoints {
            video: Endpoint::new(v.host.clone(), v.video_port),
            logging: Endpoint::new(v.host.clone(), v.logging_port),
            telemetry: Endpoint::new(v.host.clone(), v.telemetry_port),
            pilot: Endpoint::new(v.host.clone(), v.pilot_port),
        }
    }

    pub fn command_config(&self) -> CommandConfig {
        CommandConfig {
            logging_level: self.command.logging_level,
            video_enabled: self.command.video,
            telemetry_enabled: self.command.telemetry,
            pilot_enabled: self.command.pilot,
            mission: self.command.mission,
        }
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            retry: RetryPolicy {
                max_attempts: self.links.max_attempts,
            },
            reconnect_delay: Duration::from_millis(self.links.reconnect_delay_ms),
            read_timeout: self.links.read_timeout_ms.map(Duration::from_millis),
            malformed_limit: self.links.malformed_limit,
        }
    }
}

/// General station settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// How often the status board logs a summary (0 disables)
    pub status_interval_secs: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            status_interval_secs: 5,
        }
    }
}

/// Where the vehicle listens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    pub host: String,
    pub command_port: u16,
    pub video_port: u16,
    pub logging_port: u16,
    pub telemetry_port: u16,
    pub pilot_port: u16,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            command_port: 50052,
            video_port: 50001,
            logging_port: 50002,
            telemetry_port: 50003,
            pilot_port: 50004,
        }
    }
}

/// Links to request during negotiation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSection {
    /// 0 off, 1 info, 2 debug
    pub logging_level: u8,
    pub video: bool,
    pub telemetry: bool,
    pub pilot: bool,
    pub mission: Mission,
}

impl Default for CommandSection {
    fn default() -> Self {
        Self {
            logging_level: 1,
            video: true,
            telemetry: true,
            pilot: true,
            mission: Mission::None,
        }
    }
}

/// How the logging link handles a record split across reads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchModeSetting {
    #[default]
    Truncate,
    CarryOver,
}

impl From<BatchModeSetting> for BatchMode {
    fn from(setting: BatchModeSetting) -> Self {
        match setting {
            BatchModeSetting::Truncate => BatchMode::Truncate,
            BatchModeSetting::CarryOver => BatchMode::CarryOver,
        }
    }
}

/// Link worker tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Initial connect attempts before giving up (default: 3)
    pub max_attempts: u32,
    /// Pause between reconnects after a drop (default: 250)
    pub reconnect_delay_ms: u64,
    /// Drop a link that stays silent this long (default: unset)
    pub read_timeout_ms: Option<u64>,
    /// Consecutive malformed records before reconnecting (default: 5)
    pub malformed_limit: u32,
    pub log_batch_mode: BatchModeSetting,
}

impl Default for LinkConfig {
    fn default() -> Self {
        let worker = WorkerConfig::default();
        Self {
            max_attempts: worker.retry.max_attempts,
            reconnect_delay_ms: worker.reconnect_delay.as_millis() as u64,
            read_timeout_ms: None,
            malformed_limit: worker.malformed_limit,
            log_batch_mode: BatchModeSetting::default(),
        }
    }
}

/// Command negotiation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiationConfig {
    pub timeout_ms: u64,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self { timeout_ms: 2000 }
    }
}
