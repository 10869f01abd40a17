//! Configuration schema structs

use std::time::Duration;

use serde::{Deserialize, Serialize};

use sublink_protocol::Tag;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    pub general: GeneralConfig,
    pub ports: PortConfig,
    pub pacing: PacingConfig,
    pub video: VideoConfig,
}

/// General vehicle settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Address every server binds to
    pub bind_host: String,
    /// Honor the station's request to stop every link server
    pub kill_enabled: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".into(),
            kill_enabled: false,
        }
    }
}

/// Listening ports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortConfig {
    pub command: u16,
    pub video: u16,
    pub logging: u16,
    pub telemetry: u16,
    pub pilot: u16,
}

impl PortConfig {
    /// Port for one of the four links
    pub fn link(&self, tag: Tag) -> Option<u16> {
        match tag {
            Tag::Video => Some(self.video),
            Tag::Logging => Some(self.logging),
            Tag::Telemetry => Some(self.telemetry),
            Tag::Pilot => Some(self.pilot),
            Tag::Gui | Tag::Main => None,
        }
    }
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            command: 50052,
            video: 50001,
            logging: 50002,
            telemetry: 50003,
            pilot: 50004,
        }
    }
}

/// How fast each server answers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Minimum gap between video frames (default: 33)
    pub frame_interval_ms: u64,
    /// Minimum gap between telemetry samples (default: 100)
    pub telemetry_interval_ms: u64,
    /// Pause before each ready signal on the pilot link (default: 50)
    pub pilot_interval_ms: u64,
    /// Most log records sent in one batch (default: 64)
    pub log_batch_max: usize,
}

impl PacingConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn telemetry_interval(&self) -> Duration {
        Duration::from_millis(self.telemetry_interval_ms)
    }

    pub fn pilot_interval(&self) -> Duration {
        Duration::from_millis(self.pilot_interval_ms)
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 33,
            telemetry_interval_ms: 100,
            pilot_interval_ms: 50,
            log_batch_max: 64,
        }
    }
}

/// Synthetic camera settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub width: u16,
    pub height: u16,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: 160,
            height: 120,
        }
    }
}
