use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::codec::CodecError;

/// Highest accepted logging level (0 off, 1 info, 2 debug)
pub const MAX_LOGGING_LEVEL: u8 = 2;

/// Autonomous mission selected at negotiation time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mission {
    #[default]
    None,
    Gate,
    Buoy,
    Rise,
    All,
}

impl Mission {
    pub fn as_str(self) -> &'static str {
        match self {
            Mission::None => "none",
            Mission::Gate => "gate",
            Mission::Buoy => "buoy",
            Mission::Rise => "rise",
            Mission::All => "all",
        }
    }
}

impl fmt::Display for Mission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mission {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Mission::None),
            "gate" => Ok(Mission::Gate),
            "buoy" => Ok(Mission::Buoy),
            "rise" => Ok(Mission::Rise),
            "all" => Ok(Mission::All),
            other => Err(CodecError::InvalidConfig(format!("unknown mission: {}", other))),
        }
    }
}

/// Which links the vehicle should serve, sent during negotiation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    pub logging_level: u8,
    pub video_enabled: bool,
    pub telemetry_enabled: bool,
    pub pilot_enabled: bool,
    pub mission: Mission,
}

impl CommandConfig {
    pub fn logging_enabled(&self) -> bool {
        self.logging_level > 0
    }

    /// Whether any link would be started by this configuration
    pub fn any_enabled(&self) -> bool {
        self.logging_enabled() || self.video_enabled || self.telemetry_enabled || self.pilot_enabled
    }

    pub fn validate(&self) -> Result<(), CodecError> {
        if self.logging_level > MAX_LOGGING_LEVEL {
            return Err(CodecError::InvalidConfig(format!(
                "logging_level {} exceeds {}",
                self.logging_level, MAX_LOGGING_LEVEL
            )));
        }
        Ok(())
    }
}
