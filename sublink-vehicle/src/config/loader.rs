//! Configuration loader

use std::path::Path;

use sublink_utils::{vehicle_config_file, Result, SublinkError};

use super::VehicleConfig;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from default location
    pub fn load() -> Result<VehicleConfig> {
        let path = vehicle_config_file();
        if path.exists() {
            Self::load_from_path(&path)
        } else {
            Ok(VehicleConfig::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<VehicleConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| SublinkError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content, path)
    }

    /// Parse configuration from string
    pub fn parse(content: &str, path: &Path) -> Result<VehicleConfig> {
        toml::from_str(content).map_err(|e| SublinkError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Validate configuration
    pub fn validate(config: &VehicleConfig) -> Result<()> {
        if config.general.bind_host.trim().is_empty() {
            return Err(SublinkError::config("general.bind_host must not be empty"));
        }

        let p = &config.ports;
        let ports = [p.command, p.video, p.logging, p.telemetry, p.pilot];
        for (i, port) in ports.iter().enumerate() {
            // Port 0 asks the OS for an ephemeral port, which a station cannot find
            if *port == 0 {
                return Err(SublinkError::config("ports must be non-zero"));
            }
            if ports[i + 1..].contains(port) {
                return Err(SublinkError::config(format!("port {} is used twice", port)));
            }
        }

        if config.pacing.log_batch_max == 0 {
            return Err(SublinkError::config("pacing.log_batch_max must be at least 1"));
        }

        if config.video.width == 0 || config.video.height == 0 {
            return Err(SublinkError::config("video dimensions must be non-zero"));
        }

        Ok(())
    }

    /// Load and validate
    pub fn load_and_validate() -> Result<VehicleConfig> {
        let config = Self::load()?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Load from an explicit path when given, then validate
    pub fn load_path_and_validate(path: Option<&Path>) -> Result<VehicleConfig> {
        let config = match path {
            Some(path) => Self::load_from_path(path)?,
            None => Self::load()?,
        };
        Self::validate(&config)?;
        Ok(config)
    }
}
