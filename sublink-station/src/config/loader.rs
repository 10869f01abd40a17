//! Configuration loader

use std::path::Path;

use sublink_utils::{station_config_file, Result, SublinkError};

use super::StationConfig;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from default location
    pub fn load() -> Result<StationConfig> {
        let path = station_config_file();
        if path.exists() {
            Self::load_from_path(&path)
        } else {
            Ok(StationConfig::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<StationConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| SublinkError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content, path)
    }

    /// Parse configuration from string
    pub fn parse(content: &str, path: &Path) -> Result<StationConfig> {
        toml::from_str(content).map_err(|e| SublinkError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Validate configuration
    pub fn validate(config: &StationConfig) -> Result<()> {
        if config.vehicle.host.trim().is_empty() {
            return Err(SublinkError::config("vehicle.host must not be empty"));
        }

        let ports = [
            config.vehicle.command_port,
            config.vehicle.video_port,
            config.vehicle.logging_port,
            config.vehicle.telemetry_port,
            config.vehicle.pilot_port,
        ];
        if ports.contains(&0) {
            return Err(SublinkError::config("vehicle ports must be non-zero"));
        }

        config
            .command_config()
            .validate()
            .map_err(|e| SublinkError::config(e.to_string()))?;

        if config.links.max_attempts == 0 {
            return Err(SublinkError::config("links.max_attempts must be at least 1"));
        }

        if config.links.malformed_limit == 0 {
            return Err(SublinkError::config("links.malformed_limit must be at least 1"));
        }

        if config.links.read_timeout_ms == Some(0) {
            return Err(SublinkError::config(
                "links.read_timeout_ms must be positive when set",
            ));
        }

        if config.negotiation.timeout_ms == 0 {
            return Err(SublinkError::config("negotiation.timeout_ms must be positive"));
        }

        Ok(())
    }

    /// Load and validate
    pub fn load_and_validate() -> Result<StationConfig> {
        let config = Self::load()?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Load from an explicit path when given, then validate
    pub fn load_path_and_validate(path: Option<&Path>) -> Result<StationConfig> {
        let config = match path {
            Some(path) => Self::load_from_path(path)?,
            None => Self::load()?,
        };
        Self::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_from_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("station.toml");

        std::fs::write(
            &path,
            r#"
            [vehicle]
            host = "sub.local"
            command_port = 6000
            "#,
        )
        .unwrap();

        let config = ConfigLoader::load_from_path(&path).unwrap();
        assert_eq!(config.vehicle.host, "sub.local");
        assert_eq!(config.command_endpoint().port, 6000);
    }

    #[test]
    fn test_load_missing_path_is_file_read_error() {
        let dir = tempdir().unwrap();
        let err = ConfigLoader::load_from_path(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, SublinkError::FileRead { .. }));
    }

    #[test]
    fn test_parse_invalid_toml() {
        let result = ConfigLoader::parse("invalid { toml", Path::new("station.toml"));
        assert!(matches!(result, Err(SublinkError::ConfigInvalid { .. })));
    }

    #[test]
    fn test_validate_default() {
        assert!(ConfigLoader::validate(&StationConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_logging_level() {
        let mut config = StationConfig::default();
        config.command.logging_level = 3;
        assert!(ConfigLoader::validate(&config).is_err());
    }

    #[test]
    fn test_validate_zero_attempts() {
        let mut config = StationConfig::default();
        config.links.max_attempts = 0;
        assert!(ConfigLoader::validate(&config).is_err());
    }

    #[test]
    fn test_validate_zero_port() {
        let mut config = StationConfig::default();
        config.vehicle.pilot_port = 0;
        assert!(ConfigLoader::validate(&config).is_err());
    }

    #[test]
    fn test_load_path_and_validate_rejects_bad_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("station.toml");
        std::fs::write(&path, "[links]\nmalformed_limit = 0\n").unwrap();

        let err = ConfigLoader::load_path_and_validate(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("malformed_limit"));
    }
}
