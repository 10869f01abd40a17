//! sublink-utils: Common utilities shared across sublink crates
//!
//! This crate provides:
//! - Unified error types ([`SublinkError`], [`Result`])
//! - Logging infrastructure ([`init_logging_with_config`], [`LogConfig`])
//! - XDG-compliant path utilities ([`paths`] module)

pub mod error;
pub mod logging;
pub mod paths;

// Re-export main types at crate root for convenience
pub use error::{Result, SublinkError};
pub use logging::{init_logging_with_config, init_logging_with_layer, LogConfig, LogOutput};

pub use paths::{config_dir, log_dir, state_dir, station_config_file, vehicle_config_file};
