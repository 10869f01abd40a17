//! CLI argument parsing for the vehicle

use std::path::PathBuf;

use clap::Parser;

use crate::config::VehicleConfig;

/// Link servers for a sublink vehicle
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the vehicle config file
    #[arg(short, long, env = "SUBLINK_VEHICLE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind every server to, overriding the config file
    #[arg(long)]
    pub bind: Option<String>,

    /// Honor the station's kill request
    #[arg(long)]
    pub allow_kill: bool,

    /// Log filter for the vehicle itself
    #[arg(long)]
    pub log_filter: Option<String>,
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Fold command-line overrides into a loaded config
    pub fn apply(&self, config: &mut VehicleConfig) {
        if let Some(bind) = &self.bind {
            config.general.bind_host = bind.clone();
        }
        if self.allow_kill {
            config.general.kill_enabled = true;
        }
    }
}
