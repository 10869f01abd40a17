//! CLI argument parsing for the station

use std::path::PathBuf;

use clap::Parser;

use sublink_protocol::Mission;

use crate::config::StationConfig;

/// Control station for a sublink vehicle
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the station config file
    #[arg(short, long, env = "SUBLINK_STATION_CONFIG")]
    pub config: Option<PathBuf>,

    /// Vehicle host, overriding the config file
    #[arg(long, env = "SUBLINK_VEHICLE_HOST")]
    pub host: Option<String>,

    /// Mission to request, overriding the config file
    #[arg(short, long)]
    pub mission: Option<Mission>,

    /// Logging level to request from the vehicle (0 off, 1 info, 2 debug)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=2))]
    pub logging_level: Option<u8>,

    /// Log filter for the station itself
    #[arg(long)]
    pub log_filter: Option<String>,

    /// Ask the vehicle to stop every link server, then exit
    #[arg(long)]
    pub kill: bool,
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Fold command-line overrides into a loaded config
    pub fn apply(&self, config: &mut StationConfig) {
        if let Some(host) = &self.host {
            config.vehicle.host = host.clone();
        }
        if let Some(mission) = self.mission {
            config.command.mission = mission;
        }
        if let Some(level) = self.logging_level {
            config.command.logging_level = level;
        }
    }
}
