//! sublink station binary

use sublink_station::cli::Args;
use sublink_station::config::ConfigLoader;
use sublink_station::{Ack, Negotiator, Station};
use sublink_utils::{init_logging_with_config, LogConfig, Result, SublinkError};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    let mut log_config = LogConfig::station();
    if let Some(filter) = &args.log_filter {
        log_config = log_config.with_filter(filter.clone());
    }
    init_logging_with_config(log_config)?;

    tracing::info!("sublink-station starting");

    match run_station(args).await {
        Ok(()) => {
            tracing::info!("sublink-station exiting normally");
            Ok(())
        }
        Err(e) => {
            tracing::error!("sublink-station error: {}", e);
            eprintln!("Error: {}", e);
            Err(e)
        }
    }
}

async fn run_station(args: Args) -> Result<()> {
    let mut config = ConfigLoader::load_path_and_validate(args.config.as_deref())?;
    args.apply(&mut config);
    ConfigLoader::validate(&config)?;

    if args.kill {
        let negotiator = Negotiator::from_config(&config);
        return match negotiator.kill().await {
            Ack::Killed => Ok(()),
            other => Err(SublinkError::negotiation(format!(
                "vehicle answered kill with {}",
                other
            ))),
        };
    }

    let station = Station::start(config);

    let outcome = station.negotiate_and_activate().await;
    if !outcome.is_accepted() {
        station.shutdown().await;
        return Err(SublinkError::negotiation(outcome.to_string()));
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("interrupt received, shutting down");

    if let Some(board) = station.shutdown().await {
        tracing::info!(summary = %board.summary(), "final link status");
    }
    Ok(())
}
