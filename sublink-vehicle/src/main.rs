//! sublink vehicle binary

use sublink_utils::{init_logging_with_layer, LogConfig, Result};
use sublink_vehicle::cli::Args;
use sublink_vehicle::config::ConfigLoader;
use sublink_vehicle::{forward_layer, LogForwarder, Sources, Vehicle};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    let mut log_config = LogConfig::vehicle();
    if let Some(filter) = &args.log_filter {
        log_config = log_config.with_filter(filter.clone());
    }
    let (layer, forwarder) = forward_layer();
    init_logging_with_layer(log_config, Some(layer))?;

    tracing::info!("sublink-vehicle starting");

    match run_vehicle(args, forwarder).await {
        Ok(()) => {
            tracing::info!("sublink-vehicle exiting normally");
            Ok(())
        }
        Err(e) => {
            tracing::error!("sublink-vehicle error: {}", e);
            eprintln!("Error: {}", e);
            Err(e)
        }
    }
}

async fn run_vehicle(args: Args, forwarder: LogForwarder) -> Result<()> {
    let mut config = ConfigLoader::load_path_and_validate(args.config.as_deref())?;
    args.apply(&mut config);
    ConfigLoader::validate(&config)?;

    let sources = Sources::simulated(config.video.width, config.video.height);
    let vehicle = Vehicle::start(config, sources, forwarder).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("interrupt received, shutting down");

    vehicle.shutdown().await;
    Ok(())
}
