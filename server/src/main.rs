use clap::Parser;
use log::{error, info};
use pong_server::config::{Args, ServerConfig};
use pong_server::coordinator::GameCoordinator;
use pong_server::network::NetworkServer;

/// Parses command-line arguments, then serves until the listener fails or
/// Ctrl+C is received.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = ServerConfig::try_from(args)?;

    info!(
        "Starting pong server on {} at {}Hz ({}x{} field)",
        config.bind_addr, config.tick_rate, config.field.width, config.field.height
    );

    let coordinator = GameCoordinator::new(&config);
    let server = NetworkServer::bind(&config.bind_addr, coordinator.clone()).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    coordinator.shutdown().await;
    Ok(())
}
