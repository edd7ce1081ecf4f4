use std::process::ExitCode;

use sigrelay::assets::AssetServer;
use sigrelay::config::RelayConfig;
use sigrelay::signaling::{RegistryHandle, SignalingServer};
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    match run(RelayConfig::default()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: RelayConfig) -> sigrelay::Result<()> {
    let registry = RegistryHandle::spawn();
    let signaling = SignalingServer::bind(config.signaling_addr, registry).await?;
    let assets = AssetServer::bind(config.static_addr, &config.asset_root).await?;

    println!("   Signaling relay");
    println!("   Signaling on ws://{}", signaling.local_addr()?);
    println!("   Static assets on http://{}", assets.local_addr()?);
    println!("   Press Ctrl+C to stop\n");

    tokio::select! {
        _ = signaling.run() => {}
        result = assets.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    Ok(())
}
