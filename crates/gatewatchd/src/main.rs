//! GateWatch Daemon - hospital gateway process monitor

use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gatewatch_core::constants;
use gatewatch_core::MonitorConfig;

mod daemon;

use daemon::Daemon;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatewatchd=info,gatewatch_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("GateWatch daemon starting...");

    let home = constants::gatewatch_home();
    if !home.exists() {
        std::fs::create_dir_all(&home)?;
        info!("Created GateWatch home directory: {}", home.display());
    }

    let config = match MonitorConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "config unreadable, using defaults");
            MonitorConfig::default()
        }
    };

    let daemon = Daemon::new(config);

    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;

        tokio::select! {
            result = daemon.run() => {
                if let Err(e) = result {
                    error!("Daemon error: {}", e);
                    return Err(e);
                }
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                daemon.shutdown();
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down...");
                daemon.shutdown();
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            result = daemon.run() => {
                if let Err(e) = result {
                    error!("Daemon error: {}", e);
                    return Err(e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl-C, shutting down...");
                daemon.shutdown();
            }
        }
    }

    info!("Daemon shutdown complete");
    Ok(())
}
