use std::process;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use vrm_collector::collector_service::{CollectorService, CollectorServiceConfig};
use vrm_collector::config_client::{env_lookup, require_all, ConfigClient, ConfigClientConfig};
use vrm_collector::error::ConfigError;
use vrm_collector::influx_client::InfluxClient;
use vrm_collector::vrm_client::VrmClient;

const CONFIG_ERROR_EXIT_CODE: i32 = 2;

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

fn build_service() -> Result<CollectorService, ConfigError> {
    let config_client = ConfigClient::new(ConfigClientConfig::from_env()?);
    let collector_config = config_client.read_config()?;
    let (vrm_client, target, influx_client) = require_all(
        VrmClient::from_env(),
        collector_config.target(&env_lookup),
        InfluxClient::from_env(),
    )?;

    let config = CollectorServiceConfig::from_env(
        Box::new(vrm_client),
        Box::new(influx_client),
        target,
    )?;

    Ok(CollectorService::new(config))
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let service = match build_service() {
        Ok(service) => service,
        Err(e) => {
            error!("{}", e);
            if let ConfigError::Missing(_) = e {
                error!("Set them via environment variables and try again.");
            }
            process::exit(CONFIG_ERROR_EXIT_CODE);
        }
    };

    tokio::select! {
        _ = service.run() => {},
        _ = shutdown_signal() => {
            info!("Received shutdown signal; stopping collector");
        },
    }
}
