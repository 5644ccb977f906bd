use std::sync::Arc;

use anyhow::{Context, Result};
use logrelay_adapters::StreamHub;
use logrelay_bus::{Bus, NatsBus};
use logrelay_config::Config;
use logrelay_engine::{Service, ServiceOptions};
use logrelay_server::StreamServer;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub async fn handle(config: Config) -> Result<()> {
    config
        .prepare_filesystem()
        .context("Failed to prepare log and state directories")?;
    if config.server.jwt_secret.is_empty() {
        warn!("no JWT secret configured; every live stream viewer will be rejected");
    }

    let bus: Arc<dyn Bus> = Arc::new(
        NatsBus::connect(&config.nats_url)
            .await
            .with_context(|| format!("Failed to connect to NATS at {}", config.nats_url))?,
    );
    info!(url = %config.nats_url, "connected to NATS");

    let hub = StreamHub::new();
    let options = ServiceOptions {
        default_log_file: config.log_file.clone(),
        state_dir: config.state_dir.clone(),
        find_subject: config.directory.find_subject.clone(),
        update_subject: config.directory.update_subject.clone(),
        directory_timeout: config.directory.timeout(),
        retry_interval: config.directory.retry_interval(),
    };
    let service = Arc::new(Service::new(bus, hub.clone(), options));

    let token = CancellationToken::new();
    {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutting down");
                token.cancel();
            }
        });
    }

    // A failing service takes the HTTP server down with it
    let service_task = {
        let token = token.clone();
        tokio::spawn(async move {
            let result = service.run(token.clone()).await;
            token.cancel();
            result
        })
    };

    let server = StreamServer::new(hub, &config.server.jwt_secret, token.clone());
    let served = server.serve(&config.server.host, config.server.port).await;
    token.cancel();

    service_task
        .await
        .context("Service task panicked")?
        .context("Service failed")?;
    served
}
