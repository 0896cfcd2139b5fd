use amtron_exporter::metrics::ChargerMetrics;
use amtron_exporter::transport::ReqwestTransport;
use amtron_exporter::web::{self, AppState};
use amtron_exporter::{Config, Poller};
use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    amtron_exporter::logging::init_logging(&config.logging)?;

    info!(
        "Amtron exporter {} starting; charger at {}",
        env!("APP_VERSION"),
        config.device.base_url()
    );

    let metrics = Arc::new(ChargerMetrics::new()?);
    let transport = ReqwestTransport::new(&config.device)?;
    let mut poller = Poller::new(&config, transport, Arc::clone(&metrics));

    // Fail fast if the metrics port is unavailable
    let listener = web::bind(&config.web.host, config.web.port).await?;
    let state = AppState {
        metrics,
        status_rx: poller.subscribe_status(),
    };
    let web_task = tokio::spawn(async move {
        if let Err(e) = web::serve(listener, state).await {
            error!("Web server error: {}", e);
        }
    });

    poller.run(shutdown_signal()).await;

    web_task.abort();
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Unable to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
