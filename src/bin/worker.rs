use anyhow::Context;
use sea_orm::Database;
use vetdesk_server::{
    config::AppConfig,
    worker::{self, WorkerConfig},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (dotenvy)
    dotenvy::dotenv().ok();

    vetdesk_server::telemetry::init_telemetry("vetdesk-worker")?;
    let config = AppConfig::from_env()?;

    let (prometheus_layer, metric_handle) = axum_prometheus::PrometheusMetricLayer::pair();

    // Spawn metrics server
    tokio::spawn(async move {
        let app = axum::Router::new()
            .route(
                "/metrics",
                axum::routing::get(|| async move { metric_handle.render() }),
            )
            .layer(prometheus_layer);
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], 9091));
        tracing::info!("Metrics server listening on {}", addr);
        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                if let Err(e) = axum::serve(listener, app).await {
                    tracing::error!("Metrics server stopped: {}", e);
                }
            }
            Err(e) => tracing::error!("Unable to bind metrics server: {}", e),
        }
    });

    let db = Database::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Starting background worker...");
    let handle = tokio::spawn(worker::run(
        db,
        WorkerConfig {
            interval: config.worker_interval,
            no_show_grace: config.no_show_grace,
        },
    ));

    // Keep the main process alive
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutting down worker process"),
        Err(err) => tracing::error!("Unable to listen for shutdown signal: {}", err),
    }
    handle.abort();
    Ok(())
}
