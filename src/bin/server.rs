use anyhow::Context;
use axum::{http::HeaderValue, routing::get, Router};
use axum_prometheus::PrometheusMetricLayer;
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use vetdesk_server::{
    backoff::RetryPolicy, config::AppConfig, integrations::WebhookDispatcher, migrator, routes,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (dotenvy)
    dotenvy::dotenv().ok();

    vetdesk_server::telemetry::init_telemetry("vetdesk-server")?;
    let config = AppConfig::from_env()?;

    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

    let db = Database::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    migrator::Migrator::up(&db, None)
        .await
        .context("Failed to run migrations")?;

    vetdesk_server::metrics::init_metrics(&db).await;

    let dispatcher = WebhookDispatcher::new(RetryPolicy {
        max_retries: config.webhook_max_retries,
        base_delay: config.webhook_base_delay,
        ..RetryPolicy::default()
    });
    let cors_origin = HeaderValue::from_str(&config.cors_origin)
        .with_context(|| format!("Invalid CORS_ORIGIN: {}", config.cors_origin))?;

    let app = app(
        routes::router(db, dispatcher, cors_origin),
        prometheus_layer,
        metric_handle,
    );

    tracing::info!("listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Request metrics wrap the API; `/metrics` itself is not measured.
fn app(
    api: Router,
    prometheus_layer: PrometheusMetricLayer<'static>,
    metric_handle: PrometheusHandle,
) -> Router {
    api.layer(prometheus_layer)
        .route("/metrics", get(|| async move { metric_handle.render() }))
}
