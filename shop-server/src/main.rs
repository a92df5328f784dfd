//! shop-server: storefront back office

use shop_server::api::create_router;
use shop_server::channels::Channels;
use shop_server::db::DbService;
use shop_server::side_effects::{SideEffectQueue, SideEffectWorker};
use shop_server::utils::logger::init_logger;
use shop_server::{AppState, Config};

const SIDE_EFFECT_DRAIN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(15);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;
    init_logger(&config.log_level, config.log_json, config.log_dir.as_deref())?;

    tracing::info!(
        env = %config.environment,
        port = config.http_port,
        "Starting shop-server"
    );

    let db = DbService::new(&config.database_path).await?;
    let channels = Channels::from_config(&config)?;

    let (side_effects, rx) = SideEffectQueue::new();
    let worker = SideEffectWorker::new(channels.tracking.clone(), channels.alerts.clone());
    let worker_handle = tokio::spawn(worker.run(rx));

    let http_port = config.http_port;
    let state = AppState::new(db.pool, config, channels, side_effects);
    let app = create_router(state);

    let addr = format!("0.0.0.0:{http_port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("HTTP listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router owned the last queue sender; the worker exits once the backlog is applied
    match tokio::time::timeout(SIDE_EFFECT_DRAIN_TIMEOUT, worker_handle).await {
        Ok(Ok(())) => tracing::info!("Side effects drained"),
        Ok(Err(e)) => tracing::error!(error = %e, "Side effect worker panicked"),
        Err(_) => tracing::warn!(
            timeout_secs = SIDE_EFFECT_DRAIN_TIMEOUT.as_secs(),
            "Side effects not drained before shutdown timeout"
        ),
    }

    tracing::info!("shop-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
