use anyhow::Context;
use circle_server::api::MgmtState;
use circle_server::config::Config;
use circle_server::{AppBuilder, Workers, adapters, telemetry};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// A bound listener and the router it serves.
struct Endpoint {
    addr: SocketAddr,
    listener: TcpListener,
    router: axum::Router,
}

struct Server {
    api: Endpoint,
    mgmt: Endpoint,
    workers: Workers,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load();
    let telemetry_guard = telemetry::init_telemetry(&config.telemetry)?;

    circle_server::setup_panic_hook();

    tracing::info!(
        fetch_limit = config.messaging.fetch_limit,
        max_batch_ids = config.messaging.max_batch_ids,
        max_content_len = config.messaging.max_content_len,
        per_second = config.rate_limit.per_second,
        registration_per_second = config.rate_limit.registration_per_second,
        "Starting circle-server"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let server = boot(&config, shutdown_tx.clone()).instrument(tracing::info_span!("boot_server")).await?;

    let sweep_every = Duration::from_secs(config.messaging.cleanup_interval_secs.max(1));
    tracing::info!(interval_secs = sweep_every.as_secs(), "Expired message sweeper started");
    let worker_tasks = server.workers.spawn_all(shutdown_rx.clone());

    tracing::info!(address = %server.api.addr, "Messaging API listening");
    tracing::info!(address = %server.mgmt.addr, "Health endpoints listening");

    if let Err(e) = tokio::try_join!(serve(server.api, shutdown_rx.clone()), serve(server.mgmt, shutdown_rx)) {
        tracing::error!(error = %e, "Server error");
    }

    // Either listener failing also stops the sweeper.
    let _ = shutdown_tx.send(true);
    drain_workers(worker_tasks, Duration::from_secs(config.server.shutdown_timeout_secs)).await;

    telemetry_guard.shutdown();
    Ok(())
}

/// Connects and migrates the database, wires the services and binds both ports.
async fn boot(config: &Config, shutdown_tx: watch::Sender<bool>) -> anyhow::Result<Server> {
    let pool = adapters::database::init_pool(&config.database).await.context("Failed to reach the database")?;
    circle_server::run_migrations(&pool).await.context("Failed to apply migrations")?;

    circle_server::spawn_signal_handler(shutdown_tx);

    let app = AppBuilder::new(config.clone()).with_database(pool).build()?;
    let api_router = circle_server::api::app_router(config.clone(), app.services)?;
    let mgmt_router = circle_server::api::mgmt_router(MgmtState { health_service: app.health_service });

    Ok(Server {
        api: bind(&config.server.host, config.server.port, api_router).await?,
        mgmt: bind(&config.server.host, config.server.mgmt_port, mgmt_router).await?,
        workers: app.workers,
    })
}

async fn bind(host: &str, port: u16, router: axum::Router) -> anyhow::Result<Endpoint> {
    let requested: SocketAddr = format!("{host}:{port}").parse()?;
    let listener = TcpListener::bind(requested).await.with_context(|| format!("Failed to bind {requested}"))?;
    let addr = listener.local_addr()?;
    Ok(Endpoint { addr, listener, router })
}

async fn serve(endpoint: Endpoint, mut shutdown_rx: watch::Receiver<bool>) -> std::io::Result<()> {
    axum::serve(endpoint.listener, endpoint.router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.wait_for(|&s| s).await;
        })
        .await
}

async fn drain_workers(tasks: Vec<JoinHandle<()>>, timeout: Duration) {
    if tokio::time::timeout(timeout, futures::future::join_all(tasks)).await.is_ok() {
        tracing::info!("Expired message sweeper stopped");
    } else {
        tracing::warn!(timeout_secs = timeout.as_secs(), "Expired message sweeper did not stop in time");
    }
}
