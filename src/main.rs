//! Distributed log/event aggregator
//!
//! Accepts events over HTTP, buffers them on a broker queue, and drains them
//! into durable storage through a pool of idempotent worker consumers.

use std::net::SocketAddr;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod broker;
mod config;
mod db;
mod error;
pub mod event;
pub mod jobs;
pub mod state;
pub mod store;
pub mod worker;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;

use broker::BrokerQueue;
use jobs::JobScheduler;
use store::Store;
use worker::WorkerPool;

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "log_aggregator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the application router
fn build_router(state: AppState) -> Router {
    let api_router = api::create_router();

    Router::new()
        .route("/health", get(api::routes::health_check))
        .merge(api_router)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing();

    // Load configuration
    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("Starting log aggregator");
    tracing::info!("Connecting to database...");

    // Open the durable store
    let store = Store::connect(&config.database_url, config.database_max_connections).await?;

    // Verify database schema
    if !db::check_schema(store.pool()).await? {
        tracing::error!("Database schema is not complete. Please run migrations.");
        return Err(anyhow::anyhow!("Database schema incomplete"));
    }

    tracing::info!("Database connected successfully");

    // Open the broker connection
    let broker = BrokerQueue::connect(&config.redis_url).await?;

    tracing::info!(num_workers = config.num_workers, "Spawning worker pool");
    let worker_pool = WorkerPool::spawn(config.num_workers, broker.clone(), store.clone());

    let job_cancel = tokio_util::sync::CancellationToken::new();
    let scheduler = JobScheduler::new(store.clone(), job_cancel.clone());
    let scheduler_handle = scheduler.start();

    let state = AppState::new(store.clone(), broker);

    tracing::info!("Listening on http://{}", addr);

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cleanup: cancel workers, stop the scheduler, close resources
    tracing::info!("Server shutting down...");
    worker_pool.shutdown().await;

    job_cancel.cancel();
    let _ = scheduler_handle.await;

    store.close().await;
    tracing::info!("Database connections closed. Goodbye!");

    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
