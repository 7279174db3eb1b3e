use anyhow::{Context, Result};
use benchpool_core::{JobBus, MemoryBus, MemoryStore, RedisConnection, SubmissionStore};
use benchpool_sandbox::{HostEnvironment, Runtime};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub mod config;
pub mod dispatcher;
mod error;
pub mod http;
mod logging;
pub mod worker;

pub use config::AppConfig;
pub use dispatcher::{Dispatcher, MergeOutcome, SubmitOutcome};
pub use error::{ConfigError, DispatchError, WorkerError};
pub use http::{create_router, start_server, ApiResponse, HttpState};
pub use logging::init_logging;
pub use worker::Worker;

/// Options shared by every process role.
#[derive(Debug, Clone, Default)]
pub struct AppArgs {
    pub config_path: Option<PathBuf>,
    pub redis_url: Option<String>,
    pub bind_addr: Option<String>,
    pub verbose: bool,
    pub log_file: Option<PathBuf>,
}

impl AppArgs {
    /// Config file and environment, then command line flags on top.
    pub fn resolve_config(&self) -> Result<AppConfig> {
        let mut config =
            AppConfig::load(self.config_path.as_deref()).context("Failed to load configuration")?;
        if let Some(url) = &self.redis_url {
            config.store.url = url.clone();
        }
        if let Some(addr) = &self.bind_addr {
            config.server.bind_addr = addr.clone();
        }
        Ok(config)
    }
}

async fn connect(config: &AppConfig) -> Result<(Arc<dyn SubmissionStore>, Arc<dyn JobBus>)> {
    let connection = RedisConnection::connect(&config.store.url)
        .await
        .context("Failed to connect to redis")?;
    let store = connection.store();
    if let Err(e) = store.ping().await {
        error!("Store did not answer ping: {}", e);
    }
    Ok((store, connection.bus()))
}

async fn serve(config: &AppConfig, dispatcher: Arc<Dispatcher>) -> Result<JoinHandle<Result<()>>> {
    let merge_loop = dispatcher
        .spawn_merge_loop()
        .await
        .context("Failed to subscribe to finished jobs")?;
    let listener = TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;

    Ok(tokio::spawn(async move {
        let served = start_server(listener, HttpState::new(dispatcher)).await;
        merge_loop.abort();
        served
    }))
}

async fn start_worker(config: &AppConfig, bus: Arc<dyn JobBus>) -> Result<JoinHandle<()>> {
    let runtime = config.runtime();
    let environment = HostEnvironment::detect(runtime.program()).await;
    let runtime: Arc<dyn Runtime> = Arc::new(runtime);
    Arc::new(Worker::new(bus, runtime, environment))
        .start()
        .await
        .context("Failed to subscribe to new jobs")
}

async fn wait_for_shutdown() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

/// Dispatcher: HTTP intake plus the result merge loop.
pub async fn run_server_app(args: AppArgs) -> Result<()> {
    let _guard = init_logging(args.verbose, args.log_file.as_deref())?;
    let config = args.resolve_config()?;
    info!("Starting benchpool server");

    let (store, bus) = connect(&config).await?;
    let formatter = Arc::new(config.formatter());
    let dispatcher = Arc::new(Dispatcher::new(store, bus, formatter));
    let server = serve(&config, dispatcher).await?;

    tokio::select! {
        served = server => served.context("HTTP server task failed")?,
        _ = wait_for_shutdown() => Ok(()),
    }
}

/// Worker: executes every job announced on the bus.
pub async fn run_worker_app(args: AppArgs) -> Result<()> {
    let _guard = init_logging(args.verbose, args.log_file.as_deref())?;
    let config = args.resolve_config()?;
    info!("Starting benchpool worker");

    let (_store, bus) = connect(&config).await?;
    let worker = start_worker(&config, bus).await?;

    tokio::select! {
        stopped = worker => {
            stopped.context("Worker task failed")?;
            Ok(())
        }
        _ = wait_for_shutdown() => Ok(()),
    }
}

/// Server and worker in one process over the in-memory store and bus.
pub async fn run_standalone_app(args: AppArgs) -> Result<()> {
    let _guard = init_logging(args.verbose, args.log_file.as_deref())?;
    let config = args.resolve_config()?;
    info!("Starting benchpool standalone, results are not persisted");

    let store: Arc<dyn SubmissionStore> = Arc::new(MemoryStore::new());
    let bus: Arc<dyn JobBus> = Arc::new(MemoryBus::new());
    let worker = start_worker(&config, Arc::clone(&bus)).await?;
    let formatter = Arc::new(config.formatter());
    let dispatcher = Arc::new(Dispatcher::new(store, bus, formatter));
    let server = serve(&config, dispatcher).await?;

    let outcome = tokio::select! {
        served = server => served.context("HTTP server task failed")?,
        _ = wait_for_shutdown() => Ok(()),
    };
    worker.abort();
    outcome
}
