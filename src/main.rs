mod config;
mod http;
mod pool;
mod telemetry;

use clap::Parser;
use config::{ApiConfig, AppConfig, CliArgs, StoreConfig, WorkerConfig};
use pool::WorkerPool;
use primos_broker::{RedisFastQueue, DEFAULT_QUEUE_KEY};
use primos_domain::{FastQueue, JobRepository};
use primos_persistence::DieselJobRepository;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use telemetry::init_telemetry;
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `.env` antes de clap: los argumentos leen sus valores del entorno.
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();
    let config = AppConfig::try_from(args)?;

    init_telemetry()?;

    match config {
        AppConfig::Serve(api) => serve(api).await,
        AppConfig::Worker(worker) => run_workers(worker).await,
    }
}

/// Construye el repositorio (aplicando migraciones) y la cola rápida. Ambos
/// conectan de forma síncrona, así que corre fuera del runtime.
async fn connect(store: StoreConfig) -> anyhow::Result<(Arc<dyn JobRepository>, Arc<dyn FastQueue>)> {
    tokio::task::spawn_blocking(move || -> anyhow::Result<(Arc<dyn JobRepository>, Arc<dyn FastQueue>)> {
        let repo: Arc<dyn JobRepository> = Arc::new(DieselJobRepository::new(&store.database_url, store.pool_size)?);
        let queue: Arc<dyn FastQueue> =
            Arc::new(RedisFastQueue::new(&store.redis_url, DEFAULT_QUEUE_KEY, store.pool_size)?);
        Ok((repo, queue))
    }).await?
}

async fn serve(config: ApiConfig) -> anyhow::Result<()> {
    let (repo, queue) = connect(config.store.clone()).await?;
    let app = http::router(http::AppState::new(repo, queue));
    let listener = TcpListener::bind(config.addr).await?;
    tracing::info!("servidor HTTP escuchando en http://{}", config.addr);
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    tracing::info!("servidor detenido");
    Ok(())
}

async fn run_workers(config: WorkerConfig) -> anyhow::Result<()> {
    let (repo, queue) = connect(config.store.clone()).await?;
    let stop = Arc::new(AtomicBool::new(false));
    let pool = WorkerPool::spawn(repo, queue, &config, stop.clone())?;

    shutdown_signal().await;
    stop.store(true, Ordering::SeqCst);
    tracing::info!("esperando a que los workers terminen el trabajo en curso...");
    let processed = tokio::task::spawn_blocking(move || pool.join()).await?;
    tracing::info!("workers detenidos; {} trabajos procesados", processed);
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("no se pudo instalar el manejador de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("no se pudo instalar el manejador de Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Ctrl+C recibido"),
        () = terminate => tracing::info!("SIGTERM recibido"),
    }
}
