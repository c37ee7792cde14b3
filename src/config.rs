// Archivo: config.rs
// Propósito: argumentos de línea de comandos (con respaldo en variables de
// entorno) y su validación en `ApiConfig` / `WorkerConfig`.
use anyhow::bail;
use clap::{Args, Parser, Subcommand};
use primos_worker::{DequeueMode, LoopConfig, DEFAULT_DUPLICATE_STREAK_LIMIT};
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "primos", version, about = "Cola de trabajos para generar primos probables")]
pub struct CliArgs {
    /// URL de Postgres. Si falta se usa `DATABASE_URL`.
    #[arg(long, env = "PRIMOS_DB_URL", global = true)]
    pub database_url: Option<String>,

    /// URL completa de Redis; tiene prioridad sobre host y puerto.
    #[arg(long, env = "REDIS_URL", global = true)]
    pub redis_url: Option<String>,

    #[arg(long, env = "REDIS_HOST", default_value = "localhost", global = true)]
    pub redis_host: String,

    #[arg(long, env = "REDIS_PORT", default_value_t = 6379, global = true)]
    pub redis_port: u16,

    /// Conexiones máximas de cada pool (Postgres y Redis).
    #[arg(long, env = "PRIMOS_POOL_SIZE", default_value_t = 4, global = true)]
    pub pool_size: u32,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Servidor HTTP: alta de solicitudes y consulta de estado/resultados.
    Serve(ServeArgs),
    /// Pool de workers que busca primos.
    Worker(WorkerArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,
}

#[derive(Args, Debug, Clone)]
pub struct WorkerArgs {
    /// Bucles de worker, cada uno en su propio hilo.
    #[arg(long, env = "PRIMOS_WORKERS", default_value_t = 1)]
    pub workers: usize,

    /// Estrategia de dequeue: fast, durable o both.
    #[arg(long, env = "PRIMOS_WORKER_MODE", default_value = "both")]
    pub mode: String,

    #[arg(long, env = "PRIMOS_POP_TIMEOUT_SECS", default_value_t = 5.0)]
    pub pop_timeout_secs: f64,

    #[arg(long, env = "PRIMOS_BACKOFF_MILLIS", default_value_t = 1000)]
    pub backoff_millis: u64,

    #[arg(long, env = "PRIMOS_DUPLICATE_STREAK_LIMIT", default_value_t = DEFAULT_DUPLICATE_STREAK_LIMIT)]
    pub duplicate_streak_limit: u64,
}

/// Destinos de almacenamiento comunes a ambos subcomandos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub database_url: String,
    pub redis_url: String,
    pub pool_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub store: StoreConfig,
    pub addr: SocketAddr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    pub store: StoreConfig,
    pub workers: usize,
    pub loop_config: LoopConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppConfig {
    Serve(ApiConfig),
    Worker(WorkerConfig),
}

fn store_config(args: &CliArgs) -> anyhow::Result<StoreConfig> {
    if args.pool_size == 0 {
        bail!("PRIMOS_POOL_SIZE debe ser mayor que 0");
    }
    let database_url = match &args.database_url {
        Some(url) if url.starts_with("postgres://") || url.starts_with("postgresql://") => url.clone(),
        Some(url) => bail!("la URL de base de datos no parece de Postgres: {}", url),
        None => primos_persistence::database_url_from_env()?,
    };
    let redis_url = match &args.redis_url {
        Some(url) => url.clone(),
        None => format!("redis://{}:{}/", args.redis_host, args.redis_port),
    };
    Ok(StoreConfig { database_url, redis_url, pool_size: args.pool_size })
}

impl TryFrom<CliArgs> for AppConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let mut store = store_config(&args)?;
        match args.command {
            Command::Serve(serve) => {
                let addr: SocketAddr = format!("{}:{}", serve.host, serve.port).parse()
                                                                           .map_err(|e| {
                                                                               anyhow::anyhow!("dirección inválida {}:{}: {}",
                                                                                               serve.host,
                                                                                               serve.port,
                                                                                               e)
                                                                           })?;
                Ok(AppConfig::Serve(ApiConfig { store, addr }))
            }
            Command::Worker(worker) => {
                if worker.workers == 0 {
                    bail!("PRIMOS_WORKERS debe ser mayor que 0");
                }
                if !worker.pop_timeout_secs.is_finite() || worker.pop_timeout_secs <= 0.0 {
                    bail!("PRIMOS_POP_TIMEOUT_SECS debe ser positivo");
                }
                if worker.duplicate_streak_limit == 0 {
                    bail!("PRIMOS_DUPLICATE_STREAK_LIMIT debe ser mayor que 0");
                }
                let mode: DequeueMode = worker.mode.parse()?;
                // Cada bucle mantiene una conexión de Redis ocupada durante el pop.
                store.pool_size = store.pool_size.max(worker.workers as u32 + 1);
                let loop_config = LoopConfig { mode,
                                               pop_timeout: Duration::from_secs_f64(worker.pop_timeout_secs),
                                               backoff: Duration::from_millis(worker.backoff_millis),
                                               duplicate_streak_limit: worker.duplicate_streak_limit };
                Ok(AppConfig::Worker(WorkerConfig { store, workers: worker.workers, loop_config }))
            }
        }
    }
}
