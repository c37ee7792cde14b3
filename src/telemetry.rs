// Archivo: telemetry.rs
// Propósito: suscriptor de `tracing` para el binario. El puente
// `tracing-log` recoge también los registros `log` de las librerías.
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Instala el suscriptor global. El filtro sale de `RUST_LOG` (por omisión
/// `info`).
pub fn init_telemetry() -> anyhow::Result<()> {
    tracing_subscriber::registry().with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
                                  .with(fmt::layer().with_thread_names(true)
                                                    .with_target(true)
                                                    .with_timer(fmt::time::ChronoLocal::rfc_3339()))
                                  .try_init()?;
    Ok(())
}
