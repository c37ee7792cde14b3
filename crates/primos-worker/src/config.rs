// Archivo: config.rs
// Propósito: opciones del bucle de worker (estrategia de dequeue, esperas y
// límites). El binario las construye desde la línea de comandos.
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_POP_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);
/// Duplicados seguidos tras los cuales se abandona un trabajo: con pocos
/// dígitos el rango puede no tener `cantidad` primos distintos.
pub const DEFAULT_DUPLICATE_STREAK_LIMIT: u64 = 100_000;

/// Estrategia con la que el worker obtiene trabajo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DequeueMode {
    /// Sólo cola rápida, confirmando la propiedad contra la cola durable.
    Fast,
    /// Sólo reclamo sobre la tabla `cola`.
    Durable,
    /// Cola rápida primero; la durable cuando la espera vence.
    #[default]
    Both,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("modo de dequeue desconocido '{0}' (esperado: fast, durable o both)")]
pub struct UnknownMode(pub String);

impl FromStr for DequeueMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(DequeueMode::Fast),
            "durable" => Ok(DequeueMode::Durable),
            "both" => Ok(DequeueMode::Both),
            other => Err(UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for DequeueMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DequeueMode::Fast => "fast",
            DequeueMode::Durable => "durable",
            DequeueMode::Both => "both",
        };
        f.write_str(s)
    }
}

/// Configuración de un `WorkerLoop`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopConfig {
    pub mode: DequeueMode,
    /// Espera máxima del pop bloqueante (y del sondeo en modo durable).
    pub pop_timeout: Duration,
    /// Pausa tras un error transitorio del almacenamiento o del broker.
    pub backoff: Duration,
    pub duplicate_streak_limit: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self { mode: DequeueMode::default(),
               pop_timeout: DEFAULT_POP_TIMEOUT,
               backoff: DEFAULT_BACKOFF,
               duplicate_streak_limit: DEFAULT_DUPLICATE_STREAK_LIMIT }
    }
}
