// errors.rs
use thiserror::Error;
use uuid::Uuid;

/// Errores de la cola de trabajos.
///
/// Los resultados esperados (primo duplicado, cola vacía) no son errores: se
/// modelan como valores (`CommitOutcome`, `Option<Job>`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JobError {
  /// Entrada inválida; nunca llega al almacenamiento.
  #[error("Error de validación: {0}")]
  Validation(String),
  /// La solicitud quedó persistida pero no se pudo publicar en la cola rápida.
  #[error("Solicitud {id} aceptada pero no publicada: {reason}")]
  Dispatch { id: Uuid, reason: String },
  /// Mensaje de la cola rápida que no respeta el formato `id:cantidad:digitos`.
  #[error("Mensaje de cola mal formado: {0}")]
  Protocol(String),
  /// Fallo transitorio o terminal del almacenamiento durable.
  #[error("Error de almacenamiento: {0}")]
  Store(String),
  /// Fallo de conexión o de comando contra el broker.
  #[error("Error del broker: {0}")]
  Broker(String),
}

impl JobError {
  /// Indica si el llamador debe esperar y reintentar la misma operación.
  pub fn is_transient(&self) -> bool {
    matches!(self, JobError::Store(_) | JobError::Broker(_))
  }
}

pub type Result<T> = std::result::Result<T, JobError>;
