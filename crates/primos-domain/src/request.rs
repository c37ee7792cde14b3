// request.rs
use crate::errors::{JobError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub const MIN_CANTIDAD: u32 = 1;
pub const MAX_CANTIDAD: u32 = 1000;
pub const MIN_DIGITOS: u32 = 2;
pub const MAX_DIGITOS: u32 = 20;

/// Comprueba que la cantidad de dígitos esté en `[MIN_DIGITOS, MAX_DIGITOS]`.
pub fn validate_digitos(digitos: i64) -> Result<u32> {
  if digitos < MIN_DIGITOS as i64 || digitos > MAX_DIGITOS as i64 {
    return Err(JobError::Validation(format!("digitos debe estar entre {} y {}", MIN_DIGITOS, MAX_DIGITOS)));
  }
  Ok(digitos as u32)
}

/// Comprueba que la cantidad pedida esté en `[MIN_CANTIDAD, MAX_CANTIDAD]`.
pub fn validate_cantidad(cantidad: i64) -> Result<u32> {
  if cantidad < MIN_CANTIDAD as i64 || cantidad > MAX_CANTIDAD as i64 {
    return Err(JobError::Validation(format!("cantidad debe estar entre {} y {}", MIN_CANTIDAD, MAX_CANTIDAD)));
  }
  Ok(cantidad as u32)
}

/// Parámetros ya validados de una nueva solicitud.
///
/// Sólo se puede construir mediante `NewRequest::new`, de modo que cualquier
/// valor que llegue al repositorio respeta los límites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRequest {
  cantidad: u32,
  digitos: u32,
}

impl NewRequest {
  pub fn new(cantidad: i64, digitos: i64) -> Result<Self> {
    let cantidad = validate_cantidad(cantidad)?;
    let digitos = validate_digitos(digitos)?;
    Ok(Self { cantidad, digitos })
  }

  pub fn cantidad(&self) -> u32 {
    self.cantidad
  }

  pub fn digitos(&self) -> u32 {
    self.digitos
  }
}

/// Fila de `solicitudes`: lo que el cliente consulta con `/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimeRequest {
  pub id: Uuid,
  pub cantidad: u32,
  pub digitos: u32,
  pub generados: u32,
  pub created_at: DateTime<Utc>,
}

impl PrimeRequest {
  /// La finalización se deriva del contador; no existe bandera persistida.
  pub fn is_complete(&self) -> bool {
    self.generados >= self.cantidad
  }
}

/// Fila de la cola durable (`cola`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
  pub id: Uuid,
  pub solicitud_id: Uuid,
  pub cantidad: u32,
  pub digitos: u32,
  pub procesado: bool,
  pub created_at: DateTime<Utc>,
}

/// Descriptor de trabajo reclamado, idéntico para ambas estrategias.
///
/// `handle` es el id de la entrada en `cola`; sólo existe cuando la propiedad
/// del trabajo se confirmó contra la cola durable y es lo que consume
/// `mark_done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Job {
  pub handle: Option<Uuid>,
  pub solicitud_id: Uuid,
  pub cantidad: u32,
  pub digitos: u32,
}

impl From<QueueEntry> for Job {
  fn from(entry: QueueEntry) -> Self {
    Self { handle: Some(entry.id), solicitud_id: entry.solicitud_id, cantidad: entry.cantidad, digitos: entry.digitos }
  }
}

impl fmt::Display for Job {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Job(solicitud: {}, cantidad: {}, digitos: {})", self.solicitud_id, self.cantidad, self.digitos)
  }
}
