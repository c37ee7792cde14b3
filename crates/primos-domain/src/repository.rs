// repository.rs
//
// Contratos del almacenamiento durable y de la cola rápida. Las
// implementaciones concretas viven en `primos-persistence` (Postgres) y
// `primos-broker` (Redis); `stubs.rs` trae versiones en memoria.
use crate::errors::Result;
use crate::message::JobMessage;
use crate::request::{NewRequest, PrimeRequest, QueueEntry};
use std::time::Duration;
use uuid::Uuid;

/// Resultado de intentar registrar un primo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
  /// Fila insertada y `generados` incrementado en la misma transacción.
  Inserted,
  /// El par (solicitud, primo) ya existía; no se modificó nada.
  DuplicateRejected,
  /// La solicitud ya tenía `generados == cantidad`; se revirtió la inserción.
  RequestComplete,
}

/// Almacenamiento durable: solicitudes, cola durable y resultados.
///
/// Cada método es una operación lógica independiente que toma su propia
/// conexión; ninguna implementación comparte conexiones entre llamadas
/// concurrentes.
pub trait JobRepository: Send + Sync {
  /// Inserta la solicitud y su entrada en `cola` en una única transacción y
  /// devuelve el id generado.
  fn create_request(&self, params: &NewRequest) -> Result<Uuid>;

  /// Reclama la entrada no procesada más antigua, saltando las filas
  /// bloqueadas por otras transacciones. Selección, marcado y commit forman
  /// una unidad atómica. `None` si no hay trabajo.
  fn claim_next(&self) -> Result<Option<QueueEntry>>;

  /// Igual que `claim_next` pero restringido a la entrada de una solicitud.
  /// `None` si ya fue reclamada (o eliminada) por otro worker.
  fn claim_for_request(&self, solicitud_id: &Uuid) -> Result<Option<QueueEntry>>;

  /// Elimina la entrada de `cola` al terminar el trabajo.
  fn mark_done(&self, entry_id: &Uuid) -> Result<()>;

  /// Inserta `(solicitud_id, primo)` e incrementa `generados` de forma
  /// atómica. Una violación de unicidad se reporta como
  /// `CommitOutcome::DuplicateRejected`.
  fn insert_result(&self, solicitud_id: &Uuid, primo: &str) -> Result<CommitOutcome>;

  /// Lee la solicitud; `None` si el id no existe.
  fn get_request(&self, id: &Uuid) -> Result<Option<PrimeRequest>>;

  /// Primos encontrados hasta ahora, en orden de descubrimiento.
  fn list_results(&self, solicitud_id: &Uuid) -> Result<Vec<String>>;

  /// Cuenta filas de `resultados`; es la medida autoritativa del progreso.
  fn count_results(&self, solicitud_id: &Uuid) -> Result<u32>;
}

/// Cola rápida (lista bloqueante) usada como canal principal de despacho.
pub trait FastQueue: Send + Sync {
  /// Publica el mensaje al final de la lista.
  fn publish(&self, message: &JobMessage) -> Result<()>;

  /// Extrae el mensaje más antiguo esperando hasta `timeout`. Devuelve el
  /// texto sin interpretar; `None` si venció la espera.
  fn pop(&self, timeout: Duration) -> Result<Option<String>>;
}
